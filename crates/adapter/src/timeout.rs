//! Invoke timeout policy.
//!
//! Drivers pass timeouts straight from workload definitions, which are loosely
//! typed. Anything that is not a usable non-negative number of seconds falls
//! back to [`DEFAULT_INVOKE_TIMEOUT`]. Zero is honoured and times out
//! anything that does not complete immediately.

use std::time::Duration;

/// Timeout applied when none, or an unusable one, is given.
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(120);

/// Soft deadline for a single `invoke_smart_contract` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvokeTimeout(Duration);

impl InvokeTimeout {
    /// Builds a timeout from an optional number of seconds.
    ///
    /// `None`, NaN, negative, infinite, and out-of-range values yield the
    /// 120 second default.
    #[must_use]
    pub fn from_secs(secs: Option<f64>) -> Self {
        secs.filter(|s| *s >= 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .map_or_else(Self::default, Self)
    }

    /// Builds a timeout from a JSON workload value.
    ///
    /// Only JSON numbers are considered; strings, booleans, `null`, and
    /// containers yield the default.
    #[must_use]
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        Self::from_secs(value.and_then(serde_json::Value::as_f64))
    }

    /// Returns the effective deadline.
    #[must_use]
    pub const fn duration(self) -> Duration {
        self.0
    }
}

impl Default for InvokeTimeout {
    fn default() -> Self {
        Self(DEFAULT_INVOKE_TIMEOUT)
    }
}

impl From<Duration> for InvokeTimeout {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}
