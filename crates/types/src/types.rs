//! Core type definitions for ledger benchmarking.
//!
//! - Identifier types (`ContextId`)
//! - Backend identification (`BackendKind`)
//! - Transaction outcome records (`TxOutcome`, `TxStatus`, `TxExtensions`)

use std::{collections::BTreeMap, fmt, str::FromStr, time::Duration};

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a numeric type for type-safe identifiers.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a context issued by an adapter facade.
    ///
    /// Unique within one facade instance.
    ///
    /// # Display
    ///
    /// Formats with `ctx:` prefix: `ctx:3`.
    ContextId, u64, "ctx"
);

define_id!(
    /// Height of a block sealed by a block-producing backend.
    ///
    /// # Display
    ///
    /// Formats with `block:` prefix: `block:12`.
    BlockHeight, u64, "block"
);

/// Returns the current wall-clock time as epoch milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

// ============================================================================
// Backend Identification
// ============================================================================

/// Ledger backend variants the adapter facade can drive.
///
/// Each variant is selected by a top-level configuration section whose key is
/// [`BackendKind::marker`]. Selection probes [`BackendKind::PROBE_ORDER`] and
/// takes the first section present.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process ledger committing each transaction after a fixed latency.
    Memory,
    /// In-process ledger that commits transactions in sealed blocks.
    Chain,
}

impl BackendKind {
    /// Fixed priority order used when probing a configuration for markers.
    pub const PROBE_ORDER: [BackendKind; 2] = [BackendKind::Memory, BackendKind::Chain];

    /// Configuration section key identifying this backend.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Chain => "chain",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PROBE_ORDER
            .into_iter()
            .find(|kind| kind.marker() == s)
            .ok_or_else(|| format!("unknown backend '{s}'"))
    }
}

// ============================================================================
// Outcome Records
// ============================================================================

/// Lifecycle status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Submitted but not yet confirmed.
    Created,
    /// Committed by the ledger.
    Success,
    /// Will never commit (rejected or timed out).
    Failed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Backend-tagged extension data attached to an outcome record.
///
/// Backends use this for diagnostics (block height, rejection reason, timeout
/// markers) without widening the fixed record fields the statistics engine
/// relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxExtensions {
    /// Backend that produced the record, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    /// Free-form diagnostic fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl TxExtensions {
    /// Creates an empty extension map tagged with `backend`.
    #[must_use]
    pub fn for_backend(backend: BackendKind) -> Self {
        Self { backend: Some(backend), fields: BTreeMap::new() }
    }

    /// Sets a diagnostic field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Returns a diagnostic field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// The outcome of one submitted transaction or query.
///
/// `time_valid` is only meaningful when `status` is [`TxStatus::Success`].
/// Producers must keep `time_valid >= time_create`; the statistics engine
/// rejects records that violate this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutcome {
    /// Opaque transaction identifier.
    pub id: String,
    /// Current status.
    pub status: TxStatus,
    /// Submission time, epoch milliseconds.
    pub time_create: u64,
    /// Commit time, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_valid: Option<u64>,
    /// Backend-specific response payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Whether the backend confirmed the final status.
    #[serde(default)]
    pub verified: bool,
    /// Backend-tagged diagnostics.
    #[serde(default)]
    pub extensions: TxExtensions,
}

impl TxOutcome {
    /// Creates a record in the `created` state.
    #[must_use]
    pub fn created(id: impl Into<String>, time_create: u64) -> Self {
        Self {
            id: id.into(),
            status: TxStatus::Created,
            time_create,
            time_valid: None,
            result: None,
            verified: false,
            extensions: TxExtensions::default(),
        }
    }

    /// Creates a `created` record stamped now and tagged with `backend`.
    #[must_use]
    pub fn submitted(id: impl Into<String>, backend: BackendKind) -> Self {
        Self { extensions: TxExtensions::for_backend(backend), ..Self::created(id, now_millis()) }
    }

    /// Transitions to `success`, committed at `time_valid`.
    pub fn mark_success(&mut self, time_valid: u64) {
        self.status = TxStatus::Success;
        self.time_valid = Some(time_valid);
        self.verified = true;
    }

    /// Transitions to `failed`, clearing any commit time.
    pub fn mark_failed(&mut self) {
        self.status = TxStatus::Failed;
        self.time_valid = None;
    }

    /// Attaches the backend response payload.
    #[must_use]
    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Returns true if the transaction committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// Commit latency, when committed with a well-formed commit time.
    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        if !self.is_committed() {
            return None;
        }
        let valid = self.time_valid?;
        valid.checked_sub(self.time_create).map(Duration::from_millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_context_id_display() {
        assert_eq!(ContextId::new(3).to_string(), "ctx:3");
        assert_eq!(BlockHeight::from(12).to_string(), "block:12");
    }

    #[test]
    fn test_backend_kind_marker_roundtrip() {
        for kind in BackendKind::PROBE_ORDER {
            assert_eq!(kind.marker().parse::<BackendKind>().unwrap(), kind);
        }
        assert!("fabric".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        let mut tx = TxOutcome::created("tx-1", 1_000);
        assert_eq!(tx.status, TxStatus::Created);
        assert!(!tx.is_committed());

        tx.mark_success(1_250);
        assert!(tx.is_committed());
        assert!(tx.verified);
        assert_eq!(tx.latency(), Some(Duration::from_millis(250)));

        tx.mark_failed();
        assert_eq!(tx.status, TxStatus::Failed);
        assert_eq!(tx.time_valid, None);
        assert_eq!(tx.latency(), None);
    }

    #[test]
    fn test_latency_none_when_commit_precedes_submit() {
        let mut tx = TxOutcome::created("tx-1", 2_000);
        tx.mark_success(1_000);
        assert_eq!(tx.latency(), None);
    }

    #[test]
    fn test_submitted_is_tagged() {
        let tx = TxOutcome::submitted("tx-2", BackendKind::Chain);
        assert_eq!(tx.extensions.backend, Some(BackendKind::Chain));
        assert!(tx.time_create > 0);
    }

    #[test]
    fn test_outcome_json_shape() {
        let mut tx = TxOutcome::created("tx-3", 1_000).with_result(serde_json::json!({"ok": true}));
        tx.mark_success(1_500);
        tx.extensions.insert("block_height", 7);

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["time_valid"], 1_500);
        assert_eq!(json["extensions"]["fields"]["block_height"], 7);

        let back: TxOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_outcome_requires_time_create() {
        let json = serde_json::json!({"id": "tx-4", "status": "failed"});
        assert!(serde_json::from_value::<TxOutcome>(json).is_err());
    }
}
