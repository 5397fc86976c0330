//! Machine-readable error codes shared across the benchmark crates.
//!
//! Each error variant in the adapter and statistics crates maps to an
//! [`ErrorCode`] with a unique numeric identifier and a retryability
//! classification. Codes are organized into ranges:
//!
//! | Range       | Domain      | Examples                                   |
//! |-------------|-------------|--------------------------------------------|
//! | 1000–1099   | Setup       | Backend selection, configuration           |
//! | 2000–2099   | Adapter     | Init, provisioning, deployment, contexts   |
//! | 2100–2199   | Adapter     | Invocation and query infrastructure faults |
//! | 3000–3099   | Statistics  | Malformed records, empty merges            |
//!
//! The core never retries on its own. Retry policy belongs to the workload
//! driver, which can consult [`ErrorCode::is_retryable`].

use core::fmt;

/// Stable error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Setup errors (1000–1099) ---
    /// No recognizable backend marker, or an invalid configuration section.
    Configuration = 1000,

    // --- Adapter errors (2000–2199) ---
    /// Backend initialization failed or was attempted twice.
    Initialization = 2000,
    /// Fewer client credential sets could be created than requested.
    Provisioning = 2001,
    /// Smart contract deployment failed.
    Deployment = 2002,
    /// A context could not be bound, or a released context was used.
    Context = 2003,
    /// Infrastructure failure while submitting a transaction.
    Invocation = 2100,
    /// Infrastructure failure while querying state.
    Query = 2101,

    // --- Statistics errors (3000–3099) ---
    /// Outcome record violates the record contract.
    RecordFormat = 3000,
    /// Merge requested over zero aggregates.
    EmptyMerge = 3001,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether a driver may reasonably retry the failed operation.
    ///
    /// Only transaction-path infrastructure faults are transient. Setup
    /// failures and contract violations need corrective action first.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Invocation | Self::Query)
    }

    /// Suggested recovery action for this error code.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::Configuration => {
                "Add exactly one backend section (e.g. [memory] or [chain]) to the network configuration."
            },
            Self::Initialization => {
                "Initialize each backend deployment exactly once before installing contracts."
            },
            Self::Provisioning => "Request fewer clients or raise the backend's max_clients.",
            Self::Deployment => "Check contract ids and versions for duplicates or empty values.",
            Self::Context => "Acquire a fresh context; released contexts cannot be reused.",
            Self::Invocation => "Transient backend fault. The driver may retry the transaction.",
            Self::Query => "Transient backend fault. The driver may retry the query.",
            Self::RecordFormat => {
                "Ensure successful records carry time_valid >= time_create before aggregating."
            },
            Self::EmptyMerge => "Pass at least one partial aggregate to merge.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
