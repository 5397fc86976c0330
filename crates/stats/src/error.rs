//! Statistics engine error types.

use ledger_bench_types::ErrorCode;
use snafu::Snafu;

/// Result type alias for statistics operations.
pub type Result<T, E = StatsError> = std::result::Result<T, E>;

/// Errors raised while aggregating outcome records.
///
/// The engine never fails on well-formed input. These variants report caller
/// contract violations instead of folding corrupted values into an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum StatsError {
    /// An outcome record violates the record contract.
    #[snafu(display("malformed record #{index} ({id}): {reason}"))]
    RecordFormat {
        /// Position of the record in the aggregated sequence.
        index: u64,
        /// Transaction identifier of the record.
        id: String,
        /// What is wrong with the record.
        reason: String,
    },

    /// Merge was called with no aggregates.
    #[snafu(display("cannot merge an empty set of aggregates"))]
    EmptyMerge,
}

impl StatsError {
    /// Returns the stable error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RecordFormat { .. } => ErrorCode::RecordFormat,
            Self::EmptyMerge => ErrorCode::EmptyMerge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_format_display() {
        let err = StatsError::RecordFormat {
            index: 4,
            id: "tx-9".to_owned(),
            reason: "missing time_valid".to_owned(),
        };
        assert_eq!(err.to_string(), "malformed record #4 (tx-9): missing time_valid");
        assert_eq!(err.code(), ErrorCode::RecordFormat);
        assert!(!err.code().is_retryable());
    }

    #[test]
    fn test_empty_merge_code() {
        assert_eq!(StatsError::EmptyMerge.code(), ErrorCode::EmptyMerge);
    }
}
