//! Error types for histogram operations

use thiserror::Error;

/// Errors raised by histogram construction, arithmetic and variation registration
///
/// All of these are structural errors detected synchronously. The operation
/// that raised one leaves its receiver unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistError {
    #[error("Invalid bin edges: {0}")]
    InvalidEdges(String),

    #[error("Incompatible binning: {0}")]
    IncompatibleBinning(String),

    #[error("Duplicate variation: {0}")]
    DuplicateVariation(String),

    #[error("Variation '{name}' does not share the nominal binning")]
    BinningMismatch { name: String },

    #[error("Unknown variation: {0}")]
    UnknownVariation(String),

    #[error("Histogram is already normalized by bin width")]
    AlreadyNormalized,

    #[error("Bin out of range: index {index}, size {size}")]
    BinOutOfRange { index: usize, size: usize },

    #[error("Length mismatch: expected {expected} bins, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Histogram family mismatch: {numerators} numerators, {denominators} denominators")]
    FamilyMismatch {
        numerators: usize,
        denominators: usize,
    },

    #[error("Series index {index} out of range for {len} series")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result type for histogram operations
pub type HistResult<T> = Result<T, HistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HistError::BinOutOfRange { index: 7, size: 4 };
        assert!(err.to_string().contains("index 7"));

        let err = HistError::BinningMismatch {
            name: "pdf".to_string(),
        };
        assert!(err.to_string().contains("pdf"));
    }
}
