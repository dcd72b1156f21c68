//! Error types for building selection chains

use crate::eval::EvalError;
use crate::parser::ParseError;
use thiserror::Error;

/// Errors raised while constructing selection stages
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("Cut parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Invalid stage '{name}': {reason}")]
    InvalidStage { name: String, reason: String },
}

impl SelectionError {
    pub fn invalid_stage(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStage {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for selection construction
pub type SelectionResult<T> = Result<T, SelectionError>;
