//! Error types for monox-core

use monox_hist::HistError;
use monox_io::IoError;
use monox_selection::{EvalError, ParseError, SelectionError};
use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for the analysis pipeline
#[derive(Error, Debug)]
pub enum MonoxError {
    #[error("Histogram error: {0}")]
    Hist(#[from] HistError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Cut evaluation failed: {0}")]
    Eval(#[from] EvalError),

    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown sample: {0}")]
    UnknownSample(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown factor histogram: {0}")]
    UnknownFactor(String),

    #[error("Unknown transfer ratio: {0}")]
    UnknownTransfer(String),
}

impl From<ParseError> for MonoxError {
    fn from(e: ParseError) -> Self {
        MonoxError::Selection(SelectionError::Parse(e))
    }
}

/// Result type for pipeline operations
pub type MonoxResult<T> = Result<T, MonoxError>;
