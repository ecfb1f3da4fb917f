//! Error handling for the statement engine
//!
//! Line-level problems (a malformed amount, a missing header label, a total
//! that does not reconcile) are never errors: the engine recovers locally and
//! surfaces them through the validation status. The variants here cover the
//! few conditions that abort a single document or the whole run.

use thiserror::Error;

/// Document- and run-level failures
#[derive(Error, Debug)]
pub enum StatementError {
    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias used across the crate
pub type Result<T> = anyhow::Result<T>;
