//! Generator errors

use std::path::PathBuf;

use gi_types::DescriptorError;
use thiserror::Error;

/// Errors raised while loading inputs or writing generated sources
#[derive(Debug, Error)]
pub enum GenError {
    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed config or state JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed namespace descriptor
    #[error("Invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    /// State file written for a different namespace chain
    #[error("State file {path} was written after {found:?}, expected {expected:?}")]
    StateMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

pub type GenResult<T> = Result<T, GenError>;
