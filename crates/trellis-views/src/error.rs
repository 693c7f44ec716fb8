//! Error types for Trellis Views.

use std::path::PathBuf;

use thiserror::Error;
use trellis_core::EngineError;

/// Result type alias for view engine startup.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Errors raised while setting up views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Views directory is missing.
    #[error("Views directory '{0}' does not exist")]
    MissingDirectory(PathBuf),

    /// Views failed to parse or compile.
    #[error("View error: {0}")]
    Engine(#[from] EngineError),
}
