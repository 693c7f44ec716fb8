//! Error types for Trellis CLI.

use thiserror::Error;

/// Result type alias for Trellis CLI.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from the view engine.
    #[error("View error: {0}")]
    Views(#[from] trellis_views::ViewError),

    /// Rendering failed.
    #[error("{0}")]
    Render(#[from] trellis_core::RenderingFailure),

    /// Error from configuration operations.
    #[error("Configuration error: {0}")]
    Config(#[from] trellis_core::ConfigError),

    /// Error loading the project configuration.
    #[error(transparent)]
    Load(#[from] crate::config::ConfigLoadError),

    /// Error decoding view data.
    #[error("Invalid view data: {0}")]
    Data(#[from] serde_json::Error),

    /// Error from IO operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from argument parsing.
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}

impl CliError {
    /// Create an invalid arguments error.
    #[must_use]
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }
}
