//! Error types for the core library.

use thiserror::Error;

use crate::config::ValidationError;

/// Errors from loading and validating configuration.
///
/// Monitor operations have their own taxonomy in [`crate::monitor`].
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration failed validation.
    #[error("Invalid configuration: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
