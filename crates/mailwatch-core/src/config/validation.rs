//! Configuration validation.

use super::model::{AccountConfig, WatchConfig};

/// Validation error for the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// IMAP host is empty.
    EmptyHost,
    /// IMAP port is invalid.
    InvalidPort,
    /// Username is empty.
    EmptyUsername,
    /// Password is missing from both the file and the environment.
    EmptyPassword,
    /// The query names no mailbox.
    EmptyMailbox,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyHost => "IMAP server is required",
            Self::InvalidPort => "IMAP port must be 1-65535",
            Self::EmptyUsername => "IMAP username is required",
            Self::EmptyPassword => "IMAP password is required",
            Self::EmptyMailbox => "Query mailbox is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyHost => "account.host",
            Self::InvalidPort => "account.port",
            Self::EmptyUsername => "account.username",
            Self::EmptyPassword => "account.password",
            Self::EmptyMailbox => "query.mailbox",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate account settings.
///
/// # Errors
///
/// Returns every `ValidationError` found, not just the first.
pub fn validate_account(account: &AccountConfig) -> ValidationResult {
    into_result(account_errors(account))
}

/// Validate the account and the optional query.
///
/// # Errors
///
/// Returns every `ValidationError` found, not just the first.
pub fn validate_config(config: &WatchConfig) -> ValidationResult {
    let mut errors = account_errors(&config.account);
    if let Some(query) = &config.query
        && query.mailbox.trim().is_empty()
    {
        errors.push(ValidationError::EmptyMailbox);
    }
    into_result(errors)
}

fn into_result(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn account_errors(account: &AccountConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if account.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if account.port == Some(0) {
        errors.push(ValidationError::InvalidPort);
    }
    if account.username.trim().is_empty() {
        errors.push(ValidationError::EmptyUsername);
    }
    if account.password.as_deref().is_none_or(str::is_empty) {
        errors.push(ValidationError::EmptyPassword);
    }

    errors
}
