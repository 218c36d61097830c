//! Configuration model types.

use std::path::{Path, PathBuf};

use mailwatch_imap::{Security, SessionConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::validation::validate_config;
use crate::monitor::Query;
use crate::{Error, Result};

/// Environment variable consulted when the config file carries no password.
pub const PASSWORD_ENV: &str = "MAILWATCH_PASSWORD";

/// IMAP account settings.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Server hostname.
    pub host: String,
    /// Server port; the security mode's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Accept any server certificate.
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,
}

impl AccountConfig {
    /// Returns the configured port or the security mode's default.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security.default_port())
    }

    /// Fills in the password from `fallback` when the file has none.
    #[must_use]
    pub fn with_password_fallback(mut self, fallback: Option<String>) -> Self {
        if self.password.as_deref().is_none_or(str::is_empty) {
            self.password = fallback.or(self.password);
        }
        self
    }

    /// Builds the session configuration for this account.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.host.trim())
            .security(self.security)
            .port(self.effective_port())
            .credentials(
                self.username.trim(),
                self.password.clone().unwrap_or_default(),
            )
            .danger_accept_invalid_certs(self.danger_accept_invalid_certs)
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("host", &self.host)
            .field("port", &self.effective_port())
            .field("security", &self.security)
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .field(
                "danger_accept_invalid_certs",
                &self.danger_accept_invalid_certs,
            )
            .finish()
    }
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Account to connect with.
    pub account: AccountConfig,
    /// Query to poll once connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
}

impl WatchConfig {
    /// Default configuration file location, `<config dir>/mailwatch/config.json`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the platform has no config directory.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("mailwatch").join("config.json"))
            .ok_or_else(|| Error::Config("could not determine config directory".into()))
    }

    /// Parses a configuration document without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serde`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads, completes and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Serde`] if
    /// it is not valid JSON and [`Error::Validation`] listing every problem.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration");
        let json = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&json)?;
        config.account = config
            .account
            .with_password_fallback(std::env::var(PASSWORD_ENV).ok());

        validate_config(&config).map_err(Error::Validation)?;
        Ok(config)
    }
}
