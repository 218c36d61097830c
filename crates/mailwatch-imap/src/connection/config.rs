//! Session configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout for TCP connect, TLS handshake and server greeting.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the LOGIN exchange.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 143).
    #[serde(rename = "starttls")]
    StartTls,
    /// TLS from the start (port 993). **Recommended.**
    #[default]
    #[serde(alias = "tls")]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// Configuration for an IMAP session.
#[derive(Clone)]
pub struct SessionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
    /// Bound on TCP connect, TLS handshake and greeting.
    pub connect_timeout: Duration,
    /// Bound on the LOGIN exchange.
    pub auth_timeout: Duration,
    /// Skip server certificate validation.
    ///
    /// Accepts any certificate the server presents, including self-signed and
    /// expired ones. Only meant for servers on trusted networks.
    pub danger_accept_invalid_certs: bool,
}

impl SessionConfig {
    /// Creates a new configuration with implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Security::Implicit.default_port(),
            security: Security::Implicit,
            username: String::new(),
            password: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            danger_accept_invalid_certs: false,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the security mode and resets the port to its default.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self.port = security.default_port();
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the authentication timeout.
    #[must_use]
    pub const fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Enables or disables certificate validation bypass.
    #[must_use]
    pub const fn danger_accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.danger_accept_invalid_certs = enabled;
        self
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("connect_timeout", &self.connect_timeout)
            .field("auth_timeout", &self.auth_timeout)
            .field(
                "danger_accept_invalid_certs",
                &self.danger_accept_invalid_certs,
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 143);
        assert_eq!(Security::StartTls.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_config_new() {
        let config = SessionConfig::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.auth_timeout, Duration::from_secs(10));
        assert!(!config.danger_accept_invalid_certs);
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new("imap.example.com")
            .security(Security::None)
            .port(1143)
            .credentials("user@example.com", "secret")
            .connect_timeout(Duration::from_secs(5))
            .danger_accept_invalid_certs(true);

        assert_eq!(config.port, 1143);
        assert_eq!(config.security, Security::None);
        assert_eq!(config.username, "user@example.com");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.danger_accept_invalid_certs);
    }

    #[test]
    fn test_debug_hides_password() {
        let config = SessionConfig::new("imap.example.com").credentials("user", "hunter2");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_security_serde() {
        let parsed: Security = serde_json::from_str("\"tls\"").unwrap();
        assert_eq!(parsed, Security::Implicit);
        let parsed: Security = serde_json::from_str("\"starttls\"").unwrap();
        assert_eq!(parsed, Security::StartTls);
        let parsed: Security = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, Security::None);
    }
}
