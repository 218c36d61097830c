//! Error types for the IMAP session layer.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to an IMAP server.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// The connection was closed underneath us.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Security mode not supported by this session.
    #[error("Security mode not supported: {0}")]
    UnsupportedSecurity(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true if the error means the underlying connection is gone.
    ///
    /// Sessions use this to drop back to `Disconnected` so the next health
    /// check reconnects instead of reusing a dead socket.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Tls(_) | Self::ConnectionLost(_) | Self::Timeout(_)
        )
    }
}

impl From<async_imap::error::Error> for Error {
    fn from(err: async_imap::error::Error) -> Self {
        use async_imap::error::Error as ImapError;

        match err {
            ImapError::Io(e) => Self::Io(e),
            ImapError::ConnectionLost => Self::ConnectionLost("server closed the stream".into()),
            ImapError::No(text) => Self::No(text),
            ImapError::Bad(text) => Self::Bad(text),
            other => Self::Protocol(other.to_string()),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors() {
        assert!(Error::ConnectionLost("eof".into()).is_connection_error());
        assert!(Error::Timeout(Duration::from_secs(1)).is_connection_error());
        assert!(
            Error::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"))
                .is_connection_error()
        );
    }

    #[test]
    fn test_server_replies_keep_connection() {
        assert!(!Error::No("no such mailbox".into()).is_connection_error());
        assert!(!Error::Bad("parse error".into()).is_connection_error());
        assert!(!Error::Auth("rejected".into()).is_connection_error());
    }

    #[test]
    fn test_from_async_imap() {
        let err: Error = async_imap::error::Error::No("Mailbox doesn't exist".into()).into();
        assert!(matches!(err, Error::No(ref text) if text == "Mailbox doesn't exist"));

        let err: Error = async_imap::error::Error::ConnectionLost.into();
        assert!(err.is_connection_error());
    }
}
