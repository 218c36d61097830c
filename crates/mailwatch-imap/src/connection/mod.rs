//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - [`ImapSession`], the `async-imap` backed [`MailSession`](crate::MailSession)

mod config;
mod session;
mod stream;

pub use config::{DEFAULT_AUTH_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, Security, SessionConfig};
pub use session::ImapSession;
pub use stream::{ImapStream, connect_plain, connect_tls, create_tls_connector};
