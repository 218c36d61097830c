//! The mail session capability.
//!
//! A [`MailSession`] is everything the connection monitor needs from a mail
//! server: connect and authenticate, select a mailbox, search it, report its
//! connection state and shut down. The production implementation is
//! [`ImapSession`](crate::ImapSession); tests drive the monitor with
//! scripted implementations.

use std::fmt;
use std::future::Future;

use crate::{Result, SearchCriteria};

/// Connection state reported by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Connect or LOGIN in progress.
    Connecting,
    /// Logged in; mailbox commands are allowed.
    Authenticated,
    /// The last connect attempt failed.
    Error,
}

impl SessionState {
    /// Returns true if mailbox commands may be issued.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticated => "authenticated",
            Self::Error => "error",
        })
    }
}

/// A single connection to a mail server.
///
/// All methods take `&mut self`: one session carries one command at a time.
/// Futures are `Send` so a session can be driven from a spawned task.
pub trait MailSession: Send + 'static {
    /// Connects and authenticates, replacing any existing connection.
    ///
    /// Resolves once the server accepted the credentials. On failure the
    /// session reports [`SessionState::Error`].
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Selects `mailbox`; `read_only` opens it without changing flags.
    fn open_mailbox(
        &mut self,
        mailbox: &str,
        read_only: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Searches the open mailbox and returns matching UIDs.
    fn search(&mut self, criteria: &SearchCriteria) -> impl Future<Output = Result<Vec<u32>>> + Send;

    /// Current connection state.
    fn state(&self) -> SessionState;

    /// Logs out and drops the connection. Never fails.
    fn end(&mut self) -> impl Future<Output = ()> + Send;
}
