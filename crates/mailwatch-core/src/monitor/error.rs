//! Error taxonomy of the connection monitor.
//!
//! One enum per operation, so callers can tell a refused login from a
//! missing mailbox without string matching. [`MonitorError`] is their union
//! and travels with revoked queries.

use thiserror::Error;

/// The session could not reach the authenticated state.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Connect, TLS or LOGIN failed in the session.
    #[error("connection failed: {0}")]
    Session(#[from] mailwatch_imap::Error),

    /// The monitor was closed; its session is gone.
    #[error("monitor is closed")]
    Closed,
}

/// Health check failure.
#[derive(Debug, Error)]
pub enum StateError {
    /// No network connectivity was detected.
    #[error("no network connection")]
    Offline,

    /// There is no live session (the monitor was closed).
    #[error("no session; log in again")]
    NoSession,

    /// The session exists but is not authenticated.
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// The reconnection attempt failed.
    #[error("reconnect failed: {0}")]
    Connect(#[from] ConnectError),
}

/// Mailbox selection failed.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The server or connection rejected the selection.
    #[error("cannot open mailbox {mailbox:?}: {source}")]
    Session {
        /// Mailbox that was requested.
        mailbox: String,
        /// Underlying session error.
        #[source]
        source: mailwatch_imap::Error,
    },

    /// The session cannot carry mailbox commands.
    #[error(transparent)]
    State(#[from] StateError),
}

/// Search request failed.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The server or connection rejected the search.
    #[error("search failed: {0}")]
    Session(#[from] mailwatch_imap::Error),

    /// The session cannot carry mailbox commands.
    #[error(transparent)]
    State(#[from] StateError),
}

/// Any failure of a poll tick.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Health check failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// Opening the mailbox failed.
    #[error(transparent)]
    Open(#[from] OpenError),

    /// The search failed.
    #[error(transparent)]
    Search(#[from] SearchError),
}
