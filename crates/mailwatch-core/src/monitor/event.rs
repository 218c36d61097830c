//! Events published by the monitor.

use chrono::{DateTime, Utc};

use super::error::MonitorError;
use super::query::Query;

/// Something the monitor wants its embedder to know about.
///
/// Delivered on the unbounded channel returned by
/// [`ConnectionMonitor::new`](super::ConnectionMonitor::new). Publishing
/// never blocks the poll loop.
#[derive(Debug)]
pub enum MonitorEvent {
    /// The session (re)connected and authenticated.
    Connected {
        /// When the session became ready.
        at: DateTime<Utc>,
    },

    /// A poll tick completed its search.
    Messages {
        /// Mailbox that was searched.
        mailbox: String,
        /// Matching message UIDs, ascending.
        ids: Vec<u32>,
        /// When the search completed.
        at: DateTime<Utc>,
    },

    /// A poll tick failed and its query was dropped.
    ///
    /// The query is not retried; set it again to resume polling.
    QueryRevoked {
        /// The query that failed.
        query: Query,
        /// Why it failed.
        error: MonitorError,
        /// When the tick failed.
        at: DateTime<Utc>,
    },

    /// The monitor stopped and its session was terminated.
    Closed {
        /// When the session was terminated.
        at: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Returns when the event happened.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Connected { at }
            | Self::Messages { at, .. }
            | Self::QueryRevoked { at, .. }
            | Self::Closed { at } => *at,
        }
    }
}
