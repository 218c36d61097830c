//! # mailwatch-core
//!
//! Keeps one IMAP session healthy and polls one mailbox with a recurring
//! search.
//!
//! This crate provides:
//! - [`ConnectionMonitor`], the session owner and poll timer
//! - [`Query`] and the per-operation error taxonomy
//! - [`MonitorEvent`], published on an unbounded channel
//! - Connectivity probes consulted before every tick
//! - The JSON configuration model and its validation
//!
//! ## Example
//!
//! ```ignore
//! use mailwatch_core::{ConnectionMonitor, Query, ResolverProbe};
//! use mailwatch_imap::{ImapSession, SessionConfig};
//!
//! let config = SessionConfig::new("imap.example.com").credentials("user", "password");
//! let probe = ResolverProbe::new(&config.host, config.port);
//! let (monitor, mut events) = ConnectionMonitor::new(ImapSession::new(config), probe);
//!
//! monitor.init().await?;
//! monitor.set_query(Query::unseen("INBOX"));
//! monitor.monitor();
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod connectivity;
mod error;
pub mod monitor;

pub use config::{AccountConfig, ValidationError, ValidationResult, WatchConfig, validate_account};
pub use connectivity::{AlwaysOnline, Connectivity, ResolverProbe};
pub use error::{Error, Result};
pub use monitor::{
    CLOSE_GRACE, ConnectError, ConnectionMonitor, MonitorError, MonitorEvent, OpenError, POLL_INTERVAL,
    Query, SearchError, StateError,
};
