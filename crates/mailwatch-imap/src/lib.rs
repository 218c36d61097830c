//! # mailwatch-imap
//!
//! The mail session capability behind the `mailwatch` connection monitor.
//!
//! The monitor never speaks IMAP itself. It drives a [`MailSession`]: connect
//! and authenticate, open a mailbox, search it, report connection state, shut
//! down. [`ImapSession`] implements that trait on top of `async-imap` over a
//! `tokio-rustls` stream.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwatch_imap::{ImapSession, MailSession, SearchCriteria, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> mailwatch_imap::Result<()> {
//!     let config = SessionConfig::new("imap.example.com")
//!         .credentials("user@example.com", "password");
//!
//!     let mut session = ImapSession::new(config);
//!     session.connect().await?;
//!     session.open_mailbox("INBOX", true).await?;
//!
//!     let unseen = session.search(&SearchCriteria::Unseen).await?;
//!     println!("{} unseen messages", unseen.len());
//!
//!     session.end().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Disconnected ── connect() ──→ Connecting ──→ Authenticated
//!                                    │               │
//!                                    ▼               │ connection lost
//!                                  Error             ▼
//!                                               Disconnected
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod connection;
mod error;
mod search;
mod session;

pub use connection::{ImapSession, ImapStream, Security, SessionConfig};
pub use error::{Error, Result};
pub use search::SearchCriteria;
pub use session::{MailSession, SessionState};
