//! Configuration file model and validation.
//!
//! The binary reads one JSON document describing the account and, optionally,
//! the query to poll:
//!
//! ```json
//! {
//!   "account": {
//!     "host": "imap.example.com",
//!     "security": "implicit",
//!     "username": "user@example.com"
//!   },
//!   "query": { "mailbox": "INBOX", "criteria": "Unseen" }
//! }
//! ```
//!
//! A missing password is taken from the `MAILWATCH_PASSWORD` environment
//! variable.

mod model;
mod validation;

pub use model::{AccountConfig, PASSWORD_ENV, WatchConfig};
pub use validation::{ValidationError, ValidationResult, validate_account, validate_config};
