//! The monitored query.

use mailwatch_imap::SearchCriteria;
use serde::{Deserialize, Serialize};

/// A mailbox and the search to run against it on every poll tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Mailbox to open, e.g. `INBOX`.
    pub mailbox: String,
    /// Search to run in the mailbox.
    #[serde(default)]
    pub criteria: SearchCriteria,
}

impl Query {
    /// Creates a query.
    #[must_use]
    pub fn new(mailbox: impl Into<String>, criteria: SearchCriteria) -> Self {
        Self {
            mailbox: mailbox.into(),
            criteria,
        }
    }

    /// Creates a query for unseen messages in `mailbox`.
    #[must_use]
    pub fn unseen(mailbox: impl Into<String>) -> Self {
        Self::new(mailbox, SearchCriteria::Unseen)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_criteria() {
        let query: Query = serde_json::from_str(r#"{"mailbox": "INBOX"}"#).unwrap();
        assert_eq!(query, Query::unseen("INBOX"));
    }

    #[test]
    fn test_structured_criteria() {
        let query: Query =
            serde_json::from_str(r#"{"mailbox": "Work", "criteria": {"From": "boss@example.com"}}"#)
                .unwrap();
        assert_eq!(query.mailbox, "Work");
        assert_eq!(
            query.criteria,
            SearchCriteria::From("boss@example.com".into())
        );
    }
}
