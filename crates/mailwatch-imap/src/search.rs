//! Structured SEARCH criteria.
//!
//! [`SearchCriteria`] is the filter a monitored query runs against its
//! mailbox. It renders to the search-key part of an IMAP `UID SEARCH`
//! command (RFC 9051 §6.4.4); the session passes that string to the server
//! as-is.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Search criteria for the SEARCH command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages with \Answered flag.
    Answered,
    /// Messages with \Deleted flag.
    Deleted,
    /// Messages with \Draft flag.
    Draft,
    /// Messages with \Flagged flag.
    Flagged,
    /// Messages that are recent and not seen.
    New,
    /// Messages without \Deleted flag.
    Undeleted,
    /// Messages without \Seen flag.
    #[default]
    Unseen,
    /// Messages with \Seen flag.
    Seen,
    /// Subject contains text.
    Subject(String),
    /// From contains text.
    From(String),
    /// To contains text.
    To(String),
    /// Body contains text.
    Body(String),
    /// Text in header or body.
    Text(String),
    /// Messages with an internal date on or after the given day.
    Since(NaiveDate),
    /// Messages with an internal date before the given day.
    Before(NaiveDate),
    /// Messages with an internal date on the given day.
    On(NaiveDate),
    /// Larger than size in octets.
    Larger(u32),
    /// Smaller than size in octets.
    Smaller(u32),
    /// Header field contains value.
    Header(String, String),
    /// All of the criteria must match.
    And(Vec<Self>),
    /// Either criterion matches.
    Or(Box<Self>, Box<Self>),
    /// The criterion does not match.
    Not(Box<Self>),
    /// Search keys passed through verbatim.
    Raw(String),
}

impl SearchCriteria {
    /// Renders the criteria as an IMAP search-key string.
    ///
    /// Criteria carrying non-ASCII text are prefixed with `CHARSET UTF-8`.
    #[must_use]
    pub fn to_search_key(&self) -> String {
        let mut buf = String::new();
        if !self.is_ascii() {
            buf.push_str("CHARSET UTF-8 ");
        }
        write_search_criteria(&mut buf, self);
        buf
    }

    /// Returns true if every string in the criteria is 7-bit.
    #[must_use]
    pub fn is_ascii(&self) -> bool {
        match self {
            Self::Subject(s)
            | Self::From(s)
            | Self::To(s)
            | Self::Body(s)
            | Self::Text(s)
            | Self::Raw(s) => s.is_ascii(),
            Self::Header(name, value) => name.is_ascii() && value.is_ascii(),
            Self::And(items) => items.iter().all(Self::is_ascii),
            Self::Or(a, b) => a.is_ascii() && b.is_ascii(),
            Self::Not(c) => c.is_ascii(),
            _ => true,
        }
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::new();
        write_search_criteria(&mut buf, self);
        f.write_str(&buf)
    }
}

/// Writes an astring (atom or quoted string).
///
/// CR and LF cannot appear in a quoted string and are dropped.
fn write_astring(buf: &mut String, s: &str) {
    if s.is_empty() || s.chars().any(needs_quoting) {
        buf.push('"');
        for c in s.chars().filter(|c| !matches!(c, '\r' | '\n')) {
            if c == '"' || c == '\\' {
                buf.push('\\');
            }
            buf.push(c);
        }
        buf.push('"');
    } else {
        buf.push_str(s);
    }
}

/// Returns true if the character needs quoting.
const fn needs_quoting(c: char) -> bool {
    matches!(c, ' ' | '"' | '\\' | '(' | ')' | '{' | '%' | '*' | ']')
        || c < '\u{20}'
        || c == '\u{7f}'
        || !c.is_ascii()
}

/// Raw keys with line breaks folded to spaces, so they stay on one command line.
fn raw_key(raw: &str) -> String {
    raw.replace(['\r', '\n'], " ").trim().to_string()
}

/// Writes an IMAP date (`17-Oct-2026`).
fn write_date(buf: &mut String, date: NaiveDate) {
    buf.push_str(&date.format("%-d-%b-%Y").to_string());
}

/// Writes a criterion that must stand as a single search key.
fn write_nested(buf: &mut String, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::And(items) if items.len() > 1 => {
            buf.push('(');
            write_search_criteria(buf, criteria);
            buf.push(')');
        }
        SearchCriteria::Raw(raw) if raw_key(raw).contains(' ') => {
            buf.push('(');
            buf.push_str(&raw_key(raw));
            buf.push(')');
        }
        _ => write_search_criteria(buf, criteria),
    }
}

fn write_search_criteria(buf: &mut String, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::All => buf.push_str("ALL"),
        SearchCriteria::Answered => buf.push_str("ANSWERED"),
        SearchCriteria::Deleted => buf.push_str("DELETED"),
        SearchCriteria::Draft => buf.push_str("DRAFT"),
        SearchCriteria::Flagged => buf.push_str("FLAGGED"),
        SearchCriteria::New => buf.push_str("NEW"),
        SearchCriteria::Undeleted => buf.push_str("UNDELETED"),
        SearchCriteria::Unseen => buf.push_str("UNSEEN"),
        SearchCriteria::Seen => buf.push_str("SEEN"),
        SearchCriteria::Subject(s) => {
            buf.push_str("SUBJECT ");
            write_astring(buf, s);
        }
        SearchCriteria::From(s) => {
            buf.push_str("FROM ");
            write_astring(buf, s);
        }
        SearchCriteria::To(s) => {
            buf.push_str("TO ");
            write_astring(buf, s);
        }
        SearchCriteria::Body(s) => {
            buf.push_str("BODY ");
            write_astring(buf, s);
        }
        SearchCriteria::Text(s) => {
            buf.push_str("TEXT ");
            write_astring(buf, s);
        }
        SearchCriteria::Since(date) => {
            buf.push_str("SINCE ");
            write_date(buf, *date);
        }
        SearchCriteria::Before(date) => {
            buf.push_str("BEFORE ");
            write_date(buf, *date);
        }
        SearchCriteria::On(date) => {
            buf.push_str("ON ");
            write_date(buf, *date);
        }
        SearchCriteria::Larger(size) => {
            buf.push_str(&format!("LARGER {size}"));
        }
        SearchCriteria::Smaller(size) => {
            buf.push_str(&format!("SMALLER {size}"));
        }
        SearchCriteria::Header(name, value) => {
            buf.push_str("HEADER ");
            write_astring(buf, name);
            buf.push(' ');
            write_astring(buf, value);
        }
        SearchCriteria::And(items) => {
            if items.is_empty() {
                buf.push_str("ALL");
            }
            for (i, c) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(' ');
                }
                write_search_criteria(buf, c);
            }
        }
        SearchCriteria::Or(a, b) => {
            buf.push_str("OR ");
            write_nested(buf, a);
            buf.push(' ');
            write_nested(buf, b);
        }
        SearchCriteria::Not(c) => {
            buf.push_str("NOT ");
            write_nested(buf, c);
        }
        SearchCriteria::Raw(raw) => buf.push_str(&raw_key(raw)),
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
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_flag_keys() {
        assert_eq!(SearchCriteria::Unseen.to_search_key(), "UNSEEN");
        assert_eq!(SearchCriteria::All.to_search_key(), "ALL");
        assert_eq!(SearchCriteria::default(), SearchCriteria::Unseen);
    }

    #[test]
    fn test_text_quoting() {
        assert_eq!(
            SearchCriteria::Subject("invoice".into()).to_search_key(),
            "SUBJECT invoice"
        );
        assert_eq!(
            SearchCriteria::Subject("monthly invoice".into()).to_search_key(),
            "SUBJECT \"monthly invoice\""
        );
        assert_eq!(
            SearchCriteria::From("a\"b".into()).to_search_key(),
            "FROM \"a\\\"b\""
        );
        assert_eq!(SearchCriteria::Body(String::new()).to_search_key(), "BODY \"\"");
    }

    #[test]
    fn test_dates() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 7).unwrap();
        assert_eq!(SearchCriteria::Since(date).to_search_key(), "SINCE 7-Oct-2026");
        assert_eq!(SearchCriteria::Before(date).to_search_key(), "BEFORE 7-Oct-2026");
    }

    #[test]
    fn test_compound() {
        let criteria = SearchCriteria::And(vec![
            SearchCriteria::Unseen,
            SearchCriteria::Or(
                Box::new(SearchCriteria::From("alice@example.com".into())),
                Box::new(SearchCriteria::And(vec![
                    SearchCriteria::Flagged,
                    SearchCriteria::Larger(1024),
                ])),
            ),
        ]);
        assert_eq!(
            criteria.to_search_key(),
            "UNSEEN OR FROM alice@example.com (FLAGGED LARGER 1024)"
        );

        let negated = SearchCriteria::Not(Box::new(SearchCriteria::Raw("SEEN DELETED".into())));
        assert_eq!(negated.to_search_key(), "NOT (SEEN DELETED)");
        assert_eq!(SearchCriteria::And(Vec::new()).to_search_key(), "ALL");
    }

    #[test]
    fn test_header_and_raw() {
        let criteria = SearchCriteria::Header("X-Priority".into(), "1".into());
        assert_eq!(criteria.to_search_key(), "HEADER X-Priority 1");
        assert_eq!(
            SearchCriteria::Raw("  UNSEEN SINCE 1-Jan-2026 ".into()).to_search_key(),
            "UNSEEN SINCE 1-Jan-2026"
        );
    }

    #[test]
    fn test_raw_line_breaks_are_folded() {
        let key = SearchCriteria::Raw("UNSEEN\r\nX1 DELETE INBOX".into()).to_search_key();
        assert!(!key.contains(['\r', '\n']), "{key:?}");
        assert_eq!(key, "UNSEEN  X1 DELETE INBOX");

        let negated = SearchCriteria::Not(Box::new(SearchCriteria::Raw("SEEN\n".into())));
        assert_eq!(negated.to_search_key(), "NOT SEEN");
    }

    #[test]
    fn test_utf8_charset() {
        assert_eq!(
            SearchCriteria::Subject("Grüße".into()).to_search_key(),
            "CHARSET UTF-8 SUBJECT \"Grüße\""
        );

        let nested = SearchCriteria::And(vec![
            SearchCriteria::Unseen,
            SearchCriteria::Not(Box::new(SearchCriteria::From("zoë@example.com".into()))),
        ]);
        assert!(!nested.is_ascii());
        assert!(nested.to_search_key().starts_with("CHARSET UTF-8 UNSEEN NOT FROM"));
        assert_eq!(nested.to_string(), "UNSEEN NOT FROM \"zoë@example.com\"");

        assert!(SearchCriteria::Subject("invoice".into()).is_ascii());
        assert_eq!(
            SearchCriteria::Subject("invoice".into()).to_search_key(),
            "SUBJECT invoice"
        );
    }

    #[test]
    fn test_serde_shapes() {
        let parsed: SearchCriteria = serde_json::from_str("\"Unseen\"").unwrap();
        assert_eq!(parsed, SearchCriteria::Unseen);

        let parsed: SearchCriteria =
            serde_json::from_str(r#"{"And": ["Unseen", {"Since": "2026-10-01"}]}"#).unwrap();
        assert_eq!(parsed.to_search_key(), "UNSEEN SINCE 1-Oct-2026");
    }

    proptest! {
        #[test]
        fn prop_quoted_text_is_single_token(text in "\\PC{0,40}") {
            let key = SearchCriteria::Text(text).to_search_key();
            let key = key.strip_prefix("CHARSET UTF-8 ").unwrap_or(&key);
            let arg = key.strip_prefix("TEXT ").unwrap();

            prop_assert!(!arg.contains('\r') && !arg.contains('\n'));
            if arg.starts_with('"') {
                prop_assert!(arg.len() >= 2 && arg.ends_with('"'));
                // Every interior quote is escaped.
                let inner = &arg[1..arg.len() - 1];
                let mut escaped = false;
                for c in inner.chars() {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else {
                        prop_assert_ne!(c, '"');
                    }
                }
                prop_assert!(!escaped);
            } else {
                prop_assert!(!arg.is_empty());
                prop_assert!(!arg.contains(' '));
            }
        }
    }
}
