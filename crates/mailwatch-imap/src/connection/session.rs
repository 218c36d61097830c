//! IMAP-backed [`MailSession`].
//!
//! Wraps an `async-imap` session over an [`ImapStream`]. The session tracks
//! its own [`SessionState`]: any command that fails because the connection
//! went away drops the client and reports `Disconnected`, so the caller's
//! next health check reconnects instead of reusing a dead socket.
//!
//! ## Example
//!
//! ```ignore
//! use mailwatch_imap::{ImapSession, MailSession, SearchCriteria, SessionConfig};
//!
//! let config = SessionConfig::new("imap.example.com")
//!     .credentials("user@example.com", "password");
//!
//! let mut session = ImapSession::new(config);
//! session.connect().await?;
//! session.open_mailbox("INBOX", true).await?;
//! let uids = session.search(&SearchCriteria::Unseen).await?;
//! session.end().await;
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::{Security, SessionConfig};
use super::stream::{ImapStream, connect_plain, connect_tls};
use crate::search::SearchCriteria;
use crate::session::{MailSession, SessionState};
use crate::{Error, Result};

type Client = async_imap::Client<ImapStream>;
type Inner = async_imap::Session<ImapStream>;

/// IMAP session with tracked connection state.
pub struct ImapSession {
    config: SessionConfig,
    inner: Option<Inner>,
    state: SessionState,
    /// Mailbox currently selected on `inner`.
    selected: Option<String>,
}

impl ImapSession {
    /// Creates a disconnected session; call [`MailSession::connect`] to log in.
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self {
            config,
            inner: None,
            state: SessionState::Disconnected,
            selected: None,
        }
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the currently selected mailbox, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Returns the live client or an error naming the current state.
    fn live(&mut self) -> Result<&mut Inner> {
        let state = self.state;
        self.inner
            .as_mut()
            .ok_or_else(|| Error::InvalidState(format!("session is {state}")))
    }

    /// Passes `result` through, dropping the client first if the error shows
    /// the connection is gone.
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && e.is_connection_error()
        {
            warn!(error = %e, host = %self.config.host, "IMAP connection lost");
            self.inner = None;
            self.selected = None;
            self.state = SessionState::Disconnected;
        }
        result
    }
}

impl MailSession for ImapSession {
    async fn connect(&mut self) -> Result<()> {
        if let Some(stale) = self.inner.take() {
            logout(stale, self.config.auth_timeout).await;
        }
        self.selected = None;
        self.state = SessionState::Connecting;

        info!(
            host = %self.config.host,
            port = self.config.port,
            security = ?self.config.security,
            "Connecting to IMAP server"
        );

        let config = &self.config;
        let result = async {
            let client = bounded(config.connect_timeout, open_client(config)).await?;
            bounded(config.auth_timeout, login(config, client)).await
        }
        .await;

        match result {
            Ok(inner) => {
                info!(host = %self.config.host, user = %self.config.username, "IMAP session authenticated");
                self.inner = Some(inner);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, host = %self.config.host, "IMAP connect failed");
                self.state = SessionState::Error;
                Err(e)
            }
        }
    }

    async fn open_mailbox(&mut self, mailbox: &str, read_only: bool) -> Result<()> {
        self.selected = None;
        let inner = self.live()?;
        let result = if read_only {
            inner.examine(mailbox).await
        } else {
            inner.select(mailbox).await
        };
        let status = self.track(result.map_err(Error::from))?;

        debug!(mailbox, read_only, exists = status.exists, "Mailbox opened");
        self.selected = Some(mailbox.to_string());
        Ok(())
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        if self.selected.is_none() {
            return Err(Error::InvalidState("no mailbox selected".into()));
        }

        let key = criteria.to_search_key();
        let inner = self.live()?;
        let result = inner.uid_search(&key).await;
        let uids = self.track(result.map_err(Error::from))?;

        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();
        debug!(criteria = %key, count = uids.len(), "Search completed");
        Ok(uids)
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn end(&mut self) {
        if let Some(inner) = self.inner.take() {
            logout(inner, self.config.auth_timeout).await;
            info!(host = %self.config.host, "IMAP session closed");
        }
        self.selected = None;
        self.state = SessionState::Disconnected;
    }
}

impl std::fmt::Debug for ImapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapSession")
            .field("host", &self.config.host)
            .field("state", &self.state)
            .field("selected_mailbox", &self.selected)
            .finish_non_exhaustive()
    }
}

async fn open_stream(config: &SessionConfig) -> Result<ImapStream> {
    let SessionConfig {
        host,
        port,
        security,
        danger_accept_invalid_certs,
        ..
    } = config;

    match security {
        Security::Implicit => {
            if *danger_accept_invalid_certs {
                warn!(%host, "TLS certificate validation is disabled");
            }
            connect_tls(host, *port, *danger_accept_invalid_certs).await
        }
        Security::None => connect_plain(host, *port).await,
        Security::StartTls => Err(Error::UnsupportedSecurity(
            "STARTTLS; use implicit TLS or plaintext".into(),
        )),
    }
}

/// Opens the transport and consumes the server greeting.
async fn open_client(config: &SessionConfig) -> Result<Client> {
    let stream = open_stream(config).await?;
    let mut client = async_imap::Client::new(stream);

    match client.read_response().await {
        Some(Ok(_)) => Ok(client),
        Some(Err(e)) => Err(e.into()),
        None => Err(Error::ConnectionLost("missing IMAP greeting".into())),
    }
}

async fn login(config: &SessionConfig, client: Client) -> Result<Inner> {
    client
        .login(&config.username, &config.password)
        .await
        .map_err(|(err, _client)| match Error::from(err) {
            Error::No(text) | Error::Bad(text) => Error::Auth(text),
            other => other,
        })
}

/// Sends LOGOUT, giving up after `limit`. The connection is dropped either way.
async fn logout(mut inner: Inner, limit: Duration) {
    match tokio::time::timeout(limit, inner.logout()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "LOGOUT failed; dropping connection"),
        Err(_) => debug!(timeout = ?limit, "LOGOUT unanswered; dropping connection"),
    }
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(limit))?
}
