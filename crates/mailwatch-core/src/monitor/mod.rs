//! Connection monitor.
//!
//! [`ConnectionMonitor`] owns one [`MailSession`] and polls one mailbox with a
//! fixed-interval search. Each tick:
//!
//! 1. runs the health check ([`ConnectionMonitor::check_state`]), which
//!    reconnects a stale session once;
//! 2. opens the query's mailbox read-only;
//! 3. runs the query's search and publishes the UIDs.
//!
//! Any failure revokes the query and publishes the error. The timer keeps
//! running, so polling resumes as soon as a new query is set.
//!
//! ```text
//!            set_query()                 tick fails
//!   Idle ───────────────────→ Polling ─────────────→ Idle
//!    ▲                           │
//!    └──── close() (terminal) ◄──┘
//! ```
//!
//! ## Concurrency
//!
//! The session sits behind an async mutex that every operation and every tick
//! holds for its whole chain, so two open/search sequences never interleave
//! on one connection. Ticks run one after another in a single task; a tick
//! that overruns the interval makes the timer skip the ticks it missed.

mod error;
mod event;
mod query;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use mailwatch_imap::{MailSession, SearchCriteria, SessionState};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub use error::{ConnectError, MonitorError, OpenError, SearchError, StateError};
pub use event::MonitorEvent;
pub use query::Query;

use crate::connectivity::Connectivity;

/// Delay between poll ticks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// How long [`ConnectionMonitor::close`] lets an in-flight tick finish before
/// aborting it.
pub const CLOSE_GRACE: Duration = Duration::from_secs(10);

/// Drives one mail session and polls one mailbox.
///
/// Every method takes `&self`; the monitor can be shared behind an [`Arc`].
/// [`monitor`](Self::monitor) spawns onto the current Tokio runtime.
pub struct ConnectionMonitor<S, C> {
    shared: Arc<Shared<S, C>>,
    poller: StdMutex<Option<Poller>>,
}

struct Shared<S, C> {
    /// `None` once the monitor is closed.
    session: Mutex<Option<S>>,
    query: StdMutex<Option<Query>>,
    connectivity: C,
    events: mpsc::UnboundedSender<MonitorEvent>,
    closed: AtomicBool,
}

/// The running timer.
struct Poller {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl<S, C> ConnectionMonitor<S, C>
where
    S: MailSession,
    C: Connectivity,
{
    /// Creates a monitor around a not-yet-connected session.
    ///
    /// Returns the receiving end of the event channel alongside the monitor.
    pub fn new(session: S, connectivity: C) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Shared {
            session: Mutex::new(Some(session)),
            query: StdMutex::new(None),
            connectivity,
            events,
            closed: AtomicBool::new(false),
        };

        let monitor = Self {
            shared: Arc::new(shared),
            poller: StdMutex::new(None),
        };
        (monitor, rx)
    }

    /// Connects and authenticates the session.
    ///
    /// Safe to call again to reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Session`] if the session fails before reaching
    /// the authenticated state, [`ConnectError::Closed`] after
    /// [`close`](Self::close).
    pub async fn init(&self) -> Result<(), ConnectError> {
        let mut slot = self.shared.session.lock().await;
        let session = slot.as_mut().ok_or(ConnectError::Closed)?;
        self.shared.connect(session).await
    }

    /// Replaces the active query. No validation happens here; a bad mailbox
    /// or criteria surfaces as a revoked query on the next tick.
    pub fn set_query(&self, query: Query) {
        debug!(mailbox = %query.mailbox, criteria = %query.criteria, "Query set");
        *lock(&self.shared.query) = Some(query);
    }

    /// Returns the active query, if any.
    #[must_use]
    pub fn query(&self) -> Option<Query> {
        lock(&self.shared.query).clone()
    }

    /// Selects `mailbox`, read-only unless `read_only` is false.
    ///
    /// Does not reconnect; run [`check_state`](Self::check_state) first.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::State`] without a live authenticated session and
    /// [`OpenError::Session`] if the server refuses the mailbox.
    pub async fn open_box(&self, mailbox: &str, read_only: bool) -> Result<(), OpenError> {
        let mut slot = self.shared.session.lock().await;
        open_box(&mut slot, mailbox, read_only).await
    }

    /// Searches the open mailbox and returns matching UIDs in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::State`] without a live authenticated session and
    /// [`SearchError::Session`] if the search is rejected.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<u32>, SearchError> {
        let mut slot = self.shared.session.lock().await;
        search(&mut slot, criteria).await
    }

    /// Health check run before every tick.
    ///
    /// Fails fast when offline or closed, passes when authenticated, and
    /// otherwise makes exactly one reconnection attempt.
    ///
    /// # Errors
    ///
    /// [`StateError::Offline`], [`StateError::NoSession`], or
    /// [`StateError::Connect`] carrying the reconnect failure.
    pub async fn check_state(&self) -> Result<(), StateError> {
        let mut slot = self.shared.session.lock().await;
        self.shared.check_state(&mut slot).await
    }

    /// Returns the session state, or `None` once closed.
    pub async fn session_state(&self) -> Option<SessionState> {
        self.shared.session.lock().await.as_ref().map(MailSession::state)
    }

    /// Starts the poll timer. The first tick fires one [`POLL_INTERVAL`]
    /// from now.
    ///
    /// No-op while already monitoring or after [`close`](Self::close).
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn monitor(&self) {
        let mut poller = lock(&self.poller);
        if self.shared.closed.load(Ordering::Acquire) {
            warn!("Monitor is closed; not starting the poll timer");
            return;
        }
        if poller.is_some() {
            debug!("Poll timer already running");
            return;
        }

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(poll_loop(Arc::clone(&self.shared), stop_rx));
        *poller = Some(Poller { stop, task });
        info!(interval = ?POLL_INTERVAL, "Monitoring started");
    }

    /// Returns true while the poll timer runs.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        lock(&self.poller).is_some()
    }

    /// Stops the poll timer and terminates the session.
    ///
    /// A tick already in flight gets [`CLOSE_GRACE`] to finish; a tick still
    /// running after that is aborted and publishes nothing. Calling `close`
    /// again does nothing.
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);

        let poller = lock(&self.poller).take();
        if let Some(Poller { stop, mut task }) = poller {
            let _ = stop.send(());
            match time::timeout(CLOSE_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Poll task ended abnormally"),
                Err(_) => {
                    warn!(grace = ?CLOSE_GRACE, "Poll tick still running; aborting it");
                    task.abort();
                    let _ = task.await;
                }
            }
        }

        let session = self.shared.session.lock().await.take();
        if let Some(mut session) = session {
            session.end().await;
            self.shared.publish(MonitorEvent::Closed { at: Utc::now() });
            info!("Monitor closed");
        }
    }
}

impl<S, C> Shared<S, C>
where
    S: MailSession,
    C: Connectivity,
{
    async fn connect(&self, session: &mut S) -> Result<(), ConnectError> {
        session.connect().await?;
        self.publish(MonitorEvent::Connected { at: Utc::now() });
        Ok(())
    }

    async fn check_state(&self, slot: &mut Option<S>) -> Result<(), StateError> {
        if !self.connectivity.is_online().await {
            return Err(StateError::Offline);
        }
        let session = slot.as_mut().ok_or(StateError::NoSession)?;
        if session.state().is_authenticated() {
            return Ok(());
        }

        info!(state = %session.state(), "Session not authenticated; reconnecting");
        self.connect(session).await?;
        Ok(())
    }

    async fn run_query(&self, slot: &mut Option<S>, query: &Query) -> Result<Vec<u32>, MonitorError> {
        self.check_state(slot).await?;
        open_box(slot, &query.mailbox, true).await?;
        Ok(search(slot, &query.criteria).await?)
    }

    async fn tick(&self) {
        let Some(query) = lock(&self.query).clone() else {
            return;
        };

        let mut slot = self.session.lock().await;
        match self.run_query(&mut slot, &query).await {
            Ok(ids) => {
                debug!(mailbox = %query.mailbox, count = ids.len(), "Poll tick matched");
                self.publish(MonitorEvent::Messages {
                    mailbox: query.mailbox,
                    ids,
                    at: Utc::now(),
                });
            }
            Err(error) => {
                warn!(mailbox = %query.mailbox, %error, "Poll tick failed; revoking query");
                self.revoke(&query);
                self.publish(MonitorEvent::QueryRevoked {
                    query,
                    error,
                    at: Utc::now(),
                });
            }
        }
    }

    /// Clears the active query unless it was replaced while the tick ran.
    fn revoke(&self, failed: &Query) {
        let mut active = lock(&self.query);
        if active.as_ref() == Some(failed) {
            *active = None;
        }
    }

    fn publish(&self, event: MonitorEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}

async fn poll_loop<S, C>(shared: Arc<Shared<S, C>>, mut stop: oneshot::Receiver<()>)
where
    S: MailSession,
    C: Connectivity,
{
    let mut ticker = time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            // Also fires when the monitor is dropped without close().
            _ = &mut stop => break,
            _ = ticker.tick() => shared.tick().await,
        }
    }
    debug!("Poll loop stopped");
}

/// Returns the session if it may carry mailbox commands.
fn authenticated<S: MailSession>(slot: &mut Option<S>) -> Result<&mut S, StateError> {
    let session = slot.as_mut().ok_or(StateError::NoSession)?;
    if session.state().is_authenticated() {
        Ok(session)
    } else {
        Err(StateError::NotAuthenticated)
    }
}

async fn open_box<S: MailSession>(
    slot: &mut Option<S>,
    mailbox: &str,
    read_only: bool,
) -> Result<(), OpenError> {
    let session = authenticated(slot)?;
    session
        .open_mailbox(mailbox, read_only)
        .await
        .map_err(|source| OpenError::Session {
            mailbox: mailbox.to_string(),
            source,
        })
}

async fn search<S: MailSession>(
    slot: &mut Option<S>,
    criteria: &SearchCriteria,
) -> Result<Vec<u32>, SearchError> {
    let session = authenticated(slot)?;
    Ok(session.search(criteria).await?)
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S, C> std::fmt::Debug for ConnectionMonitor<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("query", &*lock(&self.shared.query))
            .field("monitoring", &lock(&self.poller).is_some())
            .field("closed", &self.shared.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}
