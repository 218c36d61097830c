//! Integration tests for the connection monitor.
//!
//! These tests drive the monitor with a scripted in-memory session and a
//! switchable connectivity probe, on a paused Tokio clock.

#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

use mailwatch_core::{
    CLOSE_GRACE, ConnectError, ConnectionMonitor, Connectivity, MonitorError, MonitorEvent, OpenError,
    POLL_INTERVAL, Query, SearchError, StateError,
};
use mailwatch_imap::{Error, MailSession, Result, SearchCriteria, SessionState};

/// Session command as observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Connect,
    Open(String, bool),
    Search(SearchCriteria),
    End,
}

/// Shared behaviour of the mock session, adjustable while the monitor runs.
#[derive(Debug, Default)]
struct Script {
    calls: Vec<Call>,
    state: SessionState,
    fail_connect: bool,
    fail_open: bool,
    open_delay: Option<Duration>,
    search_delay: Option<Duration>,
    ids: Vec<u32>,
}

#[derive(Clone, Default)]
struct Handle(Arc<Mutex<Script>>);

impl Handle {
    fn with<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        f(&mut self.0.lock().unwrap())
    }

    fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.with(|s| s.calls.iter().filter(|c| pred(c)).count())
    }
}

struct MockSession(Handle);

impl MailSession for MockSession {
    async fn connect(&mut self) -> Result<()> {
        self.0.with(|s| {
            s.calls.push(Call::Connect);
            if s.fail_connect {
                s.state = SessionState::Error;
                Err(Error::Auth("invalid credentials".into()))
            } else {
                s.state = SessionState::Authenticated;
                Ok(())
            }
        })
    }

    async fn open_mailbox(&mut self, mailbox: &str, read_only: bool) -> Result<()> {
        let delay = self.0.with(|s| {
            s.calls.push(Call::Open(mailbox.to_string(), read_only));
            s.open_delay
        });
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        self.0.with(|s| {
            if s.fail_open {
                Err(Error::No("Mailbox doesn't exist".into()))
            } else {
                Ok(())
            }
        })
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        let delay = self.0.with(|s| {
            s.calls.push(Call::Search(criteria.clone()));
            s.search_delay
        });
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        Ok(self.0.with(|s| s.ids.clone()))
    }

    fn state(&self) -> SessionState {
        self.0.with(|s| s.state)
    }

    async fn end(&mut self) {
        self.0.with(|s| {
            s.calls.push(Call::End);
            s.state = SessionState::Disconnected;
        });
    }
}

#[derive(Clone)]
struct Probe(Arc<AtomicBool>);

impl Probe {
    fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for Probe {
    fn is_online(&self) -> impl Future<Output = bool> + Send {
        std::future::ready(self.0.load(Ordering::SeqCst))
    }
}

type Monitor = ConnectionMonitor<MockSession, Probe>;

fn harness() -> (Monitor, UnboundedReceiver<MonitorEvent>, Handle, Probe) {
    let handle = Handle::default();
    let probe = Probe(Arc::new(AtomicBool::new(true)));
    let (monitor, events) = ConnectionMonitor::new(MockSession(handle.clone()), probe.clone());
    (monitor, events, handle, probe)
}

/// Builds a monitor whose session is already authenticated.
async fn connected() -> (Monitor, UnboundedReceiver<MonitorEvent>, Handle, Probe) {
    let (monitor, mut events, handle, probe) = harness();
    assert_ok!(monitor.init().await);
    assert!(matches!(events.recv().await, Some(MonitorEvent::Connected { .. })));
    (monitor, events, handle, probe)
}

#[tokio::test(start_paused = true)]
async fn tick_opens_read_only_then_searches() {
    let (monitor, mut events, handle, _) = connected().await;
    handle.with(|s| s.ids = vec![4, 7]);

    monitor.set_query(Query::new("INBOX", SearchCriteria::Unseen));
    monitor.monitor();

    match events.recv().await.unwrap() {
        MonitorEvent::Messages { mailbox, ids, .. } => {
            assert_eq!(mailbox, "INBOX");
            assert_eq!(ids, vec![4, 7]);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    monitor.close().await;
    assert_eq!(
        handle.calls(),
        vec![
            Call::Connect,
            Call::Open("INBOX".into(), true),
            Call::Search(SearchCriteria::Unseen),
            Call::End,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_one_interval() {
    let (monitor, _events, handle, _) = connected().await;
    monitor.set_query(Query::unseen("INBOX"));
    monitor.monitor();

    sleep(POLL_INTERVAL - Duration::from_millis(1)).await;
    assert_eq!(handle.count(|c| matches!(c, Call::Search(_))), 0);

    sleep(Duration::from_millis(2)).await;
    assert_eq!(handle.count(|c| matches!(c, Call::Search(_))), 1);

    sleep(POLL_INTERVAL).await;
    assert_eq!(handle.count(|c| matches!(c, Call::Search(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn idle_ticks_do_nothing() {
    let (monitor, mut events, handle, _) = connected().await;
    monitor.monitor();

    sleep(POLL_INTERVAL * 3).await;
    assert_eq!(handle.calls(), vec![Call::Connect]);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn open_failure_revokes_query() {
    let (monitor, mut events, handle, _) = connected().await;
    handle.with(|s| s.fail_open = true);

    monitor.set_query(Query::unseen("Nope"));
    monitor.monitor();

    match events.recv().await.unwrap() {
        MonitorEvent::QueryRevoked { query, error, .. } => {
            assert_eq!(query, Query::unseen("Nope"));
            assert!(
                matches!(error, MonitorError::Open(OpenError::Session { ref mailbox, .. }) if mailbox == "Nope"),
                "{error:?}"
            );
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(monitor.query(), None);

    // The loop survives but has nothing to do.
    sleep(POLL_INTERVAL * 3).await;
    assert!(monitor.is_monitoring());
    assert_eq!(
        handle.calls(),
        vec![Call::Connect, Call::Open("Nope".into(), true)]
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn new_query_resumes_polling_after_revocation() {
    let (monitor, mut events, handle, _) = connected().await;
    handle.with(|s| s.fail_open = true);
    monitor.set_query(Query::unseen("Nope"));
    monitor.monitor();
    assert!(matches!(events.recv().await, Some(MonitorEvent::QueryRevoked { .. })));

    handle.with(|s| s.fail_open = false);
    monitor.set_query(Query::new("Archive", SearchCriteria::All));
    assert!(matches!(
        events.recv().await,
        Some(MonitorEvent::Messages { ref mailbox, .. }) if mailbox == "Archive"
    ));
}

#[tokio::test(start_paused = true)]
async fn offline_tick_skips_session() {
    let (monitor, mut events, handle, probe) = connected().await;
    probe.set_online(false);

    monitor.set_query(Query::unseen("INBOX"));
    monitor.monitor();

    match events.recv().await.unwrap() {
        MonitorEvent::QueryRevoked { error, .. } => {
            assert!(matches!(error, MonitorError::State(StateError::Offline)), "{error:?}");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(monitor.query(), None);
    assert_eq!(handle.calls(), vec![Call::Connect]);
}

#[tokio::test(start_paused = true)]
async fn close_mid_interval_stops_timer() {
    let (monitor, mut events, handle, _) = connected().await;
    monitor.set_query(Query::unseen("INBOX"));
    monitor.monitor();

    sleep(POLL_INTERVAL / 2).await;
    monitor.close().await;
    assert!(!monitor.is_monitoring());

    sleep(POLL_INTERVAL * 4).await;
    assert_eq!(handle.calls(), vec![Call::Connect, Call::End]);
    assert!(matches!(events.recv().await, Some(MonitorEvent::Closed { .. })));
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn close_is_idempotent() {
    let (monitor, mut events, handle, _) = connected().await;
    monitor.monitor();

    monitor.close().await;
    monitor.close().await;

    assert!(!monitor.is_monitoring());
    assert_eq!(handle.count(|c| *c == Call::End), 1);
    assert!(matches!(events.recv().await, Some(MonitorEvent::Closed { .. })));
    assert!(events.try_recv().is_err());
    assert_eq!(monitor.session_state().await, None);
}

#[tokio::test(start_paused = true)]
async fn close_waits_for_in_flight_tick() {
    let (monitor, mut events, handle, _) = connected().await;
    handle.with(|s| s.search_delay = Some(Duration::from_secs(2)));
    monitor.set_query(Query::unseen("INBOX"));
    monitor.monitor();

    // The search started at one interval and is still running.
    sleep(POLL_INTERVAL + Duration::from_secs(1)).await;
    monitor.close().await;

    assert_eq!(handle.calls().last(), Some(&Call::End));
    assert_eq!(handle.count(|c| matches!(c, Call::Search(_))), 1);
    assert!(matches!(events.recv().await, Some(MonitorEvent::Messages { .. })));
    assert!(matches!(events.recv().await, Some(MonitorEvent::Closed { .. })));
}

#[tokio::test(start_paused = true)]
async fn close_aborts_hung_tick_after_grace() {
    let (monitor, mut events, handle, _) = connected().await;
    handle.with(|s| s.search_delay = Some(Duration::from_secs(3600)));
    monitor.set_query(Query::unseen("INBOX"));
    monitor.monitor();

    sleep(POLL_INTERVAL + Duration::from_secs(1)).await;
    let started = tokio::time::Instant::now();
    monitor.close().await;

    assert!(started.elapsed() >= CLOSE_GRACE);
    assert!(started.elapsed() < Duration::from_secs(3600));
    assert_eq!(handle.calls().last(), Some(&Call::End));
    assert!(matches!(events.recv().await, Some(MonitorEvent::Closed { .. })));
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn slow_tick_never_overlaps() {
    let (monitor, _events, handle, _) = connected().await;
    handle.with(|s| s.search_delay = Some(POLL_INTERVAL * 2 + Duration::from_secs(2)));
    monitor.set_query(Query::unseen("INBOX"));
    monitor.monitor();

    // First search runs from 1x to 3.4x the interval.
    sleep(POLL_INTERVAL * 3).await;
    assert_eq!(handle.count(|c| matches!(c, Call::Open(..))), 1);
    assert_eq!(handle.count(|c| matches!(c, Call::Search(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn replaced_query_survives_failed_tick() {
    let (monitor, mut events, handle, _) = connected().await;
    handle.with(|s| {
        s.fail_open = true;
        s.open_delay = Some(Duration::from_secs(1));
    });
    monitor.set_query(Query::unseen("Old"));
    monitor.monitor();

    // Replace the query while the failing tick is inside open_mailbox.
    sleep(POLL_INTERVAL + Duration::from_millis(500)).await;
    monitor.set_query(Query::unseen("New"));

    match events.recv().await.unwrap() {
        MonitorEvent::QueryRevoked { query, .. } => assert_eq!(query, Query::unseen("Old")),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(monitor.query(), Some(Query::unseen("New")));
}

#[tokio::test(start_paused = true)]
async fn monitor_twice_is_noop() {
    let (monitor, _events, handle, _) = connected().await;
    monitor.set_query(Query::unseen("INBOX"));
    monitor.monitor();
    monitor.monitor();
    assert!(monitor.is_monitoring());

    sleep(POLL_INTERVAL + Duration::from_millis(1)).await;
    assert_eq!(handle.count(|c| matches!(c, Call::Search(_))), 1);
}

#[tokio::test]
async fn stale_session_reconnects_once() {
    let (monitor, mut events, handle, _) = connected().await;
    handle.with(|s| s.state = SessionState::Disconnected);

    assert_ok!(monitor.check_state().await);
    assert_eq!(handle.count(|c| *c == Call::Connect), 2);
    assert!(matches!(events.recv().await, Some(MonitorEvent::Connected { .. })));

    // Healthy sessions are left alone.
    assert_ok!(monitor.check_state().await);
    assert_eq!(handle.count(|c| *c == Call::Connect), 2);
}

#[tokio::test]
async fn failed_reconnect_surfaces_connect_error() {
    let (monitor, _events, handle, _) = connected().await;
    handle.with(|s| {
        s.state = SessionState::Disconnected;
        s.fail_connect = true;
    });

    let err = assert_err!(monitor.check_state().await);
    assert!(
        matches!(err, StateError::Connect(ConnectError::Session(Error::Auth(_)))),
        "{err:?}"
    );
    assert_eq!(handle.count(|c| *c == Call::Connect), 2);
    assert_eq!(monitor.session_state().await, Some(SessionState::Error));
}

#[tokio::test]
async fn init_failure_is_reported() {
    let (monitor, mut events, handle, _) = harness();
    handle.with(|s| s.fail_connect = true);

    let err = assert_err!(monitor.init().await);
    assert!(matches!(err, ConnectError::Session(Error::Auth(_))));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn offline_check_does_not_reconnect() {
    let (monitor, _events, handle, probe) = harness();
    probe.set_online(false);

    let err = assert_err!(monitor.check_state().await);
    assert!(matches!(err, StateError::Offline));
    assert!(handle.calls().is_empty());
}

#[tokio::test]
async fn direct_calls_require_authentication() {
    let (monitor, _events, handle, _) = harness();

    let err = assert_err!(monitor.open_box("INBOX", true).await);
    assert!(matches!(err, OpenError::State(StateError::NotAuthenticated)));
    let err = assert_err!(monitor.search(&SearchCriteria::All).await);
    assert!(matches!(err, SearchError::State(StateError::NotAuthenticated)));
    assert!(handle.calls().is_empty());
}

#[tokio::test]
async fn direct_calls_pass_through() {
    let (monitor, _events, handle, _) = connected().await;
    handle.with(|s| s.ids = vec![1, 2, 3]);

    assert_ok!(monitor.open_box("Drafts", false).await);
    let ids = assert_ok!(monitor.search(&SearchCriteria::Draft).await);
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(
        handle.calls()[1..],
        [
            Call::Open("Drafts".into(), false),
            Call::Search(SearchCriteria::Draft)
        ]
    );
}

#[tokio::test]
async fn closed_monitor_has_no_session() {
    let (monitor, _events, handle, _) = connected().await;
    monitor.close().await;

    let err = assert_err!(monitor.check_state().await);
    assert!(matches!(err, StateError::NoSession));
    let err = assert_err!(monitor.open_box("INBOX", true).await);
    assert!(matches!(err, OpenError::State(StateError::NoSession)));
    let err = assert_err!(monitor.search(&SearchCriteria::All).await);
    assert!(matches!(err, SearchError::State(StateError::NoSession)));
    let err = assert_err!(monitor.init().await);
    assert!(matches!(err, ConnectError::Closed));

    monitor.monitor();
    assert!(!monitor.is_monitoring());
    assert_eq!(handle.calls(), vec![Call::Connect, Call::End]);
}
