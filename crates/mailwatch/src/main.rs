//! `mailwatch` - polls one IMAP mailbox and logs what matches.
//!
//! Usage: `mailwatch [CONFIG_PATH]`. Without an argument the configuration is
//! read from the platform config directory (`mailwatch/config.json`). Runs
//! until Ctrl-C.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, bail};
use mailwatch_core::{ConnectionMonitor, MonitorEvent, ResolverProbe, WatchConfig};
use mailwatch_imap::ImapSession;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailwatch=info,mailwatch_core=info,mailwatch_imap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => WatchConfig::default_path()?,
    };
    let config = WatchConfig::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    let Some(query) = config.query.clone() else {
        bail!("no query configured in {}", path.display());
    };

    info!(host = %config.account.host, mailbox = %query.mailbox, "Starting mailwatch");

    let session = ImapSession::new(config.account.session_config());
    let probe = ResolverProbe::new(config.account.host.trim(), config.account.effective_port());
    let (monitor, events) = ConnectionMonitor::new(session, probe);

    monitor.init().await.context("initial login failed")?;
    monitor.set_query(query);
    monitor.monitor();

    tokio::select! {
        () = log_events(events) => warn!("Event channel closed"),
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("Interrupted; shutting down");
        }
    }

    monitor.close().await;
    Ok(())
}

async fn log_events(mut events: UnboundedReceiver<MonitorEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            MonitorEvent::Connected { at } => info!(%at, "Session ready"),
            MonitorEvent::Messages { mailbox, ids, at } => {
                info!(%mailbox, count = ids.len(), ?ids, %at, "Matching messages");
            }
            MonitorEvent::QueryRevoked { query, error, at } => {
                error!(
                    mailbox = %query.mailbox,
                    criteria = %query.criteria,
                    %error,
                    %at,
                    "Query revoked; polling is idle"
                );
            }
            MonitorEvent::Closed { at } => info!(%at, "Session closed"),
        }
    }
}
