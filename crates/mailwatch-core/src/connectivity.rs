//! Network connectivity detection.
//!
//! The health check consults a [`Connectivity`] probe before touching the
//! session, so an unplugged machine fails fast with
//! [`StateError::Offline`](crate::StateError::Offline) instead of waiting out
//! a connect timeout.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Reports whether the network looks usable.
pub trait Connectivity: Send + Sync + 'static {
    /// Returns false when no connectivity is detectable.
    fn is_online(&self) -> impl Future<Output = bool> + Send;
}

/// Probe that never reports offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> impl Future<Output = bool> + Send {
        std::future::ready(true)
    }
}

/// Default bound on a single resolver lookup.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Probe that resolves the mail server's address.
///
/// Online means the host resolved to at least one socket address within the
/// timeout. IP literals resolve without touching the network.
#[derive(Debug, Clone)]
pub struct ResolverProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ResolverProbe {
    /// Creates a probe for `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Sets the lookup timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Connectivity for ResolverProbe {
    async fn is_online(&self) -> bool {
        let lookup = tokio::net::lookup_host((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(e)) => {
                debug!(host = %self.host, error = %e, "Address lookup failed");
                false
            }
            Err(_) => {
                debug!(host = %self.host, timeout = ?self.timeout, "Address lookup timed out");
                false
            }
        }
    }
}
