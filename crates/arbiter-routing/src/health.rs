//! Background health monitor sweeping every registered provider.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior, timeout};
use tracing::{debug, warn};

use arbiter_core::HealthConfig;

use crate::descriptor::{ProviderClient, ProviderStatus};
use crate::registry::ProviderRegistry;

/// Periodic prober keeping registry statuses current.
///
/// The monitor only ever writes `Healthy` or `Degraded`; `Unavailable` is
/// reserved for the call-failure streak, so a probe can always bring a
/// provider back into rotation.
pub struct HealthMonitor {
    registry: Arc<ProviderRegistry>,
    interval: Duration,
    probe_timeout: Duration,
}

impl HealthMonitor {
    /// Creates a monitor over the given registry using the configured
    /// sweep interval and probe timeout.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, health: &HealthConfig) -> Self {
        Self {
            registry,
            interval: health.check_interval(),
            probe_timeout: health.probe_timeout(),
        }
    }

    /// Overrides the sweep interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Overrides the per-probe timeout.
    #[must_use]
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Starts the background sweep loop, returning its task handle.
    ///
    /// The first sweep runs immediately; abort the handle to stop the loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }

    /// Probes every provider once and records the outcomes.
    ///
    /// Probes run concurrently, each capped by the probe timeout. A probe
    /// that answers marks the provider `Healthy`; a failed or timed-out
    /// probe marks it `Degraded`.
    pub async fn sweep(&self) {
        let targets = self.registry.probe_targets();
        if targets.is_empty() {
            debug!("health sweep skipped: no providers registered");
            return;
        }

        let probes = targets
            .iter()
            .map(|(id, client)| self.probe_one(id, client));
        let outcomes = join_all(probes).await;

        for (id, status) in outcomes {
            if let Err(error) = self.registry.record_probe(&id, status) {
                warn!(id = %id, %error, "provider disappeared during health sweep");
            }
        }
    }

    /// Runs one probe under the timeout and maps it to a status.
    async fn probe_one(&self, id: &str, client: &ProviderClient) -> (String, ProviderStatus) {
        match timeout(self.probe_timeout, client.probe()).await {
            Ok(Ok(())) => {
                debug!(id, "probe succeeded");
                (id.to_owned(), ProviderStatus::Healthy)
            }
            Ok(Err(error)) => {
                warn!(id, %error, "probe failed");
                (id.to_owned(), ProviderStatus::Degraded)
            }
            Err(_elapsed) => {
                warn!(
                    id,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "probe timed out"
                );
                (id.to_owned(), ProviderStatus::Degraded)
            }
        }
    }
}
