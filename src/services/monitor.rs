//! Background health check task
//!
//! Every `monitoring.interval_seconds` the monitor runs a health check for
//! each store owning terminals. A failing store is logged and skipped; the
//! remaining stores are still checked.

use std::sync::Arc;

use tokio::sync::watch;

use super::health::HealthService;
use crate::repository::TerminalRepository;

pub struct HealthMonitor {
    repository: Arc<dyn TerminalRepository>,
    health: HealthService,
}

impl HealthMonitor {
    pub fn new(repository: Arc<dyn TerminalRepository>, health: HealthService) -> Self {
        Self { repository, health }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.health.monitoring().interval();
        tracing::info!(
            "Terminal health monitor started (interval {:?}, heartbeat timeout {}s)",
            interval,
            self.health.monitoring().heartbeat_timeout_seconds
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Terminal health monitor stopping");
                        break;
                    }
                }
            }
        }
    }

    /// One pass over all stores; returns the number of stores checked successfully
    pub async fn tick(&self) -> usize {
        let store_ids = match self.repository.store_ids_with_terminals().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("Health monitor could not list stores: {}", e);
                return 0;
            }
        };

        let mut checked = 0;
        for store_id in store_ids {
            match self.health.run_health_check_now(store_id).await {
                Ok(run) => {
                    checked += 1;
                    tracing::debug!(
                        "Store {}: {} terminals evaluated",
                        store_id,
                        run.terminals_evaluated
                    );
                }
                Err(e) => tracing::error!("Health check failed for store {}: {}", store_id, e),
            }
        }
        checked
    }
}
