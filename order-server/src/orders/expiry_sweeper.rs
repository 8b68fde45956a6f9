//! Expiry sweeper
//!
//! Cancels online orders whose payment was never captured. Registered as
//! `TaskKind::Periodic` and stopped through the shared shutdown token.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::manager::OrdersManager;

pub struct ExpirySweeper {
    manager: Arc<OrdersManager>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ExpirySweeper {
    pub fn new(manager: Arc<OrdersManager>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    /// Main loop: sweep on every tick until shutdown
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Expiry sweeper started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Expiry sweeper received shutdown signal");
                    break;
                }
            }
            self.sweep_once().await;
        }

        tracing::info!("Expiry sweeper stopped");
    }

    /// One pass over the unpaid online orders; returns how many expired
    pub async fn sweep_once(&self) -> usize {
        let manager = self.manager.clone();
        let now = shared::util::now_millis();
        // redb writes block, keep them off the async workers
        match tokio::task::spawn_blocking(move || manager.expire_initialized_orders(now)).await {
            Ok(Ok(expired)) => expired,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Expiry sweep failed");
                0
            }
            Err(e) => {
                tracing::error!(error = ?e, "Expiry sweep task panicked");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use crate::pricing::PricingConfig;
    use crate::services::Services;

    fn manager() -> Arc<OrdersManager> {
        let storage = OrderStorage::open_in_memory().unwrap();
        let services = Services::local("secret", "INR", "https://cdn.test");
        Arc::new(OrdersManager::with_settings(
            storage,
            PricingConfig::default(),
            services,
        ))
    }

    #[tokio::test]
    async fn test_sweep_with_nothing_pending() {
        let sweeper = ExpirySweeper::new(manager(), Duration::from_secs(60), CancellationToken::new());
        assert_eq!(sweeper.sweep_once().await, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let token = CancellationToken::new();
        let sweeper = ExpirySweeper::new(manager(), Duration::from_millis(10), token.clone());
        let handle = tokio::spawn(sweeper.run());

        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
