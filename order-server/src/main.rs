use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use order_server::{
    BackgroundTasks, Config, ExpirySweeper, OrderStorage, OrdersManager, Services, TaskKind,
    setup_environment,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, work dir, logging)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    setup_environment(&config).context("failed to prepare work directory")?;

    tracing::info!(work_dir = %config.work_dir, "Order server starting...");
    if config.payment_key_secret.is_empty() {
        tracing::warn!("PAYMENT_KEY_SECRET is not set, online payments cannot be verified");
    }

    // 2. Storage and manager
    let db_path = config.db_path();
    let storage = OrderStorage::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    let services = Services::local(
        &config.payment_key_secret,
        &config.currency,
        &config.image_base_url,
    );
    let manager = Arc::new(OrdersManager::new(storage, &config, services));

    // 3. Background tasks
    let mut tasks = BackgroundTasks::new();
    let sweeper = ExpirySweeper::new(
        manager.clone(),
        Duration::from_secs(config.expiry_sweep_interval_secs),
        tasks.shutdown_token(),
    );
    tasks.spawn("expiry_sweeper", TaskKind::Periodic, sweeper.run());
    tasks.log_summary();

    // 4. Run until Ctrl-C, reporting jobs that died
    let mut health = tokio::time::interval(Duration::from_secs(60));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("failed to listen for shutdown signal")?;
                break;
            }
            _ = health.tick() => {
                for name in tasks.finished() {
                    tracing::error!(task = name, "Background task is no longer running");
                }
            }
        }
    }
    tracing::info!("Shutdown signal received");
    tasks.shutdown().await;

    Ok(())
}
