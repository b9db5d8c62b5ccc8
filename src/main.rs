use anyhow::Result;
use tokio::signal;
use tracing::info;

mod alert;
mod config;
mod content;
mod engine;
mod models;
mod probe;
mod report;
mod tls;

use crate::config::MonitorConfig;
use crate::engine::Monitor;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = MonitorConfig::load("config.json")?;
    info!(
        "Loaded {} monitoring targets (interval: {}s)",
        config.targets.len(),
        config.global_settings.monitor_interval_seconds
    );

    // Under a CI scheduler each run covers one cycle; the scheduler triggers
    // the next one.
    let run_once = std::env::var("GITHUB_ACTIONS").is_ok_and(|value| value == "true");
    let monitor = Monitor::new(config)?;

    if run_once {
        info!("CI environment detected; running a single check cycle");
        monitor.run_cycle().await;
        return Ok(());
    }

    tokio::select! {
        result = monitor.run() => result,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received; stopping monitor");
            Ok(())
        }
    }
}
