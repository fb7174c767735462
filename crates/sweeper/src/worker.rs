use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use subgate_domain::{
    config::ConfigError,
    messaging::{ChannelGate, Notifier},
    services::{expiry::ExpiryService, telemetry::TelemetryError},
    storage::{StorageError, SubscriptionStore},
};

#[derive(Debug, Error)]
pub enum SweeperError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Runs sweep passes forever, `interval` apart. A failing pass is logged
/// and counted; the loop itself only ends with the process.
pub async fn run_sweeper<S, N, G>(
    service: ExpiryService<S, N, G>,
    interval: Duration,
) -> Result<(), SweeperError>
where
    S: SubscriptionStore,
    N: Notifier,
    G: ChannelGate,
{
    info!(interval_secs = interval.as_secs(), "expiry sweeper started");

    loop {
        match service.sweep(Utc::now()).await {
            Ok(report) => {
                counter!("sweeper_passes_total", "result" => "ok").increment(1);
                if report.expired > 0 {
                    info!(
                        expired = report.expired,
                        revoked = report.revoked,
                        notified = report.notified,
                        "sweep pass finished"
                    );
                }
            }
            Err(err) => {
                counter!("sweeper_passes_total", "result" => "error").increment(1);
                warn!(?err, "sweep pass failed");
            }
        }
        sleep(interval).await;
    }
}
