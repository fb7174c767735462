//! Sweeper binary that expires subscriptions past their access window and
//! removes the affected users from the gated channel.

mod worker;

use std::io;
use std::time::Duration;

use subgate_bot::TelegramChannel;
use subgate_domain::config::SweeperConfig;
use subgate_domain::services::expiry::ExpiryService;
use subgate_domain::services::telemetry::{init_telemetry, TelemetryConfig};
use subgate_storage::SeaOrmStorage;

use worker::{run_sweeper, SweeperError};

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[sweeper] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), SweeperError> {
    let config = SweeperConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("SWEEPER");
    init_telemetry(&telemetry_config)?;
    let storage = SeaOrmStorage::connect(config.database_url()).await?;
    let channel = TelegramChannel::from_config(config.bot());
    let service = ExpiryService::new(storage, channel.clone(), channel);
    run_sweeper(
        service,
        Duration::from_secs(config.sweep_interval_secs()),
    )
    .await
}
