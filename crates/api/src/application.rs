use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Duration;
use thiserror::Error;

use subgate_bot::TelegramChannel;
use subgate_domain::config::{ApiConfig, ConfigError};
use subgate_domain::messaging::{ChannelGate, Notifier};
use subgate_domain::services::approval::ApprovalService;
use subgate_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use subgate_storage::SeaOrmStorage;

use crate::{
    handlers::{
        approve_payment_handler, create_payment_handler, get_payment_handler, metrics_handler,
        reject_payment_handler,
    },
    state::AppState,
};

pub async fn run() -> Result<(), BootstrapError> {
    let config = ApiConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("API");
    let telemetry = init_telemetry(&telemetry_config)?;

    let storage = SeaOrmStorage::connect(config.database_url()).await?;

    let channel = TelegramChannel::from_config(config.bot());
    let notifier: Arc<dyn Notifier> = Arc::new(channel.clone());
    let gate: Arc<dyn ChannelGate> = Arc::new(channel);
    let approvals = ApprovalService::new(
        storage.clone(),
        notifier,
        gate,
        Duration::seconds(config.bot().invite_ttl_secs()),
    );

    let state = AppState::new(storage, approvals, telemetry);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .route("/api/v1/payments", web::post().to(create_payment_handler))
            .route("/api/v1/payments/{id}", web::get().to(get_payment_handler))
            .route(
                "/api/v1/payments/{id}/approve",
                web::patch().to(approve_payment_handler),
            )
            .route(
                "/api/v1/payments/{id}/reject",
                web::patch().to(reject_payment_handler),
            )
            .route("/metrics", web::get().to(metrics_handler))
    })
    .bind(config.api_bind_address())?
    .run()
    .await?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] subgate_domain::storage::StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
