use std::sync::Arc;

use subgate_domain::messaging::{ChannelGate, Notifier};
use subgate_domain::services::approval::ApprovalService;
use subgate_domain::services::telemetry::TelemetryGuard;
use subgate_storage::SeaOrmStorage;

/// Approval service as wired for the HTTP surface: concrete storage, with
/// the Telegram transport behind trait objects so tests can swap it out.
pub type Approvals =
    ApprovalService<SeaOrmStorage, Arc<dyn Notifier>, Arc<dyn ChannelGate>>;

#[derive(Clone)]
pub struct AppState {
    storage: SeaOrmStorage,
    approvals: Approvals,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(storage: SeaOrmStorage, approvals: Approvals, telemetry: TelemetryGuard) -> Self {
        Self {
            storage,
            approvals,
            telemetry,
        }
    }

    pub fn storage(&self) -> &SeaOrmStorage {
        &self.storage
    }

    pub fn approvals(&self) -> &Approvals {
        &self.approvals
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}
