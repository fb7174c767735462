pub mod metrics;
pub mod payments;

pub use metrics::metrics_handler;
pub use payments::{
    approve_payment_handler, create_payment_handler, get_payment_handler, reject_payment_handler,
};

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use subgate_domain::model::PaymentStatus;
use subgate_domain::services::approval::ApprovalError;
use subgate_domain::storage::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payment not found")]
    NotFound,
    #[error("payment already finalized (status {current})")]
    InvalidState { current: PaymentStatus },
    #[error("{0}")]
    BadRequest(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl From<ApprovalError> for ApiError {
    fn from(value: ApprovalError) -> Self {
        match value {
            ApprovalError::NotFound(_) => ApiError::NotFound,
            ApprovalError::InvalidState { current, .. } => ApiError::InvalidState { current },
            ApprovalError::Storage(err) => ApiError::Storage(err),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidState { .. } => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            status: "error".into(),
            message: self.to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}
