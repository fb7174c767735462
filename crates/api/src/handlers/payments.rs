use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use subgate_domain::model::{
    ApprovalOutcome, NewPayment, NewSubscription, PaymentMethod, PaymentRecord, PaymentStatus,
    SubscriptionRecord, SubscriptionStatus,
};
use subgate_domain::services::approval::ApprovalError;
use subgate_domain::storage::{PaymentStore, PlanStore, SubscriptionStore, UserStore};

use crate::state::AppState;

use super::ApiError;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePaymentRequest {
    pub user_id: i64,
    pub plan_id: i64,
    pub method: PaymentMethod,
    /// Defaults to the plan price when omitted.
    pub amount: Option<Decimal>,
    pub screenshot: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentBody {
    pub id: i64,
    pub user_id: i64,
    pub plan_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentBody {
    fn from(payment: PaymentRecord) -> Self {
        Self {
            id: payment.id,
            user_id: payment.user_id,
            plan_id: payment.plan_id,
            amount: payment.amount,
            method: payment.method,
            status: payment.status,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionBody {
    pub id: i64,
    pub user_id: i64,
    pub plan_id: i64,
    pub status: SubscriptionStatus,
    pub is_active: bool,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl From<SubscriptionRecord> for SubscriptionBody {
    fn from(subscription: SubscriptionRecord) -> Self {
        Self {
            id: subscription.id,
            user_id: subscription.user_id,
            plan_id: subscription.plan_id,
            status: subscription.status,
            is_active: subscription.is_active,
            start_at: subscription.start_at,
            end_at: subscription.end_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalBody {
    pub status: String,
    pub payment: PaymentBody,
    pub subscription: SubscriptionBody,
}

impl From<ApprovalOutcome> for ApprovalBody {
    fn from(outcome: ApprovalOutcome) -> Self {
        Self {
            status: "approved".into(),
            payment: outcome.payment.into(),
            subscription: outcome.subscription.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectionBody {
    pub status: String,
    pub payment: PaymentBody,
}

pub async fn create_payment_handler(
    state: web::Data<AppState>,
    payload: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    let user = state
        .storage()
        .find_user(payload.user_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("unknown user {}", payload.user_id)))?;
    let plan = state
        .storage()
        .find_plan(payload.plan_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("unknown plan {}", payload.plan_id)))?;

    let amount = payload.amount.unwrap_or(plan.price);
    if amount <= Decimal::ZERO {
        counter!("api_payment_requests_total", "endpoint" => "create", "status" => "invalid_amount")
            .increment(1);
        return Err(ApiError::BadRequest("amount must be positive".into()));
    }

    let payment = state
        .storage()
        .insert_payment(NewPayment {
            user_id: user.id,
            plan_id: plan.id,
            amount,
            method: payload.method,
            screenshot: payload.screenshot,
        })
        .await?;

    // Record the intent alongside the payment; the row activated on
    // approval is inserted by the transition itself.
    let now = Utc::now();
    state
        .storage()
        .insert_subscription(NewSubscription {
            user_id: user.id,
            plan_id: plan.id,
            status: SubscriptionStatus::Pending,
            start_at: now,
            end_at: plan.access_end(now),
        })
        .await?;

    counter!("api_payment_requests_total", "endpoint" => "create", "status" => "created")
        .increment(1);
    Ok(HttpResponse::Created().json(PaymentBody::from(payment)))
}

pub async fn get_payment_handler(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payment = state
        .storage()
        .find_payment(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(PaymentBody::from(payment)))
}

pub async fn approve_payment_handler(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    match state.approvals().approve(id).await {
        Ok(outcome) => {
            counter!("api_payment_requests_total", "endpoint" => "approve", "status" => "approved")
                .increment(1);
            state.approvals().dispatch_approval_effects(outcome.clone());
            Ok(HttpResponse::Ok().json(ApprovalBody::from(outcome)))
        }
        Err(err) => {
            counter!("api_payment_requests_total", "endpoint" => "approve", "status" => error_tag(&err))
                .increment(1);
            Err(err.into())
        }
    }
}

pub async fn reject_payment_handler(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    match state.approvals().reject(id).await {
        Ok(outcome) => {
            counter!("api_payment_requests_total", "endpoint" => "reject", "status" => "rejected")
                .increment(1);
            state.approvals().dispatch_rejection_effects(outcome.clone());
            Ok(HttpResponse::Ok().json(RejectionBody {
                status: "rejected".into(),
                payment: outcome.payment.into(),
            }))
        }
        Err(err) => {
            counter!("api_payment_requests_total", "endpoint" => "reject", "status" => error_tag(&err))
                .increment(1);
            Err(err.into())
        }
    }
}

fn error_tag(err: &ApprovalError) -> &'static str {
    match err {
        ApprovalError::NotFound(_) => "not_found",
        ApprovalError::InvalidState { .. } => "invalid_state",
        ApprovalError::Storage(_) => "storage_error",
    }
}
