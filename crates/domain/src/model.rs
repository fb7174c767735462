//! Canonical records and status vocabularies shared by every binary.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

pub type UserId = i64;
pub type PlanId = i64;
pub type PaymentId = i64;
pub type SubscriptionId = i64;

/// Telegram chat identifier used to reach a user in direct messages.
pub type ChatId = i64;

/// How the user claims to have paid. Admins verify the uploaded screenshot
/// against this out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PaymentMethod {
    Card,
    Transfer,
    Crypto,
}

/// Payment lifecycle. `Pending` is the only state with outgoing
/// transitions; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    WaitingAdmin,
    Active,
    Expired,
    Cancelled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub telegram_chat_id: Option<ChatId>,
    pub first_name: String,
    pub is_subscribed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub telegram_chat_id: Option<ChatId>,
    pub first_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: PlanId,
    pub name: String,
    pub price: Decimal,
    pub duration_days: u32,
    pub description: String,
}

impl PlanRecord {
    /// End of the access window for a subscription starting at `start_at`.
    pub fn access_end(&self, start_at: DateTime<Utc>) -> DateTime<Utc> {
        start_at + Duration::days(i64::from(self.duration_days))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub name: String,
    pub price: Decimal,
    pub duration_days: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub screenshot: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub is_active: bool,
    pub status: SubscriptionStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    /// Whether the access window has elapsed, independent of the stored
    /// status (which is a cache refreshed by the sweeper).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.end_at <= now
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Everything the approval transition committed, returned to the caller and
/// handed to the post-commit notification path.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalOutcome {
    pub payment: PaymentRecord,
    pub subscription: SubscriptionRecord,
    pub user: UserRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectionOutcome {
    pub payment: PaymentRecord,
    pub user: UserRecord,
}

/// Result of expiring one subscription. `access_revoked` is true when this
/// was the user's last active subscription, i.e. channel access ends now.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryOutcome {
    pub subscription: SubscriptionRecord,
    pub user: UserRecord,
    pub access_revoked: bool,
}
