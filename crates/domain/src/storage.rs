//! Storage capability traits implemented by the SeaORM adapters in
//! `subgate_storage`. The approval and expiry transitions are single trait
//! methods so implementations can run them as one atomic transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    ApprovalOutcome, ChatId, ExpiryOutcome, NewPayment, NewPlan, NewSubscription, NewUser,
    PaymentId, PaymentRecord, PlanId, PlanRecord, RejectionOutcome, SubscriptionId,
    SubscriptionRecord, UserId, UserRecord,
};

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
}

impl StorageError {
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> StorageResult<UserRecord>;
    async fn find_user(&self, id: UserId) -> StorageResult<Option<UserRecord>>;
    async fn find_user_by_chat(&self, chat_id: ChatId) -> StorageResult<Option<UserRecord>>;
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn insert_plan(&self, plan: NewPlan) -> StorageResult<PlanRecord>;
    async fn find_plan(&self, id: PlanId) -> StorageResult<Option<PlanRecord>>;
    async fn list_plans(&self) -> StorageResult<Vec<PlanRecord>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(&self, payment: NewPayment) -> StorageResult<PaymentRecord>;
    async fn find_payment(&self, id: PaymentId) -> StorageResult<Option<PaymentRecord>>;

    /// Atomic PENDING→COMPLETED transition: flips the payment, inserts the
    /// activated subscription (window `now .. now + plan.duration_days`),
    /// and marks the owner subscribed, all in one transaction. Returns
    /// `None` without side effects when the payment is not currently
    /// PENDING; the loser of a concurrent approve/reject race lands here.
    async fn approve_payment(
        &self,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<ApprovalOutcome>>;

    /// Atomic PENDING→FAILED transition. Same `None` contract as
    /// [`approve_payment`](Self::approve_payment); no subscription rows are
    /// touched.
    async fn reject_payment(
        &self,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<RejectionOutcome>>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert_subscription(
        &self,
        subscription: NewSubscription,
    ) -> StorageResult<SubscriptionRecord>;
    async fn find_subscription(
        &self,
        id: SubscriptionId,
    ) -> StorageResult<Option<SubscriptionRecord>>;
    async fn active_subscriptions_for_user(
        &self,
        user_id: UserId,
    ) -> StorageResult<Vec<SubscriptionRecord>>;

    /// Active subscriptions whose access window has elapsed as of `now`.
    /// The snapshot is taken at query time; rows activated afterwards are
    /// not part of the sweep that issued the query.
    async fn due_subscriptions(&self, now: DateTime<Utc>)
        -> StorageResult<Vec<SubscriptionRecord>>;

    /// Atomic active→expired transition: deactivates the row and, when no
    /// other active subscription remains for the owner, clears
    /// `is_subscribed`. Returns `None` when the row is no longer active
    /// (already expired by a concurrent pass), which makes sweeping
    /// idempotent.
    async fn expire_subscription(
        &self,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<ExpiryOutcome>>;
}
