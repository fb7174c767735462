//! The payment approval state machine.
//!
//! The persistence transition (payment + subscription + user flag) runs as
//! one atomic storage call; everything that talks to Telegram happens after
//! the commit, is bounded by the transport's timeout, and can only ever be
//! logged; a delivery failure is invisible to the caller of
//! [`ApprovalService::approve`].

use chrono::{Duration, Utc};
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::messaging::{approval_message, rejection_message, ChannelGate, Notifier};
use crate::model::{ApprovalOutcome, PaymentId, PaymentStatus, RejectionOutcome};
use crate::storage::{PaymentStore, StorageError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApprovalError {
    #[error("payment {0} not found")]
    NotFound(PaymentId),
    #[error("payment already finalized (status {current})")]
    InvalidState {
        id: PaymentId,
        current: PaymentStatus,
    },
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct ApprovalService<S, N, G> {
    store: S,
    notifier: N,
    gate: G,
    invite_ttl: Duration,
}

impl<S, N, G> ApprovalService<S, N, G>
where
    S: PaymentStore + Clone + Send + Sync + 'static,
    N: Notifier + Clone + Send + Sync + 'static,
    G: ChannelGate + Clone + Send + Sync + 'static,
{
    pub fn new(store: S, notifier: N, gate: G, invite_ttl: Duration) -> Self {
        Self {
            store,
            notifier,
            gate,
            invite_ttl,
        }
    }

    /// Performs the PENDING→COMPLETED transition exactly once. Concurrent
    /// calls on the same payment are serialized by the storage layer; the
    /// loser observes a finalized status and fails with `InvalidState`.
    pub async fn approve(&self, payment_id: PaymentId) -> Result<ApprovalOutcome, ApprovalError> {
        let now = Utc::now();
        match self.store.approve_payment(payment_id, now).await? {
            Some(outcome) => {
                counter!("payment_transitions_total", "action" => "approve", "result" => "completed")
                    .increment(1);
                Ok(outcome)
            }
            None => {
                let err = self.finalized_or_missing(payment_id).await;
                counter!("payment_transitions_total", "action" => "approve", "result" => "denied")
                    .increment(1);
                Err(err)
            }
        }
    }

    /// Performs the PENDING→FAILED transition with the same locking and
    /// idempotence contract as [`approve`](Self::approve).
    pub async fn reject(&self, payment_id: PaymentId) -> Result<RejectionOutcome, ApprovalError> {
        let now = Utc::now();
        match self.store.reject_payment(payment_id, now).await? {
            Some(outcome) => {
                counter!("payment_transitions_total", "action" => "reject", "result" => "failed")
                    .increment(1);
                Ok(outcome)
            }
            None => {
                let err = self.finalized_or_missing(payment_id).await;
                counter!("payment_transitions_total", "action" => "reject", "result" => "denied")
                    .increment(1);
                Err(err)
            }
        }
    }

    /// Fires the post-commit side effects without making the caller wait on
    /// transport I/O.
    pub fn dispatch_approval_effects(&self, outcome: ApprovalOutcome) {
        let service = self.clone();
        tokio::spawn(async move {
            service.deliver_approval_effects(&outcome).await;
        });
    }

    pub fn dispatch_rejection_effects(&self, outcome: RejectionOutcome) {
        let service = self.clone();
        tokio::spawn(async move {
            service.deliver_rejection_effects(&outcome).await;
        });
    }

    /// Best-effort invite issuance + approval notice. Runs strictly after
    /// the transition committed; every failure path ends in a log line and
    /// a counter, never an error.
    pub async fn deliver_approval_effects(&self, outcome: &ApprovalOutcome) {
        let Some(chat_id) = outcome.user.telegram_chat_id else {
            debug!(
                payment_id = outcome.payment.id,
                user_id = outcome.user.id,
                "user has no chat id, skipping approval notice"
            );
            counter!("approval_effects_total", "result" => "no_chat").increment(1);
            return;
        };

        let expire_at = Utc::now() + self.invite_ttl;
        let invite = self.gate.issue_invite(expire_at, 1).await;
        if invite.is_none() {
            warn!(
                payment_id = outcome.payment.id,
                "invite link unavailable, sending approval notice without it"
            );
            counter!("approval_effects_total", "result" => "invite_failed").increment(1);
        }

        let text = approval_message(
            &outcome.user,
            &outcome.payment,
            &outcome.subscription,
            invite.as_deref(),
        );
        if self.notifier.notify(chat_id, &text).await {
            counter!("approval_effects_total", "result" => "notified").increment(1);
        } else {
            warn!(
                payment_id = outcome.payment.id,
                chat_id, "approval notice delivery failed"
            );
            counter!("approval_effects_total", "result" => "notify_failed").increment(1);
        }
    }

    pub async fn deliver_rejection_effects(&self, outcome: &RejectionOutcome) {
        let Some(chat_id) = outcome.user.telegram_chat_id else {
            counter!("rejection_effects_total", "result" => "no_chat").increment(1);
            return;
        };

        let text = rejection_message(&outcome.user, &outcome.payment);
        if self.notifier.notify(chat_id, &text).await {
            counter!("rejection_effects_total", "result" => "notified").increment(1);
        } else {
            warn!(
                payment_id = outcome.payment.id,
                chat_id, "rejection notice delivery failed"
            );
            counter!("rejection_effects_total", "result" => "notify_failed").increment(1);
        }
    }

    /// The transition query matched nothing: either the payment is already
    /// finalized or it never existed. Terminal statuses are immutable, so
    /// reading the row after the fact is race-free.
    async fn finalized_or_missing(&self, payment_id: PaymentId) -> ApprovalError {
        match self.store.find_payment(payment_id).await {
            Ok(Some(payment)) => ApprovalError::InvalidState {
                id: payment_id,
                current: payment.status,
            },
            Ok(None) => ApprovalError::NotFound(payment_id),
            Err(err) => ApprovalError::Storage(err),
        }
    }
}
