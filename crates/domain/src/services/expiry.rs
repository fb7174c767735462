//! Expires subscriptions whose access window has elapsed and mirrors the
//! revoke+notify side of the approval path.

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{info, warn};

use crate::messaging::{expiry_message, ChannelGate, Notifier};
use crate::model::ExpiryOutcome;
use crate::storage::{StorageError, SubscriptionStore};

/// What one sweep pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub revoked: usize,
    pub notified: usize,
}

#[derive(Clone)]
pub struct ExpiryService<S, N, G> {
    store: S,
    notifier: N,
    gate: G,
}

impl<S, N, G> ExpiryService<S, N, G>
where
    S: SubscriptionStore,
    N: Notifier,
    G: ChannelGate,
{
    pub fn new(store: S, notifier: N, gate: G) -> Self {
        Self {
            store,
            notifier,
            gate,
        }
    }

    /// Expires every subscription due at `now`. The due set is a snapshot
    /// taken up front, so a subscription activated while the pass runs is
    /// left for the next one. One item failing never aborts the rest of the
    /// batch.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, StorageError> {
        let due = self.store.due_subscriptions(now).await?;
        let mut report = SweepReport::default();
        if due.is_empty() {
            return Ok(report);
        }

        info!(count = due.len(), "expiring subscriptions past their access window");

        for subscription in due {
            match self.store.expire_subscription(subscription.id, now).await {
                Ok(Some(outcome)) => {
                    report.expired += 1;
                    counter!("sweeper_subscriptions_expired_total").increment(1);
                    self.revoke_and_notify(&outcome, &mut report).await;
                }
                Ok(None) => {
                    // Finalized by a concurrent pass between snapshot and now.
                    counter!("sweeper_expirations_skipped_total").increment(1);
                }
                Err(err) => {
                    warn!(
                        subscription_id = subscription.id,
                        user_id = subscription.user_id,
                        ?err,
                        "failed to expire subscription, continuing with the batch"
                    );
                    counter!("sweeper_expiration_errors_total").increment(1);
                }
            }
        }

        Ok(report)
    }

    /// Best-effort channel removal + expiry notice. Membership is only
    /// revoked when the user lost their last active subscription; a user
    /// with another paid window stays in the channel.
    async fn revoke_and_notify(&self, outcome: &ExpiryOutcome, report: &mut SweepReport) {
        let Some(chat_id) = outcome.user.telegram_chat_id else {
            counter!("sweeper_notices_total", "result" => "no_chat").increment(1);
            return;
        };

        if outcome.access_revoked {
            if self.gate.revoke_membership(chat_id).await {
                report.revoked += 1;
                counter!("sweeper_revocations_total", "result" => "ok").increment(1);
            } else {
                warn!(
                    subscription_id = outcome.subscription.id,
                    chat_id, "failed to revoke channel membership"
                );
                counter!("sweeper_revocations_total", "result" => "error").increment(1);
            }
        }

        if self.notifier.notify(chat_id, &expiry_message(&outcome.user)).await {
            report.notified += 1;
            counter!("sweeper_notices_total", "result" => "ok").increment(1);
        } else {
            warn!(
                subscription_id = outcome.subscription.id,
                chat_id, "expiry notice delivery failed"
            );
            counter!("sweeper_notices_total", "result" => "error").increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ChatId, NewSubscription, SubscriptionId, SubscriptionRecord, SubscriptionStatus, UserId,
        UserRecord,
    };
    use crate::storage::StorageResult;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const CHAT: ChatId = 777_001;

    fn active_subscription(id: SubscriptionId, user_id: UserId, end_in_secs: i64) -> SubscriptionRecord {
        let now = Utc::now();
        SubscriptionRecord {
            id,
            user_id,
            plan_id: 1,
            is_active: true,
            status: SubscriptionStatus::Active,
            start_at: now - Duration::days(30),
            end_at: now + Duration::seconds(end_in_secs),
            created_at: now - Duration::days(30),
            updated_at: now - Duration::days(30),
        }
    }

    #[derive(Clone, Default)]
    struct MockSubscriptions {
        subs: Arc<Mutex<HashMap<SubscriptionId, SubscriptionRecord>>>,
        fail_on: Arc<Mutex<Option<SubscriptionId>>>,
    }

    impl MockSubscriptions {
        fn with(subs: Vec<SubscriptionRecord>) -> Self {
            let store = Self::default();
            let mut guard = store.subs.lock().unwrap();
            for sub in subs {
                guard.insert(sub.id, sub);
            }
            drop(guard);
            store
        }

        fn failing_on(self, id: SubscriptionId) -> Self {
            *self.fail_on.lock().unwrap() = Some(id);
            self
        }

        fn status_of(&self, id: SubscriptionId) -> Option<SubscriptionStatus> {
            self.subs.lock().unwrap().get(&id).map(|s| s.status)
        }

        fn user_for(&self, user_id: UserId, subscribed: bool) -> UserRecord {
            let now = Utc::now();
            UserRecord {
                id: user_id,
                telegram_chat_id: Some(CHAT),
                first_name: "Aziz".into(),
                is_subscribed: subscribed,
                created_at: now,
                updated_at: now,
            }
        }
    }

    #[async_trait]
    impl SubscriptionStore for MockSubscriptions {
        async fn insert_subscription(
            &self,
            _subscription: NewSubscription,
        ) -> StorageResult<SubscriptionRecord> {
            unimplemented!("not exercised by these tests")
        }

        async fn find_subscription(
            &self,
            id: SubscriptionId,
        ) -> StorageResult<Option<SubscriptionRecord>> {
            Ok(self.subs.lock().unwrap().get(&id).cloned())
        }

        async fn active_subscriptions_for_user(
            &self,
            user_id: UserId,
        ) -> StorageResult<Vec<SubscriptionRecord>> {
            Ok(self
                .subs
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
                .cloned()
                .collect())
        }

        async fn due_subscriptions(
            &self,
            now: DateTime<Utc>,
        ) -> StorageResult<Vec<SubscriptionRecord>> {
            Ok(self
                .subs
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.status == SubscriptionStatus::Active && s.end_at <= now)
                .cloned()
                .collect())
        }

        async fn expire_subscription(
            &self,
            id: SubscriptionId,
            now: DateTime<Utc>,
        ) -> StorageResult<Option<ExpiryOutcome>> {
            if *self.fail_on.lock().unwrap() == Some(id) {
                return Err(StorageError::Database("simulated failure".into()));
            }
            let mut subs = self.subs.lock().unwrap();
            let Some(sub) = subs.get_mut(&id) else {
                return Ok(None);
            };
            if sub.status != SubscriptionStatus::Active {
                return Ok(None);
            }
            sub.status = SubscriptionStatus::Expired;
            sub.is_active = false;
            sub.updated_at = now;
            let subscription = sub.clone();
            let remaining = subs
                .values()
                .filter(|s| s.user_id == subscription.user_id && s.status == SubscriptionStatus::Active)
                .count();
            drop(subs);
            let access_revoked = remaining == 0;
            Ok(Some(ExpiryOutcome {
                user: self.user_for(subscription.user_id, !access_revoked),
                subscription,
                access_revoked,
            }))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingTransport {
        notices: Arc<Mutex<Vec<ChatId>>>,
        revoked: Arc<Mutex<Vec<ChatId>>>,
    }

    #[async_trait]
    impl Notifier for RecordingTransport {
        async fn notify(&self, chat_id: ChatId, _text: &str) -> bool {
            self.notices.lock().unwrap().push(chat_id);
            true
        }
    }

    #[async_trait]
    impl ChannelGate for RecordingTransport {
        async fn issue_invite(
            &self,
            _expire_at: DateTime<Utc>,
            _member_limit: u32,
        ) -> Option<String> {
            None
        }

        async fn revoke_membership(&self, chat_id: ChatId) -> bool {
            self.revoked.lock().unwrap().push(chat_id);
            true
        }
    }

    fn service(
        store: MockSubscriptions,
        transport: RecordingTransport,
    ) -> ExpiryService<MockSubscriptions, RecordingTransport, RecordingTransport> {
        ExpiryService::new(store, transport.clone(), transport)
    }

    #[tokio::test]
    async fn sweep_expires_due_subscriptions_and_revokes_access() {
        let store = MockSubscriptions::with(vec![active_subscription(1, 1, -1)]);
        let transport = RecordingTransport::default();
        let svc = service(store.clone(), transport.clone());

        let report = svc.sweep(Utc::now()).await.expect("sweep succeeds");

        assert_eq!(report, SweepReport { expired: 1, revoked: 1, notified: 1 });
        assert_eq!(store.status_of(1), Some(SubscriptionStatus::Expired));
        assert_eq!(*transport.revoked.lock().unwrap(), vec![CHAT]);
    }

    #[tokio::test]
    async fn sweep_twice_expires_each_subscription_once() {
        let store = MockSubscriptions::with(vec![
            active_subscription(1, 1, -10),
            active_subscription(2, 2, -10),
        ]);
        let transport = RecordingTransport::default();
        let svc = service(store, transport.clone());

        let first = svc.sweep(Utc::now()).await.expect("first sweep");
        let second = svc.sweep(Utc::now()).await.expect("second sweep");

        assert_eq!(first.expired, 2);
        assert_eq!(second, SweepReport::default());
        assert_eq!(transport.notices.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sweep_ignores_subscriptions_still_in_window() {
        let store = MockSubscriptions::with(vec![
            active_subscription(1, 1, -1),
            active_subscription(2, 2, 3600),
        ]);
        let svc = service(store.clone(), RecordingTransport::default());

        let report = svc.sweep(Utc::now()).await.expect("sweep succeeds");

        assert_eq!(report.expired, 1);
        assert_eq!(store.status_of(2), Some(SubscriptionStatus::Active));
    }

    #[tokio::test]
    async fn one_failing_item_does_not_abort_the_batch() {
        let store = MockSubscriptions::with(vec![
            active_subscription(1, 1, -10),
            active_subscription(2, 2, -10),
            active_subscription(3, 3, -10),
        ])
        .failing_on(2);
        let svc = service(store.clone(), RecordingTransport::default());

        let report = svc.sweep(Utc::now()).await.expect("sweep succeeds");

        assert_eq!(report.expired, 2);
        assert_eq!(store.status_of(1), Some(SubscriptionStatus::Expired));
        assert_eq!(store.status_of(2), Some(SubscriptionStatus::Active));
        assert_eq!(store.status_of(3), Some(SubscriptionStatus::Expired));
    }

    #[tokio::test]
    async fn membership_survives_while_another_subscription_is_active() {
        let store = MockSubscriptions::with(vec![
            active_subscription(1, 1, -10),
            active_subscription(2, 1, 3600),
        ]);
        let transport = RecordingTransport::default();
        let svc = service(store, transport.clone());

        let report = svc.sweep(Utc::now()).await.expect("sweep succeeds");

        assert_eq!(report.expired, 1);
        assert_eq!(report.revoked, 0);
        assert!(transport.revoked.lock().unwrap().is_empty());
        assert_eq!(report.notified, 1);
    }
}
