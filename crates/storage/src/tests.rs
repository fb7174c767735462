use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use subgate_domain::model::{
    NewPayment, NewPlan, NewSubscription, NewUser, PaymentMethod, PaymentRecord, PaymentStatus,
    PlanRecord, SubscriptionStatus, UserRecord,
};
use subgate_domain::storage::{
    PaymentStore, PlanStore, SubscriptionStore, UserStore,
};

use crate::SeaOrmStorage;

async fn storage() -> SeaOrmStorage {
    let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1);
    SeaOrmStorage::connect_with(options)
        .await
        .expect("storage inits")
}

async fn seed(storage: &SeaOrmStorage) -> (UserRecord, PlanRecord) {
    let user = storage
        .insert_user(NewUser {
            telegram_chat_id: Some(777_001),
            first_name: "Aziz".into(),
        })
        .await
        .expect("user inserts");
    let plan = storage
        .insert_plan(NewPlan {
            name: "Premium".into(),
            price: Decimal::from(100_000),
            duration_days: 30,
            description: "Monthly channel access".into(),
        })
        .await
        .expect("plan inserts");
    (user, plan)
}

async fn pending_payment(
    storage: &SeaOrmStorage,
    user: &UserRecord,
    plan: &PlanRecord,
) -> PaymentRecord {
    storage
        .insert_payment(NewPayment {
            user_id: user.id,
            plan_id: plan.id,
            amount: plan.price,
            method: PaymentMethod::Card,
            screenshot: Some("payment_screenshots/check.jpg".into()),
        })
        .await
        .expect("payment inserts")
}

#[tokio::test]
async fn insert_payment_defaults_to_pending() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;

    let payment = pending_payment(&storage, &user, &plan).await;

    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Decimal::from(100_000));
    let found = storage
        .find_payment(payment.id)
        .await
        .expect("find succeeds")
        .expect("payment exists");
    assert_eq!(found, payment);
}

#[tokio::test]
async fn approve_completes_payment_and_activates_subscription() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;
    let payment = pending_payment(&storage, &user, &plan).await;

    let now = Utc::now();
    let outcome = storage
        .approve_payment(payment.id, now)
        .await
        .expect("approve succeeds")
        .expect("payment was pending");

    assert_eq!(outcome.payment.status, PaymentStatus::Completed);
    assert_eq!(outcome.subscription.status, SubscriptionStatus::Active);
    assert!(outcome.subscription.is_active);
    assert_eq!(
        outcome.subscription.end_at - outcome.subscription.start_at,
        Duration::days(30)
    );
    assert!((outcome.subscription.start_at - now).num_milliseconds().abs() < 5);
    assert!(outcome.user.is_subscribed);

    // The committed rows agree with the returned outcome.
    let stored = storage
        .find_payment(payment.id)
        .await
        .unwrap()
        .expect("payment exists");
    assert_eq!(stored.status, PaymentStatus::Completed);
    let stored_user = storage.find_user(user.id).await.unwrap().expect("user exists");
    assert!(stored_user.is_subscribed);
}

#[tokio::test]
async fn approve_is_one_shot() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;
    let payment = pending_payment(&storage, &user, &plan).await;

    let now = Utc::now();
    storage
        .approve_payment(payment.id, now)
        .await
        .expect("first approve succeeds")
        .expect("payment was pending");
    let second = storage
        .approve_payment(payment.id, now)
        .await
        .expect("second call still queries cleanly");

    assert!(second.is_none());
    let active = storage
        .active_subscriptions_for_user(user.id)
        .await
        .expect("query succeeds");
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn reject_marks_failed_without_subscription() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;
    let payment = pending_payment(&storage, &user, &plan).await;

    let outcome = storage
        .reject_payment(payment.id, Utc::now())
        .await
        .expect("reject succeeds")
        .expect("payment was pending");

    assert_eq!(outcome.payment.status, PaymentStatus::Failed);
    assert!(!outcome.user.is_subscribed);
    let active = storage
        .active_subscriptions_for_user(user.id)
        .await
        .expect("query succeeds");
    assert!(active.is_empty());
}

#[tokio::test]
async fn approve_after_reject_returns_none() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;
    let payment = pending_payment(&storage, &user, &plan).await;

    storage
        .reject_payment(payment.id, Utc::now())
        .await
        .expect("reject succeeds")
        .expect("payment was pending");
    let approve = storage
        .approve_payment(payment.id, Utc::now())
        .await
        .expect("query succeeds");

    assert!(approve.is_none());
    let stored = storage.find_payment(payment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn racing_approve_and_reject_has_a_single_winner() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;
    let payment = pending_payment(&storage, &user, &plan).await;

    let now = Utc::now();
    let (approved, rejected) = tokio::join!(
        storage.approve_payment(payment.id, now),
        storage.reject_payment(payment.id, now),
    );
    let approved = approved.expect("approve query succeeds");
    let rejected = rejected.expect("reject query succeeds");

    assert!(approved.is_some() != rejected.is_some());
    let stored = storage.find_payment(payment.id).await.unwrap().unwrap();
    match (approved, rejected) {
        (Some(_), None) => assert_eq!(stored.status, PaymentStatus::Completed),
        (None, Some(_)) => assert_eq!(stored.status, PaymentStatus::Failed),
        _ => unreachable!("exactly one transition wins"),
    }
    let active = storage
        .active_subscriptions_for_user(user.id)
        .await
        .expect("query succeeds");
    assert_eq!(active.len(), usize::from(stored.status == PaymentStatus::Completed));
}

#[tokio::test]
async fn expire_subscription_flips_flags() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;
    let payment = pending_payment(&storage, &user, &plan).await;

    // Activate, then age the subscription past its window.
    let started = Utc::now() - Duration::days(31);
    let outcome = storage
        .approve_payment(payment.id, started)
        .await
        .expect("approve succeeds")
        .expect("payment was pending");

    let now = Utc::now();
    let due = storage.due_subscriptions(now).await.expect("query succeeds");
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, outcome.subscription.id);

    let expired = storage
        .expire_subscription(outcome.subscription.id, now)
        .await
        .expect("expire succeeds")
        .expect("subscription was active");

    assert_eq!(expired.subscription.status, SubscriptionStatus::Expired);
    assert!(!expired.subscription.is_active);
    assert!(expired.access_revoked);
    assert!(!expired.user.is_subscribed);

    let stored = storage
        .find_subscription(outcome.subscription.id)
        .await
        .expect("find succeeds")
        .expect("subscription exists");
    assert_eq!(stored.status, SubscriptionStatus::Expired);
}

#[tokio::test]
async fn expiring_twice_is_idempotent() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;
    let payment = pending_payment(&storage, &user, &plan).await;

    let started = Utc::now() - Duration::days(31);
    let outcome = storage
        .approve_payment(payment.id, started)
        .await
        .unwrap()
        .expect("payment was pending");

    let now = Utc::now();
    storage
        .expire_subscription(outcome.subscription.id, now)
        .await
        .expect("first expire succeeds")
        .expect("subscription was active");
    let second = storage
        .expire_subscription(outcome.subscription.id, now)
        .await
        .expect("second call still queries cleanly");

    assert!(second.is_none());
    let due = storage.due_subscriptions(now).await.expect("query succeeds");
    assert!(due.is_empty());
}

#[tokio::test]
async fn expiry_keeps_user_subscribed_while_another_window_is_open() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;

    let now = Utc::now();
    let stale = storage
        .insert_subscription(NewSubscription {
            user_id: user.id,
            plan_id: plan.id,
            status: SubscriptionStatus::Active,
            start_at: now - Duration::days(60),
            end_at: now - Duration::seconds(1),
        })
        .await
        .expect("stale subscription inserts");
    storage
        .insert_subscription(NewSubscription {
            user_id: user.id,
            plan_id: plan.id,
            status: SubscriptionStatus::Active,
            start_at: now,
            end_at: now + Duration::days(30),
        })
        .await
        .expect("fresh subscription inserts");

    let outcome = storage
        .expire_subscription(stale.id, now)
        .await
        .expect("expire succeeds")
        .expect("subscription was active");

    assert!(!outcome.access_revoked);
    let active = storage
        .active_subscriptions_for_user(user.id)
        .await
        .expect("query succeeds");
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn due_subscriptions_excludes_open_windows_and_inactive_rows() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;

    let now = Utc::now();
    storage
        .insert_subscription(NewSubscription {
            user_id: user.id,
            plan_id: plan.id,
            status: SubscriptionStatus::Active,
            start_at: now,
            end_at: now + Duration::days(30),
        })
        .await
        .expect("open subscription inserts");
    storage
        .insert_subscription(NewSubscription {
            user_id: user.id,
            plan_id: plan.id,
            status: SubscriptionStatus::Pending,
            start_at: now - Duration::days(60),
            end_at: now - Duration::days(30),
        })
        .await
        .expect("pending subscription inserts");

    let due = storage.due_subscriptions(now).await.expect("query succeeds");
    assert!(due.is_empty());
}

#[tokio::test]
async fn missing_rows_come_back_as_none() {
    let storage = storage().await;

    assert!(storage.find_payment(404).await.expect("query succeeds").is_none());
    assert!(storage
        .approve_payment(404, Utc::now())
        .await
        .expect("query succeeds")
        .is_none());
    assert!(storage
        .expire_subscription(404, Utc::now())
        .await
        .expect("query succeeds")
        .is_none());
}

#[tokio::test]
async fn user_and_plan_lookups_round_trip() {
    let storage = storage().await;
    let (user, plan) = seed(&storage).await;

    let by_chat = storage
        .find_user_by_chat(777_001)
        .await
        .expect("query succeeds")
        .expect("user exists");
    assert_eq!(by_chat.id, user.id);

    let plans = storage.list_plans().await.expect("query succeeds");
    assert_eq!(plans, vec![plan.clone()]);
    let found = storage
        .find_plan(plan.id)
        .await
        .expect("query succeeds")
        .expect("plan exists");
    assert_eq!(found.duration_days, 30);
}
