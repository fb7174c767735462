//! Messaging capabilities the state machine depends on, plus the user-facing
//! message texts. The Telegram implementation lives in `subgate_bot`; tests
//! inject in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{ChatId, PaymentRecord, SubscriptionRecord, UserRecord};

/// Delivers a text to a single external chat. Implementations catch every
/// transport error internally: a failed notification must never undo a
/// financial state transition, so this returns a bare delivery flag.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat_id: ChatId, text: &str) -> bool;
}

/// Issues and revokes access to the gated channel. TTL and use limits on
/// invite links are enforced by the channel provider; this side only
/// requests them.
#[async_trait]
pub trait ChannelGate: Send + Sync {
    /// Single-use invite link, or `None` on any transport failure; the
    /// caller degrades to a link-less notification instead of aborting.
    async fn issue_invite(&self, expire_at: DateTime<Utc>, member_limit: u32) -> Option<String>;

    /// Removes the user from the channel while leaving them free to rejoin
    /// through a fresh invite after renewing.
    async fn revoke_membership(&self, chat_id: ChatId) -> bool;
}

#[async_trait]
impl<T> Notifier for Arc<T>
where
    T: Notifier + ?Sized,
{
    async fn notify(&self, chat_id: ChatId, text: &str) -> bool {
        self.as_ref().notify(chat_id, text).await
    }
}

#[async_trait]
impl<T> ChannelGate for Arc<T>
where
    T: ChannelGate + ?Sized,
{
    async fn issue_invite(&self, expire_at: DateTime<Utc>, member_limit: u32) -> Option<String> {
        self.as_ref().issue_invite(expire_at, member_limit).await
    }

    async fn revoke_membership(&self, chat_id: ChatId) -> bool {
        self.as_ref().revoke_membership(chat_id).await
    }
}

pub fn approval_message(
    user: &UserRecord,
    payment: &PaymentRecord,
    subscription: &SubscriptionRecord,
    invite_link: Option<&str>,
) -> String {
    let mut text = format!(
        "✅ Payment approved!\n\n\
         Dear {name},\n\n\
         Amount: {amount}\n\
         Method: {method}\n\
         Date: {date}\n\n\
         Your subscription is active until {until}.",
        name = user.first_name,
        amount = payment.amount,
        method = payment.method,
        date = payment.created_at.format("%d.%m.%Y %H:%M"),
        until = subscription.end_at.format("%d.%m.%Y"),
    );
    match invite_link {
        Some(link) => {
            text.push_str(&format!(
                "\n\n🔐 Your channel invite link:\n{link}\n\n\
                 The link works once and expires in 24 hours, so please \
                 join before it does."
            ));
        }
        None => {
            text.push_str(
                "\n\nWe could not issue your channel invite link automatically; \
                 support will send it to you shortly.",
            );
        }
    }
    text
}

pub fn rejection_message(user: &UserRecord, payment: &PaymentRecord) -> String {
    format!(
        "❌ Payment rejected.\n\n\
         Dear {name},\n\n\
         Your payment of {amount} could not be confirmed. Please check the \
         details and try again with /start, or contact support.",
        name = user.first_name,
        amount = payment.amount,
    )
}

pub fn expiry_message(user: &UserRecord) -> String {
    format!(
        "⚠️ Dear {name},\n\n\
         Your subscription has expired and your channel access has been \
         removed. Send /start to renew.",
        name = user.first_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PaymentMethod, PaymentStatus, SubscriptionStatus};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn fixtures() -> (UserRecord, PaymentRecord, SubscriptionRecord) {
        let now = Utc::now();
        let user = UserRecord {
            id: 1,
            telegram_chat_id: Some(777_001),
            first_name: "Aziz".into(),
            is_subscribed: true,
            created_at: now,
            updated_at: now,
        };
        let payment = PaymentRecord {
            id: 10,
            user_id: 1,
            plan_id: 2,
            amount: Decimal::from(100_000),
            method: PaymentMethod::Card,
            status: PaymentStatus::Completed,
            screenshot: None,
            created_at: now,
            updated_at: now,
        };
        let subscription = SubscriptionRecord {
            id: 5,
            user_id: 1,
            plan_id: 2,
            is_active: true,
            status: SubscriptionStatus::Active,
            start_at: now,
            end_at: now + Duration::days(30),
            created_at: now,
            updated_at: now,
        };
        (user, payment, subscription)
    }

    #[test]
    fn approval_message_includes_link_when_issued() {
        let (user, payment, subscription) = fixtures();
        let text = approval_message(
            &user,
            &payment,
            &subscription,
            Some("https://t.me/+AbCdEf"),
        );
        assert!(text.contains("Aziz"));
        assert!(text.contains("100000"));
        assert!(text.contains("https://t.me/+AbCdEf"));
    }

    #[test]
    fn approval_message_degrades_without_link() {
        let (user, payment, subscription) = fixtures();
        let text = approval_message(&user, &payment, &subscription, None);
        assert!(!text.contains("https://"));
        assert!(text.contains("support will send it to you"));
    }

    #[test]
    fn rejection_and_expiry_messages_name_the_user() {
        let (user, payment, _) = fixtures();
        assert!(rejection_message(&user, &payment).contains("Aziz"));
        assert!(expiry_message(&user).contains("Aziz"));
    }
}
