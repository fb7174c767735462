//! Telegram transport behind the domain messaging traits.
//!
//! One cloneable handle wraps a `teloxide::Bot`; every call is bounded by a
//! timeout and collapses transport errors into the trait's "not delivered"
//! signal, so a Telegram outage can never leak into a payment transition.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use teloxide::prelude::*;
use teloxide::requests::Request;
use teloxide::types::{ChatId as TgChatId, UserId as TgUserId};
use tokio::time::timeout;
use tracing::warn;

use subgate_domain::config::BotConfig;
use subgate_domain::messaging::{ChannelGate, Notifier};
use subgate_domain::model::ChatId;

#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
    channel_id: TgChatId,
    call_timeout: Duration,
}

impl TelegramChannel {
    pub fn new(token: &str, channel_id: i64, call_timeout: Duration) -> Self {
        Self {
            bot: Bot::new(token),
            channel_id: TgChatId(channel_id),
            call_timeout,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            config.bot_token(),
            config.channel_id(),
            Duration::from_secs(config.notify_timeout_secs()),
        )
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn notify(&self, chat_id: ChatId, text: &str) -> bool {
        let request = self.bot.send_message(TgChatId(chat_id), text);
        match timeout(self.call_timeout, request.send()).await {
            Ok(Ok(_)) => {
                counter!("telegram_calls_total", "method" => "send_message", "result" => "ok")
                    .increment(1);
                true
            }
            Ok(Err(err)) => {
                warn!(chat_id, ?err, "telegram send failed");
                counter!("telegram_calls_total", "method" => "send_message", "result" => "error")
                    .increment(1);
                false
            }
            Err(_) => {
                warn!(chat_id, timeout = ?self.call_timeout, "telegram send timed out");
                counter!("telegram_calls_total", "method" => "send_message", "result" => "timeout")
                    .increment(1);
                false
            }
        }
    }
}

#[async_trait]
impl ChannelGate for TelegramChannel {
    async fn issue_invite(&self, expire_at: DateTime<Utc>, member_limit: u32) -> Option<String> {
        let request = self
            .bot
            .create_chat_invite_link(self.channel_id)
            .expire_date(expire_at)
            .member_limit(member_limit);
        match timeout(self.call_timeout, request.send()).await {
            Ok(Ok(link)) => {
                counter!("telegram_calls_total", "method" => "create_invite", "result" => "ok")
                    .increment(1);
                Some(link.invite_link)
            }
            Ok(Err(err)) => {
                warn!(?err, "invite link creation failed");
                counter!("telegram_calls_total", "method" => "create_invite", "result" => "error")
                    .increment(1);
                None
            }
            Err(_) => {
                warn!(timeout = ?self.call_timeout, "invite link creation timed out");
                counter!("telegram_calls_total", "method" => "create_invite", "result" => "timeout")
                    .increment(1);
                None
            }
        }
    }

    async fn revoke_membership(&self, chat_id: ChatId) -> bool {
        // Ban-then-unban clears the membership while leaving the user able
        // to rejoin through a fresh invite once they renew.
        let Ok(user_id) = u64::try_from(chat_id) else {
            warn!(chat_id, "cannot revoke membership for a non-user chat id");
            return false;
        };
        let user = TgUserId(user_id);

        let ban = self.bot.ban_chat_member(self.channel_id, user);
        match timeout(self.call_timeout, ban.send()).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                warn!(chat_id, ?err, "channel ban failed");
                counter!("telegram_calls_total", "method" => "ban_member", "result" => "error")
                    .increment(1);
                return false;
            }
            Err(_) => {
                warn!(chat_id, "channel ban timed out");
                counter!("telegram_calls_total", "method" => "ban_member", "result" => "timeout")
                    .increment(1);
                return false;
            }
        }
        counter!("telegram_calls_total", "method" => "ban_member", "result" => "ok").increment(1);

        let unban = self.bot.unban_chat_member(self.channel_id, user);
        match timeout(self.call_timeout, unban.send()).await {
            Ok(Ok(_)) => {
                counter!("telegram_calls_total", "method" => "unban_member", "result" => "ok")
                    .increment(1);
                true
            }
            Ok(Err(err)) => {
                // The removal itself succeeded; the user just stays banned
                // until the next revoke pass or a manual unban.
                warn!(chat_id, ?err, "channel unban failed after ban");
                counter!("telegram_calls_total", "method" => "unban_member", "result" => "error")
                    .increment(1);
                true
            }
            Err(_) => {
                warn!(chat_id, "channel unban timed out after ban");
                counter!("telegram_calls_total", "method" => "unban_member", "result" => "timeout")
                    .increment(1);
                true
            }
        }
    }
}
