use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use subgate_domain::model::{ChatId, NewUser, UserId, UserRecord};
use subgate_domain::storage::{StorageResult, UserStore};

use crate::entity::users;
use crate::errors::StorageError;
use crate::SeaOrmStorage;

#[async_trait::async_trait]
impl UserStore for SeaOrmStorage {
    async fn insert_user(&self, user: NewUser) -> StorageResult<UserRecord> {
        let now = Utc::now();
        let model = users::ActiveModel {
            telegram_chat_id: Set(user.telegram_chat_id),
            first_name: Set(user.first_name),
            is_subscribed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let created = model
            .insert(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(user_to_record(created))
    }

    async fn find_user(&self, id: UserId) -> StorageResult<Option<UserRecord>> {
        let maybe = users::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(maybe.map(user_to_record))
    }

    async fn find_user_by_chat(&self, chat_id: ChatId) -> StorageResult<Option<UserRecord>> {
        let maybe = users::Entity::find()
            .filter(users::Column::TelegramChatId.eq(chat_id))
            .one(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(maybe.map(user_to_record))
    }
}

pub(crate) fn user_to_record(model: users::Model) -> UserRecord {
    UserRecord {
        id: model.id,
        telegram_chat_id: model.telegram_chat_id,
        first_name: model.first_name,
        is_subscribed: model.is_subscribed,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
