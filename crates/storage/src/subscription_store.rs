use chrono::{DateTime, Utc};
use sea_orm::sea_query::{PostgresQueryBuilder, Query, SqliteQueryBuilder};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, Set, Statement, TransactionTrait,
};
use subgate_domain::model::{
    ExpiryOutcome, NewSubscription, SubscriptionId, SubscriptionRecord, SubscriptionStatus, UserId,
};
use subgate_domain::storage::{StorageResult, SubscriptionStore};

use crate::entity::subscriptions::{self, SubscriptionStatusDb};
use crate::entity::users;
use crate::errors::StorageError;
use crate::payment_store::set_user_subscribed;
use crate::user_store::user_to_record;
use crate::SeaOrmStorage;

#[async_trait::async_trait]
impl SubscriptionStore for SeaOrmStorage {
    async fn insert_subscription(
        &self,
        subscription: NewSubscription,
    ) -> StorageResult<SubscriptionRecord> {
        let now = Utc::now();
        let is_active = subscription.status == SubscriptionStatus::Active;
        let model = subscriptions::ActiveModel {
            user_id: Set(subscription.user_id),
            plan_id: Set(subscription.plan_id),
            is_active: Set(is_active),
            status: Set(subscription.status.into()),
            start_at: Set(subscription.start_at),
            end_at: Set(subscription.end_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let created = model
            .insert(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(subscription_to_record(created))
    }

    async fn find_subscription(
        &self,
        id: SubscriptionId,
    ) -> StorageResult<Option<SubscriptionRecord>> {
        let maybe = subscriptions::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(maybe.map(subscription_to_record))
    }

    async fn active_subscriptions_for_user(
        &self,
        user_id: UserId,
    ) -> StorageResult<Vec<SubscriptionRecord>> {
        let models = subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::Status.eq(SubscriptionStatusDb::Active))
            .all(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(models.into_iter().map(subscription_to_record).collect())
    }

    async fn due_subscriptions(
        &self,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<SubscriptionRecord>> {
        let models = subscriptions::Entity::find()
            .filter(subscriptions::Column::Status.eq(SubscriptionStatusDb::Active))
            .filter(subscriptions::Column::EndAt.lte(now))
            .all(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(models.into_iter().map(subscription_to_record).collect())
    }

    async fn expire_subscription(
        &self,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<ExpiryOutcome>> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(StorageError::from_source)?;

        // Same discipline as the payment transition: the conditional update
        // only matches while the row is still active, so a row expired by a
        // concurrent pass (or re-activated after the due snapshot) is left
        // alone.
        let Some(subscription) = deactivate_subscription(&txn, id, now).await? else {
            return Ok(None);
        };

        let remaining = subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(subscription.user_id))
            .filter(subscriptions::Column::Status.eq(SubscriptionStatusDb::Active))
            .count(&txn)
            .await
            .map_err(StorageError::from_source)?;
        let access_revoked = remaining == 0;

        let user = if access_revoked {
            set_user_subscribed(&txn, subscription.user_id, false, now)
                .await?
                .ok_or_else(|| {
                    StorageError::Database(format!(
                        "user {} missing for subscription {}",
                        subscription.user_id, id
                    ))
                })?
        } else {
            users::Entity::find_by_id(subscription.user_id)
                .one(&txn)
                .await
                .map_err(StorageError::from_source)?
                .ok_or_else(|| {
                    StorageError::Database(format!(
                        "user {} missing for subscription {}",
                        subscription.user_id, id
                    ))
                })?
        };

        txn.commit().await.map_err(StorageError::from_source)?;

        Ok(Some(ExpiryOutcome {
            subscription: subscription_to_record(subscription),
            user: user_to_record(user),
            access_revoked,
        }))
    }
}

/// Compare-and-swap active→expired. Returns the updated row, or `None` when
/// the subscription is missing or no longer active.
async fn deactivate_subscription<C>(
    conn: &C,
    id: SubscriptionId,
    now: DateTime<Utc>,
) -> StorageResult<Option<subscriptions::Model>>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();

    let mut query = Query::update();
    query.table(subscriptions::Entity);
    query.value(
        subscriptions::Column::Status,
        SubscriptionStatusDb::Expired.to_value(),
    );
    query.value(subscriptions::Column::IsActive, false);
    query.value(subscriptions::Column::UpdatedAt, now);
    query.and_where(subscriptions::Column::Id.eq(id));
    query.and_where(subscriptions::Column::Status.eq(SubscriptionStatusDb::Active));
    query.returning_all();

    let (sql, values) = match backend {
        DatabaseBackend::Sqlite => query.build(SqliteQueryBuilder),
        DatabaseBackend::Postgres => query.build(PostgresQueryBuilder),
        DatabaseBackend::MySql => unreachable!("mysql backend is not supported"),
    };
    let stmt = Statement::from_sql_and_values(backend, sql, values);
    let maybe_row = conn
        .query_one(stmt)
        .await
        .map_err(StorageError::from_source)?;

    maybe_row
        .map(|row| {
            subscriptions::Model::from_query_result(&row, "").map_err(StorageError::from_source)
        })
        .transpose()
}

pub(crate) fn subscription_to_record(model: subscriptions::Model) -> SubscriptionRecord {
    SubscriptionRecord {
        id: model.id,
        user_id: model.user_id,
        plan_id: model.plan_id,
        is_active: model.is_active,
        status: model.status.into(),
        start_at: model.start_at,
        end_at: model.end_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
