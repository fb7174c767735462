use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{PostgresQueryBuilder, Query, SqliteQueryBuilder};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait,
    FromQueryResult, Set, Statement, TransactionTrait,
};
use subgate_domain::model::{
    ApprovalOutcome, NewPayment, PaymentId, PaymentRecord, RejectionOutcome,
};
use subgate_domain::storage::{PaymentStore, StorageResult};

use crate::entity::payments::{self, PaymentStatusDb};
use crate::entity::subscriptions::{self, SubscriptionStatusDb};
use crate::entity::{plans, users};
use crate::errors::StorageError;
use crate::subscription_store::subscription_to_record;
use crate::user_store::user_to_record;
use crate::SeaOrmStorage;

#[async_trait::async_trait]
impl PaymentStore for SeaOrmStorage {
    async fn insert_payment(&self, payment: NewPayment) -> StorageResult<PaymentRecord> {
        let now = Utc::now();
        let model = payments::ActiveModel {
            user_id: Set(payment.user_id),
            plan_id: Set(payment.plan_id),
            amount: Set(payment.amount),
            method: Set(payment.method.into()),
            status: Set(PaymentStatusDb::Pending),
            screenshot: Set(payment.screenshot),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let created = model
            .insert(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(payment_to_record(created))
    }

    async fn find_payment(&self, id: PaymentId) -> StorageResult<Option<PaymentRecord>> {
        let maybe = payments::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(maybe.map(payment_to_record))
    }

    async fn approve_payment(
        &self,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<ApprovalOutcome>> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(StorageError::from_source)?;

        // The conditional update is the lock: only one concurrent caller can
        // move the row out of PENDING, everyone else matches zero rows.
        let Some(payment) = finalize_payment(&txn, id, PaymentStatusDb::Completed, now).await?
        else {
            return Ok(None);
        };

        let plan = plans::Entity::find_by_id(payment.plan_id)
            .one(&txn)
            .await
            .map_err(StorageError::from_source)?
            .ok_or_else(|| {
                StorageError::Database(format!(
                    "plan {} missing for payment {}",
                    payment.plan_id, id
                ))
            })?;

        let end_at = now + Duration::days(i64::from(plan.duration_days));
        let subscription = subscriptions::ActiveModel {
            user_id: Set(payment.user_id),
            plan_id: Set(payment.plan_id),
            is_active: Set(true),
            status: Set(SubscriptionStatusDb::Active),
            start_at: Set(now),
            end_at: Set(end_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(StorageError::from_source)?;

        let user = set_user_subscribed(&txn, payment.user_id, true, now)
            .await?
            .ok_or_else(|| {
                StorageError::Database(format!(
                    "user {} missing for payment {}",
                    payment.user_id, id
                ))
            })?;

        txn.commit().await.map_err(StorageError::from_source)?;

        Ok(Some(ApprovalOutcome {
            payment: payment_to_record(payment),
            subscription: subscription_to_record(subscription),
            user: user_to_record(user),
        }))
    }

    async fn reject_payment(
        &self,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<RejectionOutcome>> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(StorageError::from_source)?;

        let Some(payment) = finalize_payment(&txn, id, PaymentStatusDb::Failed, now).await? else {
            return Ok(None);
        };

        let user = users::Entity::find_by_id(payment.user_id)
            .one(&txn)
            .await
            .map_err(StorageError::from_source)?
            .ok_or_else(|| {
                StorageError::Database(format!(
                    "user {} missing for payment {}",
                    payment.user_id, id
                ))
            })?;

        txn.commit().await.map_err(StorageError::from_source)?;

        Ok(Some(RejectionOutcome {
            payment: payment_to_record(payment),
            user: user_to_record(user),
        }))
    }
}

/// Compare-and-swap PENDING→`target`. Returns the updated row, or `None`
/// when the payment is missing or already finalized.
async fn finalize_payment<C>(
    conn: &C,
    id: PaymentId,
    target: PaymentStatusDb,
    now: DateTime<Utc>,
) -> StorageResult<Option<payments::Model>>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();

    let mut query = Query::update();
    query.table(payments::Entity);
    query.value(payments::Column::Status, target.to_value());
    query.value(payments::Column::UpdatedAt, now);
    query.and_where(payments::Column::Id.eq(id));
    query.and_where(payments::Column::Status.eq(PaymentStatusDb::Pending));
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
        .map(|row| payments::Model::from_query_result(&row, "").map_err(StorageError::from_source))
        .transpose()
}

pub(crate) async fn set_user_subscribed<C>(
    conn: &C,
    user_id: i64,
    subscribed: bool,
    now: DateTime<Utc>,
) -> StorageResult<Option<users::Model>>
where
    C: ConnectionTrait,
{
    let Some(model) = users::Entity::find_by_id(user_id)
        .one(conn)
        .await
        .map_err(StorageError::from_source)?
    else {
        return Ok(None);
    };

    let mut active: users::ActiveModel = model.into();
    active.is_subscribed = Set(subscribed);
    active.updated_at = Set(now);
    let updated = active
        .update(conn)
        .await
        .map_err(StorageError::from_source)?;
    Ok(Some(updated))
}

pub(crate) fn payment_to_record(model: payments::Model) -> PaymentRecord {
    PaymentRecord {
        id: model.id,
        user_id: model.user_id,
        plan_id: model.plan_id,
        amount: model.amount,
        method: model.method.into(),
        status: model.status.into(),
        screenshot: model.screenshot,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
