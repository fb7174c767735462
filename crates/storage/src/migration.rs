use sea_orm::sea_query::{ColumnDef, Table, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};

use crate::entity::{payments, plans, subscriptions, users};
use subgate_domain::storage::StorageResult;

pub async fn run_migrations(db: &DatabaseConnection) -> StorageResult<()> {
    let backend = db.get_database_backend();

    let users_table = Table::create()
        .if_not_exists()
        .table(users::Entity)
        .col(
            ColumnDef::new(users::Column::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(users::Column::TelegramChatId).big_integer().null())
        .col(
            ColumnDef::new(users::Column::FirstName)
                .string_len(128)
                .not_null(),
        )
        .col(
            ColumnDef::new(users::Column::IsSubscribed)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(ColumnDef::new(users::Column::CreatedAt).date_time().not_null())
        .col(ColumnDef::new(users::Column::UpdatedAt).date_time().not_null())
        .to_owned();
    create_table(db, backend, users_table).await?;

    let plans_table = Table::create()
        .if_not_exists()
        .table(plans::Entity)
        .col(
            ColumnDef::new(plans::Column::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(plans::Column::Name).string_len(100).not_null())
        .col(
            ColumnDef::new(plans::Column::Price)
                .decimal_len(10, 2)
                .not_null(),
        )
        .col(
            ColumnDef::new(plans::Column::DurationDays)
                .integer()
                .not_null(),
        )
        .col(ColumnDef::new(plans::Column::Description).string().not_null())
        .to_owned();
    create_table(db, backend, plans_table).await?;

    let payments_table = Table::create()
        .if_not_exists()
        .table(payments::Entity)
        .col(
            ColumnDef::new(payments::Column::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(payments::Column::UserId).big_integer().not_null())
        .col(ColumnDef::new(payments::Column::PlanId).big_integer().not_null())
        .col(
            ColumnDef::new(payments::Column::Amount)
                .decimal_len(10, 2)
                .not_null(),
        )
        .col(
            ColumnDef::new(payments::Column::Method)
                .string_len(16)
                .not_null(),
        )
        .col(
            ColumnDef::new(payments::Column::Status)
                .string_len(16)
                .not_null(),
        )
        .col(ColumnDef::new(payments::Column::Screenshot).string().null())
        .col(
            ColumnDef::new(payments::Column::CreatedAt)
                .date_time()
                .not_null(),
        )
        .col(
            ColumnDef::new(payments::Column::UpdatedAt)
                .date_time()
                .not_null(),
        )
        .to_owned();
    create_table(db, backend, payments_table).await?;

    let subscriptions_table = Table::create()
        .if_not_exists()
        .table(subscriptions::Entity)
        .col(
            ColumnDef::new(subscriptions::Column::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(subscriptions::Column::UserId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(subscriptions::Column::PlanId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(subscriptions::Column::IsActive)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(subscriptions::Column::Status)
                .string_len(16)
                .not_null(),
        )
        .col(
            ColumnDef::new(subscriptions::Column::StartAt)
                .date_time()
                .not_null(),
        )
        .col(
            ColumnDef::new(subscriptions::Column::EndAt)
                .date_time()
                .not_null(),
        )
        .col(
            ColumnDef::new(subscriptions::Column::CreatedAt)
                .date_time()
                .not_null(),
        )
        .col(
            ColumnDef::new(subscriptions::Column::UpdatedAt)
                .date_time()
                .not_null(),
        )
        .to_owned();
    create_table(db, backend, subscriptions_table).await?;

    Ok(())
}

async fn create_table(
    db: &DatabaseConnection,
    backend: DatabaseBackend,
    mut statement: TableCreateStatement,
) -> StorageResult<()> {
    statement.if_not_exists();
    db.execute(backend.build(&statement))
        .await
        .map_err(crate::errors::StorageError::from_source)?;
    Ok(())
}
