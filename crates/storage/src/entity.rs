pub mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub telegram_chat_id: Option<i64>,
        pub first_name: String,
        pub is_subscribed: bool,
        pub created_at: DateTimeUtc,
        pub updated_at: DateTimeUtc,
    }

    #[derive(Debug, Clone, Copy, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod plans {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "plans")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub price: Decimal,
        pub duration_days: i32,
        pub description: String,
    }

    #[derive(Debug, Clone, Copy, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod payments {
    use sea_orm::entity::prelude::*;
    use subgate_domain::model::{PaymentMethod, PaymentStatus};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "payments")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub user_id: i64,
        pub plan_id: i64,
        pub amount: Decimal,
        pub method: PaymentMethodDb,
        pub status: PaymentStatusDb,
        pub screenshot: Option<String>,
        pub created_at: DateTimeUtc,
        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
    #[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
    pub enum PaymentMethodDb {
        #[sea_orm(string_value = "CARD")]
        Card,
        #[sea_orm(string_value = "TRANSFER")]
        Transfer,
        #[sea_orm(string_value = "CRYPTO")]
        Crypto,
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
    #[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
    pub enum PaymentStatusDb {
        #[sea_orm(string_value = "PENDING")]
        Pending,
        #[sea_orm(string_value = "COMPLETED")]
        Completed,
        #[sea_orm(string_value = "FAILED")]
        Failed,
        #[sea_orm(string_value = "CANCELLED")]
        Cancelled,
    }

    impl From<PaymentMethod> for PaymentMethodDb {
        fn from(value: PaymentMethod) -> Self {
            match value {
                PaymentMethod::Card => Self::Card,
                PaymentMethod::Transfer => Self::Transfer,
                PaymentMethod::Crypto => Self::Crypto,
            }
        }
    }

    impl From<PaymentMethodDb> for PaymentMethod {
        fn from(value: PaymentMethodDb) -> Self {
            match value {
                PaymentMethodDb::Card => Self::Card,
                PaymentMethodDb::Transfer => Self::Transfer,
                PaymentMethodDb::Crypto => Self::Crypto,
            }
        }
    }

    impl From<PaymentStatus> for PaymentStatusDb {
        fn from(value: PaymentStatus) -> Self {
            match value {
                PaymentStatus::Pending => Self::Pending,
                PaymentStatus::Completed => Self::Completed,
                PaymentStatus::Failed => Self::Failed,
                PaymentStatus::Cancelled => Self::Cancelled,
            }
        }
    }

    impl From<PaymentStatusDb> for PaymentStatus {
        fn from(value: PaymentStatusDb) -> Self {
            match value {
                PaymentStatusDb::Pending => Self::Pending,
                PaymentStatusDb::Completed => Self::Completed,
                PaymentStatusDb::Failed => Self::Failed,
                PaymentStatusDb::Cancelled => Self::Cancelled,
            }
        }
    }

    #[derive(Debug, Clone, Copy, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod subscriptions {
    use sea_orm::entity::prelude::*;
    use subgate_domain::model::SubscriptionStatus;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "subscriptions")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub user_id: i64,
        pub plan_id: i64,
        pub is_active: bool,
        pub status: SubscriptionStatusDb,
        pub start_at: DateTimeUtc,
        pub end_at: DateTimeUtc,
        pub created_at: DateTimeUtc,
        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
    #[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
    pub enum SubscriptionStatusDb {
        #[sea_orm(string_value = "pending")]
        Pending,
        #[sea_orm(string_value = "waiting_admin")]
        WaitingAdmin,
        #[sea_orm(string_value = "active")]
        Active,
        #[sea_orm(string_value = "expired")]
        Expired,
        #[sea_orm(string_value = "cancelled")]
        Cancelled,
        #[sea_orm(string_value = "rejected")]
        Rejected,
    }

    impl From<SubscriptionStatus> for SubscriptionStatusDb {
        fn from(value: SubscriptionStatus) -> Self {
            match value {
                SubscriptionStatus::Pending => Self::Pending,
                SubscriptionStatus::WaitingAdmin => Self::WaitingAdmin,
                SubscriptionStatus::Active => Self::Active,
                SubscriptionStatus::Expired => Self::Expired,
                SubscriptionStatus::Cancelled => Self::Cancelled,
                SubscriptionStatus::Rejected => Self::Rejected,
            }
        }
    }

    impl From<SubscriptionStatusDb> for SubscriptionStatus {
        fn from(value: SubscriptionStatusDb) -> Self {
            match value {
                SubscriptionStatusDb::Pending => Self::Pending,
                SubscriptionStatusDb::WaitingAdmin => Self::WaitingAdmin,
                SubscriptionStatusDb::Active => Self::Active,
                SubscriptionStatusDb::Expired => Self::Expired,
                SubscriptionStatusDb::Cancelled => Self::Cancelled,
                SubscriptionStatusDb::Rejected => Self::Rejected,
            }
        }
    }

    #[derive(Debug, Clone, Copy, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
