use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use subgate_domain::model::{NewPlan, PlanId, PlanRecord};
use subgate_domain::storage::{PlanStore, StorageResult};

use crate::entity::plans;
use crate::errors::StorageError;
use crate::SeaOrmStorage;

#[async_trait::async_trait]
impl PlanStore for SeaOrmStorage {
    async fn insert_plan(&self, plan: NewPlan) -> StorageResult<PlanRecord> {
        let model = plans::ActiveModel {
            name: Set(plan.name),
            price: Set(plan.price),
            duration_days: Set(plan.duration_days as i32),
            description: Set(plan.description),
            ..Default::default()
        };
        let created = model
            .insert(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(plan_to_record(created))
    }

    async fn find_plan(&self, id: PlanId) -> StorageResult<Option<PlanRecord>> {
        let maybe = plans::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(maybe.map(plan_to_record))
    }

    async fn list_plans(&self) -> StorageResult<Vec<PlanRecord>> {
        let models = plans::Entity::find()
            .all(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(models.into_iter().map(plan_to_record).collect())
    }
}

pub(crate) fn plan_to_record(model: plans::Model) -> PlanRecord {
    PlanRecord {
        id: model.id,
        name: model.name,
        price: model.price,
        duration_days: model.duration_days.unsigned_abs(),
        description: model.description,
    }
}
