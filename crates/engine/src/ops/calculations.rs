use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde_json::Value;
use uuid::Uuid;

use crate::{Calculation, EngineError, ResultEngine, StoredCalculation, calculations, users};

use super::{Engine, with_tx};

const NOT_FOUND: &str = "Calculation not found.";

impl Engine {
    /// Evaluate a calculation and store it for `user_id`.
    ///
    /// Nothing is stored when the operation is unknown or the inputs are
    /// rejected.
    pub async fn new_calculation(
        &self,
        user_id: Uuid,
        operation: &str,
        inputs: Value,
    ) -> ResultEngine<StoredCalculation> {
        let calculation = Calculation::create(operation, inputs)?;
        let result = calculation.get_result()?;

        let model = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            calculations::ActiveModel::evaluated(user_id, &calculation, result, Utc::now())
                .insert(&db_tx)
                .await
                .map_err(EngineError::from)
        })?;

        tracing::debug!(
            calculation_id = %model.id,
            "stored {} = {result}",
            calculation.operation()
        );
        StoredCalculation::try_from(model)
    }

    /// Load one of the user's calculations.
    pub async fn calculation(
        &self,
        calculation_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<StoredCalculation> {
        calculations::Entity::find_by_id(calculation_id.to_string())
            .filter(calculations::Column::UserId.eq(user_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(NOT_FOUND.to_string()))
            .and_then(StoredCalculation::try_from)
    }

    /// List the user's calculations, newest first.
    pub async fn list_calculations(&self, user_id: Uuid) -> ResultEngine<Vec<StoredCalculation>> {
        calculations::Entity::find()
            .filter(calculations::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(calculations::Column::CreatedAt)
            .order_by_asc(calculations::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(StoredCalculation::try_from)
            .collect()
    }

    /// Replace the operation and/or the inputs of a calculation and
    /// re-evaluate it. Fields left as `None` keep their stored value.
    pub async fn update_calculation(
        &self,
        calculation_id: Uuid,
        user_id: Uuid,
        operation: Option<&str>,
        inputs: Option<Value>,
    ) -> ResultEngine<StoredCalculation> {
        let model = with_tx!(self, |db_tx| {
            let current = self
                .require_calculation(&db_tx, calculation_id, user_id)
                .await?;

            let operation = operation.unwrap_or(current.kind.as_str());
            let inputs = inputs.unwrap_or_else(|| current.inputs.clone());
            let calculation = Calculation::create(operation, inputs)?;
            let result = calculation.get_result()?;

            let mut model: calculations::ActiveModel = current.into();
            model.kind = ActiveValue::Set(calculation.operation().as_str().to_string());
            model.inputs = ActiveValue::Set(calculation.inputs().clone());
            model.result = ActiveValue::Set(Some(result));
            model.updated_at = ActiveValue::Set(Utc::now());
            model.update(&db_tx).await.map_err(EngineError::from)
        })?;

        StoredCalculation::try_from(model)
    }

    /// Delete one of the user's calculations.
    pub async fn delete_calculation(&self, calculation_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let current = self
                .require_calculation(&db_tx, calculation_id, user_id)
                .await?;
            current.delete(&db_tx).await?;
            tracing::debug!(%calculation_id, "deleted calculation");
            Ok(())
        })
    }

    async fn require_user(&self, db: &DatabaseTransaction, user_id: Uuid) -> ResultEngine<()> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .map(|_| ())
            .ok_or_else(|| EngineError::KeyNotFound("user not found".to_string()))
    }

    async fn require_calculation(
        &self,
        db: &DatabaseTransaction,
        calculation_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<calculations::Model> {
        calculations::Entity::find_by_id(calculation_id.to_string())
            .filter(calculations::Column::UserId.eq(user_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(NOT_FOUND.to_string()))
    }
}
