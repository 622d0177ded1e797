//! Persisted calculations.
//!
//! A row stores the operation tag and the raw inputs next to the result that
//! was computed when the row was written.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Calculation, EngineError, Operation};

/// A calculation owned by a user, as stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredCalculation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub operation: Operation,
    pub inputs: Value,
    pub result: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCalculation {
    /// Rebuild the calculation from the stored tag and inputs.
    pub fn calculation(&self) -> Calculation {
        Calculation::new(self.operation, self.inputs.clone())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "calculations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub inputs: Json,
    pub result: Option<f64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn evaluated(
        user_id: Uuid,
        calculation: &Calculation,
        result: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            kind: ActiveValue::Set(calculation.operation().as_str().to_string()),
            inputs: ActiveValue::Set(calculation.inputs().clone()),
            result: ActiveValue::Set(Some(result)),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}

impl TryFrom<Model> for StoredCalculation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let parse = |value: &str| {
            Uuid::parse_str(value)
                .map_err(|_| EngineError::KeyNotFound("Calculation not found.".to_string()))
        };
        Ok(Self {
            id: parse(&model.id)?,
            user_id: parse(&model.user_id)?,
            operation: Operation::try_from(model.kind.as_str())?,
            inputs: model.inputs,
            result: model.result,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
