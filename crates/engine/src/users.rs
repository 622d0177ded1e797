//! Registered users.
//!
//! Calculations reference their owner through `users.id`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, password};

/// Data required to register a new user. The password is in clear text and
/// is hashed by the engine before it is stored.
#[derive(Clone, Debug)]
pub struct UserNew {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// A registered user, without credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub username: String,
    pub password: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub last_login: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::calculations::Entity")]
    Calculations,
}

impl Related<super::calculations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Calculations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub(crate) fn verify_password(&self, password: &str) -> bool {
        password::verify_password(password, &self.password)
    }
}

impl ActiveModel {
    /// Active model for a freshly registered user. `new.password` must
    /// already be hashed.
    pub(crate) fn registered(new: UserNew, now: DateTime<Utc>) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            first_name: ActiveValue::Set(new.first_name),
            last_name: ActiveValue::Set(new.last_name),
            email: ActiveValue::Set(new.email),
            username: ActiveValue::Set(new.username),
            password: ActiveValue::Set(new.password),
            is_active: ActiveValue::Set(true),
            is_verified: ActiveValue::Set(false),
            last_login: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("user not found".to_string()))?,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            username: model.username,
            is_active: model.is_active,
            is_verified: model.is_verified,
            last_login: model.last_login,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
