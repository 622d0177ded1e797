use chrono::Utc;
use sea_orm::{ActiveValue, Condition, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, User, UserNew, password, users};

use super::{Engine, conflict_or_db, normalize_identifier, with_tx};

const MIN_PASSWORD_LEN: usize = 6;
const DUPLICATE_USER: &str = "Username or email already exists";

impl Engine {
    /// Register a new user.
    ///
    /// Fails with `InvalidInput` when the password is shorter than six
    /// characters and with `ExistingKey` when the username or the email is
    /// already taken.
    pub async fn register_user(&self, new: UserNew) -> ResultEngine<User> {
        if new.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EngineError::InvalidInput(
                "Password must be at least 6 characters long".to_string(),
            ));
        }
        let username = normalize_identifier(&new.username, "username")?;
        let email = normalize_identifier(&new.email, "email")?;
        let password = password::hash_password(&new.password)
            .map_err(|err| EngineError::PasswordHash(err.to_string()))?;

        let model = with_tx!(self, |db_tx| {
            let existing = users::Entity::find()
                .filter(
                    Condition::any()
                        .add(users::Column::Email.eq(email.clone()))
                        .add(users::Column::Username.eq(username.clone())),
                )
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(DUPLICATE_USER.to_string()));
            }

            let user = users::ActiveModel::registered(
                UserNew {
                    username,
                    email,
                    password,
                    ..new
                },
                Utc::now(),
            );
            user.insert(&db_tx)
                .await
                .map_err(|err| conflict_or_db(err, DUPLICATE_USER))
        })?;

        tracing::info!(user_id = %model.id, "registered user {}", model.username);
        User::try_from(model)
    }

    /// Authenticate by username or email.
    ///
    /// Returns `Ok(None)` when no user matches or the password is wrong. On
    /// success `last_login` is updated.
    pub async fn authenticate(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> ResultEngine<Option<User>> {
        let Ok(login) = normalize_identifier(username_or_email, "username") else {
            return Ok(None);
        };

        with_tx!(self, |db_tx| {
            let user = users::Entity::find()
                .filter(
                    Condition::any()
                        .add(users::Column::Username.eq(login.clone()))
                        .add(users::Column::Email.eq(login.clone())),
                )
                .one(&db_tx)
                .await?;

            let Some(user) = user.filter(|user| user.verify_password(password)) else {
                tracing::debug!("failed login for {login}");
                return Ok(None);
            };

            let mut user: users::ActiveModel = user.into();
            user.last_login = ActiveValue::Set(Some(Utc::now()));
            let user = user.update(&db_tx).await?;

            User::try_from(user).map(Some)
        })
    }

    /// Load a user by id.
    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        users::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not found".to_string()))
            .and_then(User::try_from)
    }
}
