use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A request body that is well formed JSON but breaks a schema rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SchemaError(pub String);

impl SchemaError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

pub mod user {
    use super::*;

    const MAX_NAME_LEN: usize = 50;
    const MIN_USERNAME_LEN: usize = 3;
    const MIN_PASSWORD_LEN: usize = 6;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserCreate {
        pub first_name: String,
        pub last_name: String,
        pub email: String,
        pub username: String,
        pub password: String,
        pub confirm_password: String,
    }

    impl UserCreate {
        pub fn validate(&self) -> Result<(), SchemaError> {
            check_len("first_name", &self.first_name, 1)?;
            check_len("last_name", &self.last_name, 1)?;
            check_len("username", &self.username, MIN_USERNAME_LEN)?;
            check_email(&self.email)?;
            if self.password.chars().count() < MIN_PASSWORD_LEN {
                return Err(SchemaError::new(
                    "Password must be at least 6 characters long",
                ));
            }
            if self.password != self.confirm_password {
                return Err(SchemaError::new("Passwords do not match"));
            }
            Ok(())
        }
    }

    fn check_len(field: &str, value: &str, min: usize) -> Result<(), SchemaError> {
        let len = value.trim().chars().count();
        if len < min || len > MAX_NAME_LEN {
            return Err(SchemaError::new(format!(
                "{field} must be between {min} and {MAX_NAME_LEN} characters"
            )));
        }
        Ok(())
    }

    fn check_email(email: &str) -> Result<(), SchemaError> {
        let valid = match email.trim().split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
        if !valid {
            return Err(SchemaError::new("value is not a valid email address"));
        }
        Ok(())
    }

    /// JSON login. `username` may also be the email.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserLogin {
        pub username: String,
        pub password: String,
    }

    /// OAuth2 password-flow form used by `/auth/token`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenForm {
        pub username: String,
        pub password: String,
        pub grant_type: Option<String>,
        pub scope: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserResponse {
        pub id: Uuid,
        pub username: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub is_active: bool,
        pub is_verified: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenResponse {
        pub access_token: String,
        pub refresh_token: String,
        pub token_type: String,
        pub expires_at: DateTime<Utc>,
        pub user_id: Uuid,
        pub username: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub is_active: bool,
        pub is_verified: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccessToken {
        pub access_token: String,
        pub token_type: String,
    }
}

pub mod calculation {
    use serde_json::Value;

    use super::*;

    /// Operation tags accepted by the API, sorted.
    pub const CALCULATION_TYPES: [&str; 6] = [
        "addition",
        "division",
        "exponentiation",
        "modulo",
        "multiplication",
        "subtraction",
    ];

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CalculationCreate {
        #[serde(rename = "type")]
        pub kind: String,
        pub inputs: Value,
    }

    impl CalculationCreate {
        pub fn validate(&self) -> Result<(), SchemaError> {
            check_type(&self.kind)?;
            check_inputs(&self.inputs)
        }
    }

    /// Partial update: absent fields keep their stored value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CalculationUpdate {
        #[serde(rename = "type", default)]
        pub kind: Option<String>,
        #[serde(default)]
        pub inputs: Option<Value>,
    }

    impl CalculationUpdate {
        pub fn validate(&self) -> Result<(), SchemaError> {
            if let Some(kind) = &self.kind {
                check_type(kind)?;
            }
            if let Some(inputs) = &self.inputs {
                check_inputs(inputs)?;
            }
            Ok(())
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CalculationResponse {
        pub id: Uuid,
        pub user_id: Uuid,
        #[serde(rename = "type")]
        pub kind: String,
        pub inputs: Value,
        pub result: Option<f64>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    fn check_type(kind: &str) -> Result<(), SchemaError> {
        if !CALCULATION_TYPES.contains(&kind.to_lowercase().as_str()) {
            return Err(SchemaError::new(format!(
                "Type must be one of: {}",
                CALCULATION_TYPES.join(", ")
            )));
        }
        Ok(())
    }

    fn check_inputs(inputs: &Value) -> Result<(), SchemaError> {
        let Some(items) = inputs.as_array() else {
            return Err(SchemaError::new("Input should be a valid list"));
        };
        if items.iter().any(|item| !item.is_number()) {
            return Err(SchemaError::new("Input should be a valid number"));
        }
        if items.len() < 2 {
            return Err(SchemaError::new(
                "At least two numbers are required for calculation",
            ));
        }
        Ok(())
    }

}
