use api_types::{ErrorBody, SchemaError};
use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use engine::EngineError;

pub use auth::{TokenKeys, TokenType};
pub use server::{app, run_with_listener};

mod auth;
mod calculations;
mod server;
mod user;

pub enum ServerError {
    Engine(EngineError),
    Schema(SchemaError),
    Unauthorized(String),
    Internal(String),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Database(_) | EngineError::PasswordHash(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::Calculation(_) | EngineError::InvalidInput(_) | EngineError::ExistingKey(_) => {
            StatusCode::BAD_REQUEST
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::PasswordHash(detail) => {
            tracing::error!("password hashing failed: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, detail) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Schema(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            ServerError::Unauthorized(detail) => {
                let mut response = (StatusCode::UNAUTHORIZED, Json(ErrorBody { detail })).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                return response;
            }
            ServerError::Internal(err) => {
                tracing::error!("internal error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
            ServerError::Generic(detail) => (StatusCode::BAD_REQUEST, detail),
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<SchemaError> for ServerError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

/// Unreadable request bodies are reported like any other schema failure.
impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Schema(SchemaError(value.body_text()))
    }
}

impl From<FormRejection> for ServerError {
    fn from(value: FormRejection) -> Self {
        Self::Schema(SchemaError(value.body_text()))
    }
}

impl From<jsonwebtoken::errors::Error> for ServerError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::Internal(format!("token signing failed: {value}"))
    }
}
