//! Registration and login endpoints.

use api_types::user::{AccessToken, TokenForm, TokenResponse, UserCreate, UserLogin, UserResponse};
use axum::{Form, Json, extract::State, http::StatusCode};
use axum_extra::extract::WithRejection;
use engine::{User, UserNew};

use crate::{ServerError, auth::TokenType, server::ServerState};

const BEARER: &str = "bearer";

fn invalid_credentials() -> ServerError {
    ServerError::Unauthorized("Invalid username or password".to_string())
}

fn to_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_active: user.is_active,
        is_verified: user.is_verified,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

/// Handle requests for registering a new user
pub async fn register(
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<UserCreate>, ServerError>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
    payload.validate()?;

    let user = state
        .engine
        .register_user(UserNew {
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            email: payload.email,
            username: payload.username,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(user))))
}

async fn authenticate(
    state: &ServerState,
    username: &str,
    password: &str,
) -> Result<User, ServerError> {
    state
        .engine
        .authenticate(username, password)
        .await?
        .ok_or_else(invalid_credentials)
}

/// Handle JSON login, returning both tokens and the user profile
pub async fn login(
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<UserLogin>, ServerError>,
) -> Result<Json<TokenResponse>, ServerError> {
    let user = authenticate(&state, &payload.username, &payload.password).await?;
    let access = state.tokens.issue(user.id, TokenType::Access)?;
    let refresh = state.tokens.issue(user.id, TokenType::Refresh)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(TokenResponse {
        access_token: access.token,
        refresh_token: refresh.token,
        token_type: BEARER.to_string(),
        expires_at: access.expires_at,
        user_id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_active: user.is_active,
        is_verified: user.is_verified,
    }))
}

/// Handle OAuth2 password-flow login from a form body
pub async fn token(
    State(state): State<ServerState>,
    WithRejection(Form(form), _): WithRejection<Form<TokenForm>, ServerError>,
) -> Result<Json<AccessToken>, ServerError> {
    let user = authenticate(&state, &form.username, &form.password).await?;
    let access = state.tokens.issue(user.id, TokenType::Access)?;

    Ok(Json(AccessToken {
        access_token: access.token,
        token_type: BEARER.to_string(),
    }))
}
