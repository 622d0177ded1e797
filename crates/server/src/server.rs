use api_types::Health;
use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use std::sync::Arc;

use crate::{
    ServerError,
    auth::{TokenKeys, TokenType},
    calculations, user,
};
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub tokens: Arc<TokenKeys>,
}

fn unauthorized() -> ServerError {
    ServerError::Unauthorized("Could not validate credentials".to_string())
}

/// Resolve the bearer token to an active user and expose it to handlers as
/// `Extension<engine::User>`.
async fn auth(
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Ok(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(unauthorized());
    };
    let user_id = state
        .tokens
        .verify(bearer.token(), TokenType::Access)
        .ok_or_else(unauthorized)?;

    let user = match state.engine.user(user_id).await {
        Ok(user) => user,
        Err(EngineError::KeyNotFound(_)) => return Err(unauthorized()),
        Err(err) => return Err(err.into()),
    };
    if !user.is_active {
        return Err(ServerError::Unauthorized("Inactive user".to_string()));
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route(
            "/calculations",
            get(calculations::list).post(calculations::create),
        )
        .route(
            "/calculations/{id}",
            get(calculations::get)
                .put(calculations::update)
                .delete(calculations::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(user::register))
        .route("/auth/login", post(user::login))
        .route("/auth/token", post(user::token))
        .merge(protected)
        .with_state(state)
}

/// Build the application router without binding a listener.
pub fn app(engine: Engine, tokens: TokenKeys) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
        tokens: Arc::new(tokens),
    })
}

pub async fn run_with_listener(
    engine: Engine,
    tokens: TokenKeys,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine, tokens)).await
}
