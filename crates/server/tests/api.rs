use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::TimeDelta;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use server::{TokenKeys, TokenType};
use tower::ServiceExt;
use uuid::Uuid;

fn keys() -> TokenKeys {
    TokenKeys::new("test-secret", TimeDelta::minutes(30), TimeDelta::days(7))
}

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder()
        .database(db)
        .build()
        .await
        .unwrap();
    server::app(engine, keys())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let res = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn registration(username: &str) -> Value {
    json!({
        "first_name": "Jane",
        "last_name": "Doe",
        "email": format!("{username}@example.com"),
        "username": username,
        "password": "SecurePass123!",
        "confirm_password": "SecurePass123!",
    })
}

/// Register `username` and return an access token.
async fn login_as(app: &Router, username: &str) -> String {
    let (status, _) = send(app, "POST", "/auth/register", None, Some(registration(username))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": username, "password": "SecurePass123!"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn register_returns_profile_without_password() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/auth/register", None, Some(registration("jane"))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "jane");
    assert_eq!(body["email"], "jane@example.com");
    assert_eq!(body["is_active"], true);
    assert_eq!(body["is_verified"], false);
    assert!(body.get("password").is_none());
    assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = app().await;
    send(&app, "POST", "/auth/register", None, Some(registration("jane"))).await;
    let (status, body) = send(&app, "POST", "/auth/register", None, Some(registration("jane"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username or email already exists");
}

#[tokio::test]
async fn mismatched_passwords_fail_schema() {
    let app = app().await;
    let mut payload = registration("jane");
    payload["confirm_password"] = json!("Different123!");
    let (status, body) = send(&app, "POST", "/auth/register", None, Some(payload)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "Passwords do not match");
}

#[tokio::test]
async fn login_returns_tokens_and_profile() {
    let app = app().await;
    send(&app, "POST", "/auth/register", None, Some(registration("jane"))).await;
    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "jane@example.com", "password": "SecurePass123!"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["username"], "jane");
    let user_id = Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap();
    let access = body["access_token"].as_str().unwrap();
    let refresh = body["refresh_token"].as_str().unwrap();
    assert_eq!(keys().verify(access, TokenType::Access), Some(user_id));
    assert_eq!(keys().verify(refresh, TokenType::Refresh), Some(user_id));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = app().await;
    send(&app, "POST", "/auth/register", None, Some(registration("jane"))).await;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": "jane", "password": "WrongPass123!"}).to_string(),
        ))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn token_form_login_returns_access_token() {
    let app = app().await;
    send(&app, "POST", "/auth/register", None, Some(registration("jane"))).await;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=jane&password=SecurePass123%21"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap();
    let (status, _) = send(&app, "GET", "/calculations", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn calculations_require_bearer_token() {
    let app = app().await;

    let (status, _) = send(&app, "GET", "/calculations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/calculations", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_cannot_be_used_as_bearer() {
    let app = app().await;
    send(&app, "POST", "/auth/register", None, Some(registration("jane"))).await;
    let (_, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "jane", "password": "SecurePass123!"})),
    )
    .await;
    let refresh = body["refresh_token"].as_str().unwrap();

    let (status, _) = send(&app, "GET", "/calculations", Some(refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_calculation_stores_result() {
    let app = app().await;
    let token = login_as(&app, "jane").await;

    let (status, body) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "Exponentiation", "inputs": [2, 3, 2]})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "exponentiation");
    assert_eq!(body["inputs"], json!([2, 3, 2]));
    assert_eq!(body["result"], 512.0);
    assert!(body["created_at"].is_string());
    assert!(body["updated_at"].is_string());
}

#[tokio::test]
async fn division_by_zero_is_bad_request() {
    let app = app().await;
    let token = login_as(&app, "jane").await;

    let (status, body) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "division", "inputs": [50, 0, 5]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Cannot divide by zero.");
}

#[tokio::test]
async fn request_schema_rejects_unknown_type_and_short_inputs() {
    let app = app().await;
    let token = login_as(&app, "jane").await;

    let (status, body) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "modulus", "inputs": [10, 3]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().starts_with("Type must be one of"));

    let (status, body) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "addition", "inputs": [5]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "At least two numbers are required for calculation");
}

#[tokio::test]
async fn read_update_delete_calculation() {
    let app = app().await;
    let token = login_as(&app, "jane").await;

    let (_, created) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "addition", "inputs": [1, 2, 3]})),
    )
    .await;
    let uri = format!("/calculations/{}", created["id"].as_str().unwrap());

    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 6.0);

    let (status, body) = send(&app, "GET", "/calculations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({"type": "multiplication", "inputs": [42, 7]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "multiplication");
    assert_eq!(body["result"], 294.0);
    assert_eq!(body["created_at"], created["created_at"]);

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Calculation not found.");
}

#[tokio::test]
async fn calculations_are_scoped_to_their_owner() {
    let app = app().await;
    let jane = login_as(&app, "jane").await;
    let john = login_as(&app, "john").await;

    let (_, created) = send(
        &app,
        "POST",
        "/calculations",
        Some(&jane),
        Some(json!({"type": "subtraction", "inputs": [20, 5, 3]})),
    )
    .await;
    let uri = format!("/calculations/{}", created["id"].as_str().unwrap());

    let (status, _) = send(&app, "GET", &uri, Some(&john), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&john), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, "GET", "/calculations", Some(&john), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn malformed_calculation_id_is_bad_request() {
    let app = app().await;
    let token = login_as(&app, "jane").await;

    let (status, body) = send(&app, "GET", "/calculations/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid calculation id format.");

    let uri = format!("/calculations/{}", Uuid::new_v4());
    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn modulo_calculation_is_supported() {
    let app = app().await;
    let token = login_as(&app, "jane").await;

    let (status, body) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "modulo", "inputs": [10, 3]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "modulo");
    assert_eq!(body["result"], 1.0);

    let (status, body) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "modulo", "inputs": [10, 0]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Cannot perform modulo by zero.");
}

#[tokio::test]
async fn non_finite_result_is_not_stored() {
    let app = app().await;
    let token = login_as(&app, "jane").await;

    let (status, body) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "exponentiation", "inputs": [-8, 0.5]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Result is not a finite number.");

    let (_, body) = send(&app, "GET", "/calculations", Some(&token), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn unreadable_bodies_get_detail_responses() {
    let app = app().await;
    let token = login_as(&app, "jane").await;

    let (status, body) = send(
        &app,
        "POST",
        "/calculations",
        Some(&token),
        Some(json!({"type": "addition"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("inputs"));

    let req = Request::builder()
        .method("POST")
        .uri("/calculations")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["detail"].is_string());

    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .body(Body::from("username=jane"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["detail"].is_string());

    let req = Request::builder()
        .method("POST")
        .uri("/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=jane"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
