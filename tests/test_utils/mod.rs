//! Shared helpers for integration tests.
//!
//! Each test gets its own file-backed SQLite database with all migrations
//! applied, plus an app router built from a config whose provider base URLs
//! can point at a wiremock server.

use anyhow::Result;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use pressrelay::config::AppConfig;
use pressrelay::repositories::membership::MembershipRepository;
use pressrelay::server::{AppState, create_app};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const STATE_SECRET: &str = "test-state-secret";
pub const INTERNAL_TOKEN: &str = "test-internal-token";
pub const OPERATOR_TOKEN: &str = "test-operator-token";

/// A migrated SQLite database; the tempdir must outlive the connection.
pub struct TestDb {
    pub conn: DatabaseConnection,
    _dir: tempfile::TempDir,
}

#[allow(dead_code)]
pub async fn setup_test_db() -> Result<TestDb> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("pressrelay-test.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let conn = Database::connect(&url).await?;
    Migrator::up(&conn, None).await?;

    Ok(TestDb { conn, _dir: dir })
}

/// Baseline configuration with every secret set; tests override provider
/// base URLs and webhook URLs as needed.
#[allow(dead_code)]
pub fn base_config() -> AppConfig {
    AppConfig {
        auth_jwt_secret: Some(JWT_SECRET.to_string()),
        state_secret: Some(STATE_SECRET.to_string()),
        crypto_key: Some(vec![7u8; 32]),
        internal_api_token: Some(INTERNAL_TOKEN.to_string()),
        operator_tokens: vec![OPERATOR_TOKEN.to_string()],
        gmail_client_id: Some("test-gmail-client".to_string()),
        gmail_client_secret: Some("test-gmail-secret".to_string()),
        meta_app_id: Some("test-meta-app".to_string()),
        meta_app_secret: Some("test-meta-secret".to_string()),
        frontend_base_url: "https://app.pressrelay.test".to_string(),
        ..AppConfig::default()
    }
}

#[allow(dead_code)]
pub fn build_app(config: AppConfig, db: DatabaseConnection) -> Router {
    let state = AppState::new(config, db).expect("app state should build");
    create_app(state)
}

/// Mint a bearer token the way the identity service would.
#[allow(dead_code)]
pub fn mint_jwt(user_id: Uuid) -> String {
    let claims = serde_json::json!({
        "sub": user_id.to_string(),
        "email": "tester@example.com",
        "exp": (chrono::Utc::now().timestamp() + 3600) as usize,
    });
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("jwt encoding should succeed")
}

#[allow(dead_code)]
pub async fn seed_membership(db: &DatabaseConnection, user_id: Uuid, organization_id: Uuid) {
    MembershipRepository::new(Arc::new(db.clone()))
        .add_member(user_id, organization_id, "member")
        .await
        .expect("membership seed should succeed");
}

/// POST a JSON body with an optional bearer token; returns status and parsed
/// response body.
#[allow(dead_code)]
pub async fn post_json(
    app: &Router,
    path: &str,
    bearer: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = builder
        .body(Body::from(body.to_string()))
        .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should complete");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// GET a path; returns the full response for header assertions.
#[allow(dead_code)]
pub async fn get_response(
    app: &Router,
    path: &str,
    bearer: Option<&str>,
) -> axum::response::Response {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).expect("request should build"))
        .await
        .expect("request should complete")
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
