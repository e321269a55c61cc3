//! Token refresh manager integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pressrelay::crypto::TokenCipher;
use pressrelay::providers::google::GoogleClient;
use pressrelay::repositories::gmail_connection::GmailConnectionRepository;
use pressrelay::token_refresh::TokenRefreshManager;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod test_utils;
use test_utils::*;

fn repository(db: &sea_orm::DatabaseConnection) -> GmailConnectionRepository {
    let cipher = TokenCipher::new(Some(vec![7u8; 32])).unwrap();
    GmailConnectionRepository::new(Arc::new(db.clone()), cipher)
}

fn manager(
    repo: GmailConnectionRepository,
    token_base: &str,
) -> TokenRefreshManager {
    let mut config = base_config();
    config.google_token_base = token_base.to_string();
    let google = GoogleClient::from_config(&config).unwrap();
    TokenRefreshManager::new(repo, google, Duration::from_secs(300))
}

#[tokio::test]
async fn fresh_token_is_returned_without_network() {
    let db = setup_test_db().await.unwrap();
    let repo = repository(&db.conn);
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();

    repo.upsert(
        org_id,
        user_id,
        "mailbox@example.com",
        "stored-access",
        "stored-refresh",
        Utc::now() + chrono::Duration::minutes(10),
    )
    .await
    .unwrap();

    // No mock mounted: any network call would fail the test.
    let google = MockServer::start().await;
    let manager = manager(repo, &google.uri());

    let token = manager.get_valid_token(user_id, Some(org_id)).await.unwrap();

    assert_eq!(token.access_token, "stored-access");
    assert_eq!(google.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn token_inside_safety_margin_is_refreshed() {
    let db = setup_test_db().await.unwrap();
    let repo = repository(&db.conn);
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();

    repo.upsert(
        org_id,
        user_id,
        "mailbox@example.com",
        "stale-access",
        "stored-refresh",
        Utc::now() + chrono::Duration::minutes(4),
    )
    .await
    .unwrap();

    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "refreshed-access",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&google)
        .await;

    let manager = manager(repo.clone(), &google.uri());
    let token = manager.get_valid_token(user_id, Some(org_id)).await.unwrap();

    assert_eq!(token.access_token, "refreshed-access");

    // The refreshed token must be durable.
    let stored = repo
        .find_active_for_user(user_id, Some(org_id))
        .await
        .unwrap()
        .unwrap();
    let (access, refresh) = repo.decrypt_tokens(&stored).unwrap();
    assert_eq!(access, "refreshed-access");
    assert_eq!(refresh, "stored-refresh");
    assert!(stored.expires_at > (Utc::now() + chrono::Duration::minutes(30)));
}

#[tokio::test]
async fn invalid_grant_soft_revokes_the_connection() {
    let db = setup_test_db().await.unwrap();
    let repo = repository(&db.conn);
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();

    repo.upsert(
        org_id,
        user_id,
        "mailbox@example.com",
        "stale-access",
        "revoked-refresh",
        Utc::now() - chrono::Duration::minutes(1),
    )
    .await
    .unwrap();

    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked.",
        })))
        .expect(1)
        .mount(&google)
        .await;

    let manager = manager(repo.clone(), &google.uri());
    let err = manager
        .get_valid_token(user_id, Some(org_id))
        .await
        .unwrap_err();

    assert_eq!(err.code, Box::from("REFRESH_TOKEN_REVOKED"));

    // The connection survives as an inactive row.
    assert!(
        repo.find_active_for_user(user_id, Some(org_id))
            .await
            .unwrap()
            .is_none()
    );

    // Follow-up requests see "not connected", not a retry loop.
    let err = manager
        .get_valid_token(user_id, Some(org_id))
        .await
        .unwrap_err();
    assert_eq!(err.code, Box::from("GMAIL_NOT_CONNECTED"));
}

#[tokio::test]
async fn transient_refresh_failure_keeps_connection_active() {
    let db = setup_test_db().await.unwrap();
    let repo = repository(&db.conn);
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();

    repo.upsert(
        org_id,
        user_id,
        "mailbox@example.com",
        "stale-access",
        "stored-refresh",
        Utc::now() - chrono::Duration::minutes(1),
    )
    .await
    .unwrap();

    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "temporarily_unavailable",
            "error_description": "Backend error",
        })))
        .mount(&google)
        .await;

    let manager = manager(repo.clone(), &google.uri());
    let err = manager
        .get_valid_token(user_id, Some(org_id))
        .await
        .unwrap_err();

    assert_eq!(err.code, Box::from("TOKEN_REFRESH_FAILED"));

    // A provider hiccup must not revoke anything.
    assert!(
        repo.find_active_for_user(user_id, Some(org_id))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn missing_connection_is_not_found() {
    let db = setup_test_db().await.unwrap();
    let repo = repository(&db.conn);

    let google = MockServer::start().await;
    let manager = manager(repo, &google.uri());

    let err = manager
        .get_valid_token(Uuid::new_v4(), None)
        .await
        .unwrap_err();

    assert_eq!(err.code, Box::from("GMAIL_NOT_CONNECTED"));
    assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
}
