//! OAuth initiation and callback integration tests.

use std::time::Duration;

use axum::http::StatusCode;
use pressrelay::models::gmail_connection::Entity as GmailConnection;
use pressrelay::state_token::StateCodec;
use sea_orm::EntityTrait;
use serde_json::json;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod test_utils;
use test_utils::*;

#[tokio::test]
async fn gmail_init_returns_verifiable_state() {
    let db = setup_test_db().await.unwrap();
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    seed_membership(&db.conn, user_id, org_id).await;

    let app = build_app(base_config(), db.conn.clone());
    let (status, body) = post_json(
        &app,
        "/auth/gmail/init",
        Some(&mint_jwt(user_id)),
        json!({ "organization_id": org_id.to_string() }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let auth_url = Url::parse(body["auth_url"].as_str().unwrap()).unwrap();
    assert_eq!(auth_url.host_str(), Some("accounts.google.com"));

    let query: std::collections::HashMap<_, _> = auth_url.query_pairs().collect();
    assert_eq!(query["access_type"], "offline");
    assert_eq!(query["prompt"], "consent");

    // The state must verify under the configured secret and bind the caller.
    let codec = StateCodec::new(
        STATE_SECRET.as_bytes().to_vec(),
        Duration::from_secs(600),
    );
    let payload = codec.verify(&query["state"]).unwrap();
    assert_eq!(payload.user_id, user_id);
    assert_eq!(payload.org_id, org_id);
}

#[tokio::test]
async fn validated_caller_carries_membership_role() {
    use axum::http::{HeaderMap, HeaderValue, header};
    use pressrelay::auth::validate_auth_and_org;
    use pressrelay::repositories::membership::MembershipRepository;
    use std::sync::Arc;

    let db = setup_test_db().await.unwrap();
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();

    let memberships = MembershipRepository::new(Arc::new(db.conn.clone()));
    memberships
        .add_member(user_id, org_id, "owner")
        .await
        .unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", mint_jwt(user_id))).unwrap(),
    );

    let (user, organization_id, role) = validate_auth_and_org(
        &base_config(),
        &memberships,
        &headers,
        &org_id.to_string(),
    )
    .await
    .unwrap();

    assert_eq!(user.id, user_id);
    assert_eq!(organization_id, org_id);
    assert_eq!(role, "owner");
}

#[tokio::test]
async fn init_rejects_non_member() {
    let db = setup_test_db().await.unwrap();
    let user_id = Uuid::new_v4();
    // No membership row seeded.

    let app = build_app(base_config(), db.conn.clone());
    let (status, body) = post_json(
        &app,
        "/auth/gmail/init",
        Some(&mint_jwt(user_id)),
        json!({ "organization_id": Uuid::new_v4().to_string() }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NOT_ORGANIZATION_MEMBER");
}

#[tokio::test]
async fn init_rejects_malformed_organization_id() {
    let db = setup_test_db().await.unwrap();
    let user_id = Uuid::new_v4();

    let app = build_app(base_config(), db.conn.clone());
    let (status, body) = post_json(
        &app,
        "/auth/meta/init",
        Some(&mint_jwt(user_id)),
        json!({ "organization_id": "marketing-team" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_ORGANIZATION_ID_FORMAT");
}

#[tokio::test]
async fn init_requires_bearer_token() {
    let db = setup_test_db().await.unwrap();
    let app = build_app(base_config(), db.conn.clone());

    let (status, body) = post_json(
        &app,
        "/auth/gmail/init",
        None,
        json!({ "organization_id": Uuid::new_v4().to_string() }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn init_without_provider_credentials_fails_before_any_network() {
    let db = setup_test_db().await.unwrap();
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    seed_membership(&db.conn, user_id, org_id).await;

    let mut config = base_config();
    config.gmail_client_id = None;
    config.gmail_client_secret = None;

    let app = build_app(config, db.conn.clone());
    let (status, body) = post_json(
        &app,
        "/auth/gmail/init",
        Some(&mint_jwt(user_id)),
        json!({ "organization_id": org_id.to_string() }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "OAUTH_NOT_CONFIGURED");
}

#[tokio::test]
async fn callback_provider_denial_redirects_without_writes() {
    let db = setup_test_db().await.unwrap();
    let app = build_app(base_config(), db.conn.clone());

    let response = get_response(
        &app,
        "/auth/gmail/callback?error=access_denied&error_description=User%20denied%20access",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("https://app.pressrelay.test/integrations"));
    assert!(location.contains("error="));

    let connections = GmailConnection::find().all(&db.conn).await.unwrap();
    assert!(connections.is_empty());
}

#[tokio::test]
async fn callback_rejects_forged_state() {
    let db = setup_test_db().await.unwrap();
    let app = build_app(base_config(), db.conn.clone());

    // Signed under a different secret, so the signature cannot match.
    let forged = StateCodec::new(b"attacker-secret".to_vec(), Duration::from_secs(600))
        .issue(Uuid::new_v4(), Uuid::new_v4())
        .unwrap();

    let response = get_response(
        &app,
        &format!("/auth/gmail/callback?code=abc&state={}", forged),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.contains("Security"));

    let connections = GmailConnection::find().all(&db.conn).await.unwrap();
    assert!(connections.is_empty());
}

#[tokio::test]
async fn callback_rejects_missing_code() {
    let db = setup_test_db().await.unwrap();
    let app = build_app(base_config(), db.conn.clone());

    let codec = StateCodec::new(STATE_SECRET.as_bytes().to_vec(), Duration::from_secs(600));
    let state = codec.issue(Uuid::new_v4(), Uuid::new_v4()).unwrap();

    let response = get_response(&app, &format!("/auth/gmail/callback?state={}", state), None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.contains("Missing"));
}

#[tokio::test]
async fn gmail_callback_happy_path_stores_encrypted_connection() {
    let db = setup_test_db().await.unwrap();
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    seed_membership(&db.conn, user_id, org_id).await;

    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh-access",
            "refresh_token": "1//refresh-token",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&google)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v2/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "mailbox@example.com",
        })))
        .expect(1)
        .mount(&google)
        .await;

    let mut config = base_config();
    config.google_token_base = google.uri();
    config.google_api_base = google.uri();

    let app = build_app(config, db.conn.clone());

    let codec = StateCodec::new(STATE_SECRET.as_bytes().to_vec(), Duration::from_secs(600));
    let state = codec.issue(user_id, org_id).unwrap();

    let response = get_response(
        &app,
        &format!("/auth/gmail/callback?code=auth-code&state={}", state),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.contains("success=pending"));
    assert!(location.contains("connection_id="));

    let connections = GmailConnection::find().all(&db.conn).await.unwrap();
    assert_eq!(connections.len(), 1);
    let connection = &connections[0];
    assert_eq!(connection.organization_id, org_id);
    assert_eq!(connection.user_id, user_id);
    assert_eq!(connection.email, "mailbox@example.com");
    assert!(connection.is_active);

    // Tokens must not be stored as plaintext.
    assert_ne!(connection.access_token_ciphertext, b"ya29.fresh-access");
    assert_eq!(connection.access_token_ciphertext[0], 0x01);
}

#[tokio::test]
async fn meta_callback_happy_path_discovers_ad_accounts() {
    let db = setup_test_db().await.unwrap();
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    seed_membership(&db.conn, user_id, org_id).await;

    let graph = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "meta-token",
            "expires_in": 5184000,
        })))
        .mount(&graph)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "9000001",
            "name": "Press Person",
        })))
        .mount(&graph)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/businesses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "biz-1", "name": "Agency" }],
        })))
        .mount(&graph)
        .await;
    Mock::given(method("GET"))
        .and(path("/biz-1/owned_ad_accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "act_111", "account_id": "111", "name": "Brand A" },
                { "id": "222", "account_id": "222", "name": "Brand B" },
            ],
        })))
        .mount(&graph)
        .await;

    let mut config = base_config();
    config.meta_graph_base = graph.uri();

    let app = build_app(config, db.conn.clone());

    let codec = StateCodec::new(STATE_SECRET.as_bytes().to_vec(), Duration::from_secs(600));
    let state = codec.issue(user_id, org_id).unwrap();

    let response = get_response(
        &app,
        &format!("/auth/meta/callback?code=meta-code&state={}", state),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.contains("success=pending"));
    assert!(location.contains("accounts=2"));

    use pressrelay::models::meta_connection::Entity as MetaConnection;
    let connections = MetaConnection::find().all(&db.conn).await.unwrap();
    assert_eq!(connections.len(), 1);
    let connection = &connections[0];

    // No email in the profile response: placeholder identity applies.
    assert_eq!(connection.email, "9000001@facebook.local");
    assert_eq!(connection.business_id.as_deref(), Some("biz-1"));

    let ids: Vec<String> = serde_json::from_value(connection.ad_account_ids.clone().unwrap()).unwrap();
    assert_eq!(ids, vec!["act_111", "act_222"]);
}

#[tokio::test]
async fn meta_callback_upsert_is_idempotent() {
    let db = setup_test_db().await.unwrap();
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    seed_membership(&db.conn, user_id, org_id).await;

    let graph = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "meta-token",
            "expires_in": 5184000,
        })))
        .mount(&graph)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "9000001",
            "name": "Press Person",
            "email": "press@example.com",
        })))
        .mount(&graph)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/businesses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&graph)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/adaccounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "act_333", "account_id": "333" }],
        })))
        .mount(&graph)
        .await;

    let mut config = base_config();
    config.meta_graph_base = graph.uri();
    let app = build_app(config, db.conn.clone());

    let codec = StateCodec::new(STATE_SECRET.as_bytes().to_vec(), Duration::from_secs(600));

    for _ in 0..2 {
        let state = codec.issue(user_id, org_id).unwrap();
        let response = get_response(
            &app,
            &format!("/auth/meta/callback?code=meta-code&state={}", state),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    use pressrelay::models::meta_connection::Entity as MetaConnection;
    let connections = MetaConnection::find().all(&db.conn).await.unwrap();
    assert_eq!(connections.len(), 1, "reconnecting must not duplicate rows");
    assert_eq!(connections[0].email, "press@example.com");
}
