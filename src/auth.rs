//! Caller authentication and organization authorization.
//!
//! Identity comes exclusively from the `Authorization: Bearer` header, an
//! HS256 JWT minted by the identity service. Request bodies never establish
//! who the caller is. Organization access is decided by a membership lookup
//! and fails closed: any doubt means 403.

use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{self, ApiError};
use crate::repositories::membership::MembershipRepository;

/// Verified caller identity.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    email: Option<String>,
    #[allow(dead_code)]
    exp: usize,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error::unauthorized(Some("Missing Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| error::unauthorized(Some("Authorization header must be a Bearer token")))
}

/// Verify the caller's bearer token and return their identity.
pub fn verify_bearer(config: &AppConfig, headers: &HeaderMap) -> Result<AuthenticatedUser, ApiError> {
    let token = bearer_token(headers)?;

    let secret = config
        .auth_jwt_secret
        .as_deref()
        .ok_or_else(|| ApiError::from(anyhow::anyhow!("auth JWT secret not configured")))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|err| {
        tracing::warn!(security = true, error = %err, "bearer token verification failed");
        error::invalid_token(None)
    })?;

    let user_id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| {
        tracing::warn!(security = true, "bearer token subject is not a UUID");
        error::invalid_token(Some("Token subject is not a valid user id"))
    })?;

    Ok(AuthenticatedUser {
        id: user_id,
        email: token_data.claims.email,
    })
}

/// Parse an organization id from untrusted input.
pub fn parse_organization_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        error::validation_error(
            "INVALID_ORGANIZATION_ID_FORMAT",
            "Organization id must be a UUID",
            json!({ "organization_id": raw }),
        )
    })
}

/// Authenticate the caller and confirm they belong to the organization,
/// returning their role within it.
///
/// The membership check runs against the privileged store, so it cannot be
/// influenced by anything the caller sent.
pub async fn validate_auth_and_org(
    config: &AppConfig,
    memberships: &MembershipRepository,
    headers: &HeaderMap,
    raw_organization_id: &str,
) -> Result<(AuthenticatedUser, Uuid, String), ApiError> {
    let user = verify_bearer(config, headers)?;
    let organization_id = parse_organization_id(raw_organization_id)?;

    let role = memberships
        .find_role(user.id, organization_id)
        .await
        .map_err(ApiError::from)?;

    let Some(role) = role else {
        tracing::warn!(
            security = true,
            user_id = %user.id,
            organization_id = %organization_id,
            "organization membership check failed"
        );
        return Err(error::forbidden(
            "NOT_ORGANIZATION_MEMBER",
            "User is not a member of this organization",
        ));
    };

    Ok((user, organization_id, role))
}

fn constant_time_token_match(candidate: &str, accepted: &[String]) -> bool {
    let mut matched = false;
    for token in accepted {
        matched |= candidate.as_bytes().ct_eq(token.as_bytes()).unwrap_u8() == 1;
    }
    matched
}

/// Guard for internal service endpoints: the bearer token must be one of the
/// configured operator tokens.
pub fn require_operator_token(config: &AppConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = bearer_token(headers)?;

    if config.operator_tokens.is_empty() {
        tracing::warn!(security = true, "operator endpoint hit with no tokens configured");
        return Err(error::unauthorized(Some("Operator access not configured")));
    }

    if !constant_time_token_match(token, &config.operator_tokens) {
        tracing::warn!(security = true, "operator token rejected");
        return Err(error::invalid_token(Some("Operator token not recognized")));
    }

    Ok(())
}

/// Guard for the media persistence endpoint: requires the shared
/// `X-Internal-Token` header.
pub fn require_internal_token(config: &AppConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = config
        .internal_api_token
        .as_deref()
        .ok_or_else(|| error::unauthorized(Some("Internal access not configured")))?;

    let provided = headers
        .get("x-internal-token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error::unauthorized(Some("Missing X-Internal-Token header")))?;

    if provided.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
        tracing::warn!(security = true, "internal token rejected");
        return Err(error::invalid_token(Some("Internal token not recognized")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-jwt-secret";

    fn config() -> AppConfig {
        AppConfig {
            auth_jwt_secret: Some(SECRET.to_string()),
            operator_tokens: vec!["op-token-1".to_string(), "op-token-2".to_string()],
            internal_api_token: Some("internal-token".to_string()),
            ..AppConfig::default()
        }
    }

    fn mint_jwt(sub: &str, secret: &str) -> String {
        let claims = json!({
            "sub": sub,
            "email": "user@example.com",
            "exp": (chrono::Utc::now().timestamp() + 3600) as usize,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_bearer_accepted() {
        let user_id = Uuid::new_v4();
        let headers = headers_with_bearer(&mint_jwt(&user_id.to_string(), SECRET));

        let user = verify_bearer(&config(), &headers).unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_missing_header_rejected() {
        let err = verify_bearer(&config(), &HeaderMap::new()).unwrap_err();
        assert_eq!(err.code, Box::from("UNAUTHORIZED"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let headers = headers_with_bearer(&mint_jwt(&Uuid::new_v4().to_string(), "other-secret"));

        let err = verify_bearer(&config(), &headers).unwrap_err();
        assert_eq!(err.code, Box::from("INVALID_TOKEN"));
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let headers = headers_with_bearer(&mint_jwt("not-a-uuid", SECRET));

        let err = verify_bearer(&config(), &headers).unwrap_err();
        assert_eq!(err.code, Box::from("INVALID_TOKEN"));
    }

    #[test]
    fn test_organization_id_format() {
        assert!(parse_organization_id(&Uuid::new_v4().to_string()).is_ok());

        let err = parse_organization_id("marketing-team").unwrap_err();
        assert_eq!(err.code, Box::from("INVALID_ORGANIZATION_ID_FORMAT"));
    }

    #[test]
    fn test_operator_token_matching() {
        let headers = headers_with_bearer("op-token-2");
        assert!(require_operator_token(&config(), &headers).is_ok());

        let headers = headers_with_bearer("op-token-3");
        assert!(require_operator_token(&config(), &headers).is_err());
    }

    #[test]
    fn test_internal_token_required() {
        let mut headers = HeaderMap::new();
        headers.insert("x-internal-token", HeaderValue::from_static("internal-token"));
        assert!(require_internal_token(&config(), &headers).is_ok());

        headers.insert("x-internal-token", HeaderValue::from_static("wrong"));
        assert!(require_internal_token(&config(), &headers).is_err());

        assert!(require_internal_token(&config(), &HeaderMap::new()).is_err());
    }
}
