//! Gmail access-token lifecycle.
//!
//! Every caller that needs to talk to Gmail goes through
//! [`TokenRefreshManager::get_valid_token`]: it returns the stored token when
//! comfortably fresh, refreshes it proactively inside the safety margin, and
//! soft-revokes the connection the moment Google reports `invalid_grant`.
//! There is no cross-instance refresh lock; concurrent refreshes both succeed
//! and the last write wins, which Google tolerates.

use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use metrics::counter;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::gmail_connection;
use crate::providers::google::{GoogleApiError, GoogleClient};
use crate::repositories::gmail_connection::GmailConnectionRepository;

/// How a refresh failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The grant is gone; retrying cannot help. Revoke the connection.
    Permanent,
    /// Provider hiccup; a later attempt may succeed.
    Transient,
    /// Provider is throttling us.
    RateLimited,
}

/// Classify a refresh failure for logging and revocation decisions.
pub fn classify_refresh_error(error: &GoogleApiError) -> FailureClass {
    match error {
        GoogleApiError::InvalidGrant { .. } => FailureClass::Permanent,
        GoogleApiError::TokenEndpoint { status: 429, .. } => FailureClass::RateLimited,
        GoogleApiError::TokenEndpoint { status, .. } if (400..500).contains(status) => {
            FailureClass::Permanent
        }
        _ => FailureClass::Transient,
    }
}

/// A usable access token plus the connection it belongs to.
#[derive(Debug)]
pub struct ValidToken {
    pub access_token: String,
    pub connection: gmail_connection::Model,
}

pub struct TokenRefreshManager {
    connections: GmailConnectionRepository,
    google: GoogleClient,
    safety_margin: Duration,
}

impl TokenRefreshManager {
    pub fn new(
        connections: GmailConnectionRepository,
        google: GoogleClient,
        safety_margin: Duration,
    ) -> Self {
        Self {
            connections,
            google,
            safety_margin,
        }
    }

    /// Return an access token guaranteed to outlive the safety margin.
    pub async fn get_valid_token(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> Result<ValidToken, ApiError> {
        let connection = self
            .connections
            .find_active_for_user(user_id, organization_id)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| {
                ApiError::new(
                    StatusCode::NOT_FOUND,
                    "GMAIL_NOT_CONNECTED",
                    "No active Gmail connection for this user",
                )
            })?;

        let (access_token, refresh_token) = self
            .connections
            .decrypt_tokens(&connection)
            .map_err(ApiError::from)?;

        let deadline = Utc::now() + chrono::Duration::seconds(self.safety_margin.as_secs() as i64);
        if connection.expires_at > deadline {
            return Ok(ValidToken {
                access_token,
                connection,
            });
        }

        tracing::info!(
            connection_id = %connection.id,
            expires_at = %connection.expires_at,
            "access token inside safety margin, refreshing"
        );

        match self.google.refresh_access_token(&refresh_token).await {
            Ok(token) => {
                let expires_at = Utc::now() + chrono::Duration::seconds(token.expires_in);
                let updated = self
                    .connections
                    .update_access_token(&connection, &token.access_token, expires_at)
                    .await
                    .map_err(ApiError::from)?;

                counter!("pressrelay_token_refresh_total", "outcome" => "success").increment(1);

                Ok(ValidToken {
                    access_token: token.access_token,
                    connection: updated,
                })
            }
            Err(err @ GoogleApiError::InvalidGrant { .. }) => {
                tracing::warn!(
                    security = true,
                    connection_id = %connection.id,
                    "refresh token revoked upstream, deactivating connection"
                );
                self.connections
                    .mark_revoked(connection.id)
                    .await
                    .map_err(ApiError::from)?;

                counter!("pressrelay_token_refresh_total", "outcome" => "revoked").increment(1);

                Err(ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "REFRESH_TOKEN_REVOKED",
                    &format!("Gmail access was revoked and must be reconnected: {}", err),
                ))
            }
            Err(err) => {
                let class = classify_refresh_error(&err);
                tracing::error!(
                    connection_id = %connection.id,
                    class = ?class,
                    error = %err,
                    "token refresh failed"
                );

                counter!("pressrelay_token_refresh_total", "outcome" => "failure").increment(1);

                Err(ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    "TOKEN_REFRESH_FAILED",
                    &format!("Failed to refresh Gmail access token: {}", err),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grant_is_permanent() {
        let err = GoogleApiError::InvalidGrant {
            description: "Token has been expired or revoked.".to_string(),
        };
        assert_eq!(classify_refresh_error(&err), FailureClass::Permanent);
    }

    #[test]
    fn test_throttling_is_rate_limited() {
        let err = GoogleApiError::TokenEndpoint {
            status: 429,
            description: "rate limit".to_string(),
        };
        assert_eq!(classify_refresh_error(&err), FailureClass::RateLimited);
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let err = GoogleApiError::TokenEndpoint {
            status: 400,
            description: "invalid_client".to_string(),
        };
        assert_eq!(classify_refresh_error(&err), FailureClass::Permanent);
    }

    #[test]
    fn test_server_errors_are_transient() {
        let err = GoogleApiError::TokenEndpoint {
            status: 503,
            description: "backend unavailable".to_string(),
        };
        assert_eq!(classify_refresh_error(&err), FailureClass::Transient);
    }
}
