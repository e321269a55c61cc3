//! Gmail message listing.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth;
use crate::error::{self, ApiError};
use crate::providers::google::EmailSummary;
use crate::server::AppState;

const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReadEmailsRequest {
    pub organization_id: String,
    /// Accepted for wire compatibility; must match the authenticated caller.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadEmailsResponse {
    pub emails: Vec<EmailSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Read recent Gmail messages for the caller's connected mailbox
#[utoipa::path(
    post,
    path = "/emails/read",
    security(("bearer_auth" = [])),
    request_body = ReadEmailsRequest,
    responses(
        (status = 200, description = "Message metadata", body = ReadEmailsResponse),
        (status = 401, description = "Invalid bearer token or revoked Gmail access", body = ApiError),
        (status = 403, description = "Not a member, or user_id does not match the caller", body = ApiError),
        (status = 404, description = "No active Gmail connection", body = ApiError)
    ),
    tag = "emails"
)]
pub async fn read_emails(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ReadEmailsRequest>,
) -> Result<Json<ReadEmailsResponse>, ApiError> {
    let (user, organization_id, _role) = auth::validate_auth_and_org(
        &state.config,
        &state.memberships(),
        &headers,
        &body.organization_id,
    )
    .await?;

    // Identity comes from the bearer token alone; a mismatching body user_id
    // is an attempt to read someone else's mailbox.
    if let Some(raw) = &body.user_id {
        let claimed = Uuid::parse_str(raw.trim()).unwrap_or(Uuid::nil());
        if claimed != user.id {
            tracing::warn!(
                security = true,
                caller = %user.id,
                "read-emails body user_id does not match the bearer token"
            );
            return Err(error::forbidden(
                "USER_MISMATCH",
                "user_id does not match the authenticated caller",
            ));
        }
    }

    let manager = state.token_manager()?;
    let token = manager
        .get_valid_token(user.id, Some(organization_id))
        .await?;

    let google = state.google_client()?;
    let max_results = body
        .max_results
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, 100);

    let list = google
        .list_messages(&token.access_token, max_results)
        .await
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    let mut emails = Vec::with_capacity(list.messages.len());
    for message in &list.messages {
        let summary = google
            .fetch_message_summary(&token.access_token, &message.id)
            .await
            .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;
        emails.push(summary);
    }

    Ok(Json(ReadEmailsResponse {
        emails,
        result_size_estimate: list.result_size_estimate,
        next_page_token: list.next_page_token,
    }))
}
