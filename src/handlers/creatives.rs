//! Creative search relay.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth;
use crate::error::{self, ApiError};
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchCreativesRequest {
    pub organization_id: String,
    #[serde(default)]
    pub search_term: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchCreativesResponse {
    pub success: bool,
    pub message: String,
}

/// Forward a creative search request to the automation engine
#[utoipa::path(
    post,
    path = "/creatives/search",
    security(("bearer_auth" = [])),
    request_body = SearchCreativesRequest,
    responses(
        (status = 200, description = "Search request forwarded", body = SearchCreativesResponse),
        (status = 400, description = "Search term too short", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Caller is not a member of the organization", body = ApiError),
        (status = 500, description = "Webhook not configured", body = ApiError),
        (status = 502, description = "Automation engine rejected the forward", body = ApiError)
    ),
    tag = "relay"
)]
pub async fn search_creatives(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SearchCreativesRequest>,
) -> Result<Json<SearchCreativesResponse>, ApiError> {
    let (user, organization_id, _role) = auth::validate_auth_and_org(
        &state.config,
        &state.memberships(),
        &headers,
        &body.organization_id,
    )
    .await?;

    let search_term = body.search_term.as_deref().map(str::trim).unwrap_or("");
    if search_term.chars().count() < 2 {
        return Err(error::validation_error(
            "INVALID_SEARCH_TERM",
            "Search term must be at least 2 characters",
            json!({ "search_term": search_term }),
        ));
    }

    let Some(webhook_url) = &state.config.creative_search_webhook_url else {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "WEBHOOK_NOT_CONFIGURED",
            "Creative search webhook URL is not configured",
        ));
    };

    let payload = json!({
        "organization_id": organization_id,
        "requested_by": user.id,
        "search_term": search_term,
    });

    if let Err(err) = state.relay.forward(webhook_url, &payload).await {
        tracing::error!(error = %err, "creative search forward failed");
        return Err(ApiError::new(
            StatusCode::BAD_GATEWAY,
            "WEBHOOK_FAILED",
            "Automation engine rejected the search request",
        ));
    }

    Ok(Json(SearchCreativesResponse {
        success: true,
        message: "Search request forwarded".to_string(),
    }))
}
