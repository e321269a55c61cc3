//! Market watch generation with monthly idempotency.
//!
//! At most one completed document exists per (organization, calendar month).
//! This is the one relay endpoint where a forward failure is surfaced: the
//! just-created record flips to `error` and the caller sees a 502, because a
//! silently dropped generation would leave the month looking done forever.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth;
use crate::error::ApiError;
use crate::models::market_watch_document;
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarketWatchRequest {
    pub organization_id: String,
    #[serde(default)]
    pub force_regenerate: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarketWatchDocumentView {
    pub id: String,
    pub month_key: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<market_watch_document::Model> for MarketWatchDocumentView {
    fn from(model: market_watch_document::Model) -> Self {
        Self {
            id: model.id.to_string(),
            month_key: model.month_key,
            status: model.status,
            content: model.content,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarketWatchResponse {
    pub success: bool,
    pub already_exists: bool,
    pub document: MarketWatchDocumentView,
}

/// Current calendar month bucket, "YYYY-MM".
pub fn current_month_key() -> String {
    Utc::now().format("%Y-%m").to_string()
}

/// Trigger market watch generation for the current month
#[utoipa::path(
    post,
    path = "/market-watch/generate",
    security(("bearer_auth" = [])),
    request_body = MarketWatchRequest,
    responses(
        (status = 200, description = "Document created or already present", body = MarketWatchResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Caller is not a member of the organization", body = ApiError),
        (status = 500, description = "Webhook not configured", body = ApiError),
        (status = 502, description = "Automation engine rejected the forward", body = ApiError)
    ),
    tag = "relay"
)]
pub async fn generate_market_watch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MarketWatchRequest>,
) -> Result<Json<MarketWatchResponse>, ApiError> {
    let (user, organization_id, _role) = auth::validate_auth_and_org(
        &state.config,
        &state.memberships(),
        &headers,
        &body.organization_id,
    )
    .await?;

    let repo = state.market_watch();
    let month_key = current_month_key();

    let existing = repo
        .find_by_month(organization_id, &month_key)
        .await
        .map_err(ApiError::from)?;

    if let Some(document) = &existing {
        if document.status == "completed" && !body.force_regenerate {
            return Ok(Json(MarketWatchResponse {
                success: true,
                already_exists: true,
                document: document.clone().into(),
            }));
        }
    }

    // Reuse the month's row when one exists; the unique index owns the
    // one-per-month guarantee.
    let document = match existing {
        Some(document) => {
            repo.set_status(document.id, "pending")
                .await
                .map_err(ApiError::from)?;
            repo.find_by_month(organization_id, &month_key)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::from(anyhow::anyhow!("document vanished after update")))?
        }
        None => repo
            .create_pending(organization_id, &month_key)
            .await
            .map_err(ApiError::from)?,
    };

    let Some(webhook_url) = &state.config.market_watch_webhook_url else {
        repo.set_status(document.id, "error")
            .await
            .map_err(ApiError::from)?;
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "WEBHOOK_NOT_CONFIGURED",
            "Market watch webhook URL is not configured",
        ));
    };

    let payload = json!({
        "document_id": document.id,
        "organization_id": organization_id,
        "month_key": month_key,
        "requested_by": user.id,
        "force_regenerate": body.force_regenerate,
    });

    if let Err(err) = state.relay.forward(webhook_url, &payload).await {
        tracing::error!(error = %err, document_id = %document.id, "market watch forward failed");
        repo.set_status(document.id, "error")
            .await
            .map_err(ApiError::from)?;
        return Err(ApiError::new(
            StatusCode::BAD_GATEWAY,
            "WEBHOOK_FAILED",
            "Automation engine rejected the market watch request",
        ));
    }

    Ok(Json(MarketWatchResponse {
        success: true,
        already_exists: false,
        document: document.into(),
    }))
}
