//! Internal listing of active Meta connections.
//!
//! Consumed by the automation engine, never by browsers: the response carries
//! decrypted access tokens, which is why the endpoint sits behind operator
//! tokens instead of user auth.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::Serialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::auth;
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct MetaConnectionView {
    pub organization_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_account_ids: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
}

/// List active Meta connections with usable tokens
///
/// The body is the bare array; the automation engine consumes it directly.
#[utoipa::path(
    get,
    path = "/connections/meta",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active Meta connections", body = [MetaConnectionView]),
        (status = 401, description = "Missing or unrecognized operator token", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn list_meta_connections(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MetaConnectionView>>, ApiError> {
    auth::require_operator_token(&state.config, &headers)?;

    let repo = state.meta_connections();
    let models = repo.list_active().await.map_err(ApiError::from)?;

    let mut connections = Vec::with_capacity(models.len());
    for model in &models {
        let access_token = repo.decrypt_access_token(model).map_err(ApiError::from)?;
        connections.push(MetaConnectionView {
            organization_id: model.organization_id.to_string(),
            email: model.email.clone(),
            user_name: model.user_name.clone(),
            access_token,
            ad_account_ids: model.ad_account_ids.clone(),
            business_id: model.business_id.clone(),
        });
    }

    Ok(Json(connections))
}
