//! Media asset persistence: mirror third-party URLs into the object store.
//!
//! Batch endpoint with per-item outcomes; one broken URL never sinks the
//! rest of the batch. Guarded by the internal shared-secret header rather
//! than user auth, since the automation engine is the only caller.

use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth;
use crate::error::ApiError;
use crate::repositories::media_asset::PersistedAsset;
use crate::server::AppState;
use crate::storage;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MediaItem {
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source_table: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MediaItemResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PersistMediaResponse {
    pub success: bool,
    pub processed: usize,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "failCount")]
    pub fail_count: usize,
    pub results: Vec<MediaItemResult>,
}

fn item_failure(source_url: Option<String>, code: &str) -> MediaItemResult {
    MediaItemResult {
        source_url,
        success: false,
        error: Some(code.to_string()),
        storage_path: None,
    }
}

/// Persist one or more media assets into the object store
#[utoipa::path(
    post,
    path = "/media-assets/persist",
    request_body = MediaItem,
    responses(
        (status = 200, description = "Per-item outcomes", body = PersistMediaResponse),
        (status = 401, description = "Missing or invalid internal token", body = ApiError)
    ),
    tag = "relay"
)]
pub async fn persist_media_assets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<JsonValue>,
) -> Result<Json<PersistMediaResponse>, ApiError> {
    auth::require_internal_token(&state.config, &headers)?;

    // Accept both a batch ({"items": [...]}) and a bare single item.
    let raw_items: Vec<JsonValue> = match body.get("items").and_then(|v| v.as_array()) {
        Some(items) => items.clone(),
        None => vec![body],
    };

    let mut results = Vec::with_capacity(raw_items.len());
    for raw in &raw_items {
        results.push(process_item(&state, raw).await);
    }

    let success_count = results.iter().filter(|r| r.success).count();
    let fail_count = results.len() - success_count;

    Ok(Json(PersistMediaResponse {
        success: fail_count == 0,
        processed: results.len(),
        success_count,
        fail_count,
        results,
    }))
}

async fn process_item(state: &AppState, raw: &JsonValue) -> MediaItemResult {
    let item: MediaItem = match serde_json::from_value(raw.clone()) {
        Ok(item) => item,
        Err(_) => return item_failure(None, "MISSING_FIELDS"),
    };

    let source_url = item.source_url.clone();

    let (Some(org_raw), Some(url_raw), Some(source_type), Some(source_table), Some(record_id)) = (
        item.organization_id.as_deref(),
        item.source_url.as_deref(),
        item.source_type.as_deref(),
        item.source_table.as_deref(),
        item.record_id.as_deref(),
    ) else {
        return item_failure(source_url, "MISSING_FIELDS");
    };

    let Ok(organization_id) = Uuid::parse_str(org_raw.trim()) else {
        return item_failure(source_url, "MISSING_FIELDS");
    };

    let parsed_url = match Url::parse(url_raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
        _ => return item_failure(source_url, "INVALID_URL"),
    };

    let timeout = Duration::from_secs(state.config.media.download_timeout_seconds);
    let download = match state
        .media_http
        .get(parsed_url)
        .timeout(timeout)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            tracing::warn!(url = url_raw, status = response.status().as_u16(), "media download rejected");
            return item_failure(source_url, "DOWNLOAD_FAILED");
        }
        Err(err) => {
            tracing::warn!(url = url_raw, error = %err, "media download failed");
            return item_failure(source_url, "DOWNLOAD_FAILED");
        }
    };

    let content_type = download
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let bytes = match download.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(url = url_raw, error = %err, "media body read failed");
            return item_failure(source_url, "DOWNLOAD_FAILED");
        }
    };

    if (bytes.len() as u64) < state.config.media.min_byte_size {
        tracing::warn!(
            url = url_raw,
            byte_size = bytes.len(),
            "download below minimum size, treating as failed fetch"
        );
        return item_failure(source_url, "DOWNLOAD_FAILED");
    }

    let extension = storage::extension_for_content_type(&content_type);
    let object_path = storage::build_object_path(organization_id, source_table, record_id, extension);

    let storage_path = match state
        .storage
        .upload(&object_path, &content_type, bytes.to_vec())
        .await
    {
        Ok(path) => path,
        Err(err) => {
            tracing::error!(url = url_raw, error = %err, "object store upload failed");
            return item_failure(source_url, "UPLOAD_FAILED");
        }
    };

    let upsert = state
        .media_assets()
        .upsert(PersistedAsset {
            organization_id,
            source_url: url_raw,
            source_type,
            source_table,
            record_id,
            storage_path: &storage_path,
            content_type: &content_type,
            byte_size: bytes.len() as i64,
        })
        .await;

    if let Err(err) = upsert {
        tracing::error!(url = url_raw, error = %err, "media asset record update failed");
        return item_failure(source_url, "UPDATE_FAILED");
    }

    MediaItemResult {
        source_url,
        success: true,
        error: None,
        storage_path: Some(storage_path),
    }
}
