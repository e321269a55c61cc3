//! HTTP endpoint handlers for the Pressrelay API.

pub mod communiques;
pub mod connections;
pub mod creatives;
pub mod emails;
pub mod market_watch;
pub mod media;
pub mod oauth;

use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Basic service identity, served at the root.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: "pressrelay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Root handler returning service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}
