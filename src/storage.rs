//! Object-store client for mirrored media assets.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store is not configured")]
    NotConfigured,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("object store returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

/// Map a download's content type to a file extension for the stored object.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type.split(';').next().unwrap_or("").trim() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

/// Object path for a mirrored asset, unique per ingestion.
pub fn build_object_path(
    organization_id: Uuid,
    source_table: &str,
    record_id: &str,
    extension: &str,
) -> String {
    format!(
        "{}/{}/{}-{}.{}",
        organization_id,
        source_table,
        record_id,
        Utc::now().timestamp_millis(),
        extension
    )
}

#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: Option<String>,
    api_token: Option<String>,
    bucket: String,
}

impl StorageClient {
    pub fn new(base_url: Option<String>, api_token: Option<String>, bucket: String) -> Self {
        Self {
            http: crate::providers::http_client(),
            base_url,
            api_token,
            bucket,
        }
    }

    /// Upload bytes to the configured bucket; returns the stored path
    /// (`bucket/object-path`).
    pub async fn upload(
        &self,
        object_path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let base_url = self.base_url.as_deref().ok_or(StorageError::NotConfigured)?;

        let mut request = self
            .http
            .post(format!("{}/object/{}/{}", base_url, self.bucket, object_path))
            .header("content-type", content_type)
            .body(bytes);

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(format!("{}/{}", self.bucket, object_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for_content_type("image/jpeg"), "jpg");
        assert_eq!(extension_for_content_type("image/png; charset=binary"), "png");
        assert_eq!(extension_for_content_type("video/mp4"), "mp4");
        assert_eq!(extension_for_content_type("application/octet-stream"), "bin");
        assert_eq!(extension_for_content_type(""), "bin");
    }

    #[test]
    fn test_object_path_shape() {
        let org = Uuid::new_v4();
        let path = build_object_path(org, "communiques", "rec-1", "png");

        assert!(path.starts_with(&format!("{}/communiques/rec-1-", org)));
        assert!(path.ends_with(".png"));
    }
}
