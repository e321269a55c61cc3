//! CORS policy for browser callers.
//!
//! Origins are allowed when they match the configured frontend, an entry in
//! the explicit allow-list, or one of the preview-deployment suffixes. A
//! request from anywhere else still gets a response, but the allow-origin
//! header names the canonical frontend, so the browser blocks it.

use axum::http::{HeaderMap, HeaderValue, header};

use crate::config::AppConfig;

pub const ALLOWED_METHODS: &str = "POST, GET, OPTIONS";
pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Pick the `Access-Control-Allow-Origin` value for a request origin.
pub fn resolve_allowed_origin(origin: Option<&str>, config: &AppConfig) -> String {
    if let Some(origin) = origin {
        if origin == config.frontend_base_url
            || config.allowed_origins.iter().any(|o| o == origin)
        {
            return origin.to_string();
        }

        if config
            .allowed_origin_suffixes
            .iter()
            .any(|suffix| origin.ends_with(suffix.as_str()))
        {
            return origin.to_string();
        }
    }

    config.frontend_base_url.clone()
}

/// Apply the CORS response headers for the given request origin.
pub fn apply_cors_headers(headers: &mut HeaderMap, origin: Option<&str>, config: &AppConfig) {
    let allowed = resolve_allowed_origin(origin, config);

    if let Ok(value) = HeaderValue::from_str(&allowed) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("origin"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            frontend_base_url: "https://app.pressrelay.example".to_string(),
            allowed_origins: vec!["https://staging.pressrelay.example".to_string()],
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_frontend_origin_allowed() {
        let origin = resolve_allowed_origin(Some("https://app.pressrelay.example"), &config());
        assert_eq!(origin, "https://app.pressrelay.example");
    }

    #[test]
    fn test_allow_list_entry_allowed() {
        let origin = resolve_allowed_origin(Some("https://staging.pressrelay.example"), &config());
        assert_eq!(origin, "https://staging.pressrelay.example");
    }

    #[test]
    fn test_preview_suffix_allowed() {
        let origin = resolve_allowed_origin(Some("https://preview-42.lovable.app"), &config());
        assert_eq!(origin, "https://preview-42.lovable.app");
    }

    #[test]
    fn test_unknown_origin_falls_back_to_frontend() {
        let origin = resolve_allowed_origin(Some("https://evil.example"), &config());
        assert_eq!(origin, "https://app.pressrelay.example");
    }

    #[test]
    fn test_absent_origin_falls_back_to_frontend() {
        let origin = resolve_allowed_origin(None, &config());
        assert_eq!(origin, "https://app.pressrelay.example");
    }

    #[test]
    fn test_headers_applied() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers, Some("https://x.lovableproject.com"), &config());

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://x.lovableproject.com"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ALLOWED_METHODS
        );
    }
}
