//! The problem+json failure envelope every JSON endpoint answers with.
//!
//! The wire body is `{"error": CODE, "message": ..., "details"?, "trace_id"?}`
//! where CODE is a stable SCREAMING_SNAKE_CASE string clients switch on. The
//! HTTP status travels out of band and is never serialized.

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::telemetry;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Stable machine-readable code, serialized as `error`.
    #[serde(rename = "error")]
    pub code: Box<str>,
    pub message: Box<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    pub fn new<C, M>(status: StatusCode, code: C, message: M) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        Self {
            status,
            code: code.into().into(),
            message: message.into().into(),
            details: None,
            trace_id: resolve_trace_id(),
        }
    }

    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }
}

/// Request trace id when one is active, otherwise a short correlation id so
/// the client still has something to quote.
fn resolve_trace_id() -> Option<Box<str>> {
    let id = match telemetry::current_trace_id() {
        Some(trace_id) => trace_id,
        None => format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]),
    };
    Some(id.into())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let mut response = axum::Json(self).into_response();
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        // Full chain goes to the log; the client gets a generic envelope.
        tracing::error!(error = ?error, "internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected 'Content-Type: application/json'".to_string()
            }
            JsonRejection::JsonSyntaxError(err) => format!("Malformed JSON body: {}", err),
            JsonRejection::JsonDataError(err) => format!("Request body mismatch: {}", err),
            other => format!("Unreadable request body: {}", other),
        };
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if let sea_orm::DbErr::RecordNotFound(record) = &error {
            return Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Record not found: {}", record),
            );
        }

        tracing::error!(error = ?error, "database error");
        if matches!(error, sea_orm::DbErr::Conn(_)) {
            Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Database service unavailable",
            )
        } else {
            Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Database error occurred",
            )
        }
    }
}

pub fn unauthorized(message: Option<&str>) -> ApiError {
    ApiError::new(
        StatusCode::UNAUTHORIZED,
        "UNAUTHORIZED",
        message.unwrap_or("Authentication required"),
    )
}

/// Credentials were presented but could not be verified.
pub fn invalid_token(message: Option<&str>) -> ApiError {
    ApiError::new(
        StatusCode::UNAUTHORIZED,
        "INVALID_TOKEN",
        message.unwrap_or("Bearer token could not be verified"),
    )
}

pub fn forbidden(code: &str, message: &str) -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, code, message)
}

pub fn validation_error(code: &str, message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, code, message).with_details(field_errors)
}

/// Upstream provider failure, 502, with a bounded body snippet in details.
pub fn provider_error(provider: &str, status: u16, body: Option<String>) -> ApiError {
    let body_snippet = body.map(|b| truncate_chars(&b, 200));

    ApiError::new(
        StatusCode::BAD_GATEWAY,
        "PROVIDER_ERROR",
        format!("Provider {} returned error status {}", provider, status),
    )
    .with_details(json!({
        "provider": provider,
        "status": status,
        "body_snippet": body_snippet,
    }))
}

/// Char-boundary-safe truncation, appending an ellipsis when cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_uses_error_field_and_hides_status() {
        let error = ApiError::new(StatusCode::FORBIDDEN, "NOT_ORGANIZATION_MEMBER", "denied");
        let body = serde_json::to_value(&error).unwrap();

        assert_eq!(body["error"], "NOT_ORGANIZATION_MEMBER");
        assert_eq!(body["message"], "denied");
        assert!(body.get("status").is_none());
    }

    #[test]
    fn test_response_carries_status_and_problem_json() {
        let response =
            ApiError::new(StatusCode::CONFLICT, "CONFLICT", "exists").into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_anyhow_mapping_never_leaks_internals() {
        let api_error: ApiError = anyhow::anyhow!("secret database detail").into();

        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.code, Box::from("INTERNAL_SERVER_ERROR"));
        assert!(!api_error.message.contains("secret"));
    }

    #[test]
    fn test_record_not_found_maps_to_404() {
        let api_error: ApiError = sea_orm::DbErr::RecordNotFound("connection".to_string()).into();

        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert!(api_error.message.contains("connection"));
    }

    #[test]
    fn test_validation_error_carries_details() {
        let error = validation_error(
            "INVALID_ORGANIZATION_ID_FORMAT",
            "Organization id must be a UUID",
            json!({"organization_id": "not-a-uuid"}),
        );

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.code, Box::from("INVALID_ORGANIZATION_ID_FORMAT"));
        assert_eq!(
            error.details.unwrap()["organization_id"],
            json!("not-a-uuid")
        );
    }

    #[test]
    fn test_provider_error_truncates_body() {
        let error = provider_error("meta", 500, Some("x".repeat(500)));

        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        let details = error.details.unwrap();
        let snippet = details["body_snippet"].as_str().unwrap();
        assert_eq!(snippet.chars().count(), 203);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let text = "émoji🚀".repeat(100);
        let truncated = truncate_chars(&text, 200);

        assert_eq!(truncated.chars().count(), 203);
        assert!(text.starts_with(truncated.trim_end_matches("...")));
    }

    #[test]
    fn test_fallback_correlation_id() {
        let error = ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "X", "y");

        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }
}
