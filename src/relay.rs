//! Outbound relay to the automation engine.
//!
//! The durable write always happens before a forward, and most forwards are
//! best-effort: a dead automation engine degrades the product but never fails
//! the request. When a signing secret is configured every payload carries an
//! `X-Relay-Signature-256: sha256=<hex>` header so the engine can verify the
//! sender.

use hmac::{Hmac, Mac};
use metrics::counter;
use serde_json::Value as JsonValue;
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-relay-signature-256";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned status {status}")]
    Upstream { status: u16 },
    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Compute the signature header value for a payload body.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    signing_secret: Option<String>,
}

impl RelayClient {
    pub fn new(signing_secret: Option<String>) -> Self {
        Self {
            http: crate::providers::http_client(),
            signing_secret,
        }
    }

    /// Forward a payload and require a 2xx answer.
    pub async fn forward(&self, url: &str, payload: &JsonValue) -> Result<(), RelayError> {
        let body = serde_json::to_vec(payload)?;

        let mut request = self
            .http
            .post(url)
            .header("content-type", "application/json")
            .body(body.clone());

        if let Some(secret) = &self.signing_secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body));
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            counter!("pressrelay_relay_forward_total", "outcome" => "delivered").increment(1);
            Ok(())
        } else {
            counter!("pressrelay_relay_forward_total", "outcome" => "failed").increment(1);
            Err(RelayError::Upstream {
                status: status.as_u16(),
            })
        }
    }

    /// Forward a payload, swallowing failures. Returns whether delivery
    /// succeeded.
    pub async fn forward_best_effort(&self, url: &str, payload: &JsonValue) -> bool {
        match self.forward(url, payload).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(url, error = %err, "best-effort webhook forward failed");
                false
            }
        }
    }
}
