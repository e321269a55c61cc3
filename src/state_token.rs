//! Signed OAuth state codec.
//!
//! The `state` parameter carried through provider consent screens is a
//! self-authenticating token: an HMAC-SHA256 signature over a canonical JSON
//! payload binding the initiating user, the target organization, and an issue
//! timestamp. Verification recomputes the signature over the received payload
//! bytes and compares in constant time, so a forged or replayed-after-expiry
//! state never reaches the connection store.

use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Errors produced while decoding or verifying a state token.
#[derive(Debug, Error)]
pub enum StateTokenError {
    #[error("state token is not valid base64url")]
    InvalidEncoding,
    #[error("state token envelope is malformed")]
    MalformedEnvelope,
    #[error("state token payload is malformed")]
    MalformedPayload,
    #[error("state token signature does not match")]
    SignatureMismatch,
    #[error("state token expired {age_seconds}s ago")]
    Expired { age_seconds: u64 },
    #[error("failed to serialize state payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Claims bound into a state token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatePayload {
    pub user_id: Uuid,
    pub org_id: Uuid,
    /// Issue time, unix milliseconds.
    pub timestamp: i64,
    pub nonce: String,
}

/// Wire envelope: the payload travels as its exact JSON text so verification
/// signs the same bytes the issuer signed.
#[derive(Serialize, Deserialize)]
struct StateEnvelope {
    payload: String,
    signature: String,
}

/// Signs and verifies state tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct StateCodec {
    secret: Vec<u8>,
    max_age: Duration,
}

impl StateCodec {
    pub fn new(secret: impl Into<Vec<u8>>, max_age: Duration) -> Self {
        Self {
            secret: secret.into(),
            max_age,
        }
    }

    /// Mint a fresh state token for `user_id` acting on `org_id`.
    pub fn issue(&self, user_id: Uuid, org_id: Uuid) -> Result<String, StateTokenError> {
        let payload = StatePayload {
            user_id,
            org_id,
            timestamp: Utc::now().timestamp_millis(),
            nonce: Uuid::new_v4().to_string(),
        };
        self.encode(&payload)
    }

    fn encode(&self, payload: &StatePayload) -> Result<String, StateTokenError> {
        let payload_json = serde_json::to_string(payload)?;
        let signature = self.sign(payload_json.as_bytes());

        let envelope = StateEnvelope {
            payload: payload_json,
            signature: base64::engine::general_purpose::STANDARD.encode(signature),
        };
        let envelope_json = serde_json::to_vec(&envelope)?;

        Ok(base64_url::encode(&envelope_json))
    }

    /// Decode and verify a state token, returning its payload.
    ///
    /// Signature comparison happens before any payload field is interpreted,
    /// and uses a constant-time equality check.
    pub fn verify(&self, state: &str) -> Result<StatePayload, StateTokenError> {
        let envelope_json =
            base64_url::decode(state).map_err(|_| StateTokenError::InvalidEncoding)?;
        let envelope: StateEnvelope = serde_json::from_slice(&envelope_json)
            .map_err(|_| StateTokenError::MalformedEnvelope)?;

        let claimed_signature = base64::engine::general_purpose::STANDARD
            .decode(&envelope.signature)
            .map_err(|_| StateTokenError::MalformedEnvelope)?;
        let expected_signature = self.sign(envelope.payload.as_bytes());

        if expected_signature.ct_eq(claimed_signature.as_slice()).unwrap_u8() != 1 {
            return Err(StateTokenError::SignatureMismatch);
        }

        let payload: StatePayload = serde_json::from_str(&envelope.payload)
            .map_err(|_| StateTokenError::MalformedPayload)?;

        let age_ms = Utc::now().timestamp_millis() - payload.timestamp;
        if age_ms > self.max_age.as_millis() as i64 {
            return Err(StateTokenError::Expired {
                age_seconds: (age_ms / 1000).max(0) as u64,
            });
        }

        Ok(payload)
    }

    fn sign(&self, payload_bytes: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(payload_bytes);
        mac.finalize().into_bytes().to_vec()
    }
}
