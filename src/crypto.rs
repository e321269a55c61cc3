//! Provider-token encryption at rest.
//!
//! Access and refresh tokens are stored as AES-256-GCM ciphertexts. The AAD
//! binds each ciphertext to its owning row (`organization_id|provider|email`)
//! so a ciphertext copied between rows fails authentication. Payloads that do
//! not carry the version marker are treated as legacy plaintext and returned
//! as-is, which lets encryption be enabled against an existing database.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
};
use thiserror::Error;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION_ENCRYPTED: u8 = 0x01;
const VERSION_FIELD_LEN: usize = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_ENCRYPTED_LEN: usize = VERSION_FIELD_LEN + NONCE_LEN + TAG_LEN;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid ciphertext format")]
    InvalidFormat,
    #[error("empty ciphertext")]
    EmptyCiphertext,
}

/// Key wrapper that wipes its bytes on drop.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingKey(Vec<u8>);

impl ZeroizingKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength(bytes.len()));
        }
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// AAD string binding a token ciphertext to its connection row.
pub fn token_aad(organization_id: Uuid, provider: &str, email: &str) -> String {
    format!("{}|{}|{}", organization_id, provider, email)
}

/// Encrypts and decrypts stored provider tokens. `None` key means encryption
/// is disabled and tokens pass through as plaintext bytes.
#[derive(Clone)]
pub struct TokenCipher {
    key: Option<ZeroizingKey>,
}

impl TokenCipher {
    pub fn new(key: Option<Vec<u8>>) -> Result<Self, CryptoError> {
        Ok(Self {
            key: key.map(ZeroizingKey::new).transpose()?,
        })
    }

    pub fn disabled() -> Self {
        Self { key: None }
    }

    /// Encrypt a token under the row AAD. Layout: version byte, 12-byte
    /// nonce, ciphertext with appended tag.
    pub fn encrypt(&self, aad: &str, token: &str) -> Result<Vec<u8>, CryptoError> {
        let Some(key) = &self.key else {
            return Ok(token.as_bytes().to_vec());
        };

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let mut ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: token.as_bytes(),
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut framed = Vec::with_capacity(VERSION_FIELD_LEN + NONCE_LEN + ciphertext.len());
        framed.push(VERSION_ENCRYPTED);
        framed.extend_from_slice(&nonce);
        framed.append(&mut ciphertext);

        Ok(framed)
    }

    /// Decrypt a stored token. Legacy plaintext (no version marker) is
    /// returned verbatim.
    pub fn decrypt(&self, aad: &str, stored: &[u8]) -> Result<String, CryptoError> {
        if stored.is_empty() {
            return Err(CryptoError::EmptyCiphertext);
        }

        if !is_encrypted_payload(stored) {
            return String::from_utf8(stored.to_vec())
                .map_err(|e| CryptoError::DecryptionFailed(format!("invalid UTF-8: {}", e)));
        }

        let Some(key) = &self.key else {
            return Err(CryptoError::DecryptionFailed(
                "ciphertext present but no key configured".to_string(),
            ));
        };

        if stored.len() < MIN_ENCRYPTED_LEN {
            return Err(CryptoError::InvalidFormat);
        }

        let nonce = Nonce::from_slice(&stored[VERSION_FIELD_LEN..VERSION_FIELD_LEN + NONCE_LEN]);
        let ciphertext = &stored[VERSION_FIELD_LEN + NONCE_LEN..];

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        let plaintext = cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid UTF-8: {}", e)))
    }
}

/// True when the payload carries the encrypted-format version marker.
pub fn is_encrypted_payload(stored: &[u8]) -> bool {
    stored.len() >= MIN_ENCRYPTED_LEN && stored[0] == VERSION_ENCRYPTED
}
