//! Google OAuth and Gmail API client.
//!
//! Covers the token lifecycle (code exchange, refresh) and the minimal Gmail
//! surface the API exposes: the caller's mailbox address and message listing
//! with per-message metadata. Base URLs come from configuration so tests can
//! point them at a local mock.

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum GoogleApiError {
    #[error("google OAuth credentials are not configured")]
    NotConfigured,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("refresh token no longer valid: {description}")]
    InvalidGrant { description: String },
    #[error("token endpoint returned {status}: {description}")]
    TokenEndpoint { status: u16, description: String },
    #[error("google api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("token response missing field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    #[serde(default)]
    pub result_size_estimate: Option<u64>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

/// Subject/from/date metadata for one message.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct EmailSummary {
    pub id: String,
    pub thread_id: String,
    pub snippet: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageMetadata {
    id: String,
    thread_id: String,
    #[serde(default)]
    snippet: String,
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<MessageHeader>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    auth_base: String,
    token_base: String,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: Vec<String>,
}

impl GoogleClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, GoogleApiError> {
        let client_id = config
            .gmail_client_id
            .clone()
            .ok_or(GoogleApiError::NotConfigured)?;
        let client_secret = config
            .gmail_client_secret
            .clone()
            .ok_or(GoogleApiError::NotConfigured)?;

        Ok(Self {
            http: super::http_client(),
            auth_base: config.google_auth_base.clone(),
            token_base: config.google_token_base.clone(),
            api_base: config.google_api_base.clone(),
            client_id,
            client_secret,
            redirect_uri: config.gmail_redirect_uri.clone(),
            scopes: config.gmail_scopes.clone(),
        })
    }

    /// Consent screen URL carrying the signed state. `access_type=offline`
    /// plus `prompt=consent` forces Google to return a refresh token.
    pub fn consent_url(&self, state: &str) -> Result<String, GoogleApiError> {
        let mut url = Url::parse(&format!("{}/o/oauth2/v2/auth", self.auth_base))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens. The redirect URI must match
    /// the one used at initiation exactly.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GoogleApiError> {
        let response = self
            .http
            .post(format!("{}/token", self.token_base))
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    /// Obtain a fresh access token from a stored refresh token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, GoogleApiError> {
        let response = self
            .http
            .post(format!("{}/token", self.token_base))
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    async fn parse_token_response(
        response: reqwest::Response,
    ) -> Result<TokenResponse, GoogleApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<TokenResponse>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: TokenErrorBody = serde_json::from_str(&body).unwrap_or(TokenErrorBody {
            error: String::new(),
            error_description: body.clone(),
        });

        if parsed.error == "invalid_grant" {
            return Err(GoogleApiError::InvalidGrant {
                description: parsed.error_description,
            });
        }

        Err(GoogleApiError::TokenEndpoint {
            status: status.as_u16(),
            description: if parsed.error_description.is_empty() {
                parsed.error
            } else {
                parsed.error_description
            },
        })
    }

    /// The mailbox address belonging to an access token.
    pub async fn fetch_user_email(&self, access_token: &str) -> Result<String, GoogleApiError> {
        let response = self
            .http
            .get(format!("{}/oauth2/v2/userinfo", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await?;

        let info: UserInfo = Self::expect_json(response).await?;
        Ok(info.email)
    }

    /// List message references for the connected mailbox.
    pub async fn list_messages(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<MessageList, GoogleApiError> {
        let response = self
            .http
            .get(format!("{}/gmail/v1/users/me/messages", self.api_base))
            .query(&[("maxResults", max_results.to_string())])
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::expect_json(response).await
    }

    /// Fetch subject/from/date metadata for one message.
    pub async fn fetch_message_summary(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<EmailSummary, GoogleApiError> {
        let response = self
            .http
            .get(format!(
                "{}/gmail/v1/users/me/messages/{}",
                self.api_base, message_id
            ))
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Date"),
            ])
            .bearer_auth(access_token)
            .send()
            .await?;

        let metadata: MessageMetadata = Self::expect_json(response).await?;

        let header = |name: &str| {
            metadata.payload.as_ref().and_then(|p| {
                p.headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case(name))
                    .map(|h| h.value.clone())
            })
        };

        Ok(EmailSummary {
            subject: header("Subject"),
            from: header("From"),
            date: header("Date"),
            id: metadata.id,
            thread_id: metadata.thread_id,
            snippet: metadata.snippet,
        })
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GoogleApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}
