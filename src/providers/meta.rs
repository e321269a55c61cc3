//! Meta (Facebook) Graph API client.
//!
//! Handles the code exchange, the long-lived token upgrade, profile lookup,
//! and ad-account discovery. Graph list endpoints are cursor-paginated; every
//! listing helper follows `paging.next` to exhaustion, one page at a time.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use url::Url;

use crate::config::AppConfig;

const FACEBOOK_DIALOG_BASE: &str = "https://www.facebook.com/v19.0";
const META_SCOPES: &str = "ads_read,ads_management,business_management,public_profile";

/// Default lifetime assumed for a long-lived token when the provider omits
/// `expires_in` (60 days).
const DEFAULT_LONG_LIVED_SECONDS: i64 = 60 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum MetaApiError {
    #[error("meta OAuth credentials are not configured")]
    NotConfigured,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("graph api returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
pub struct MetaTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MetaProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Business {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AdAccount {
    pub id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<String>,
}

/// Fallback mailbox identity when the Graph profile has no email.
pub fn placeholder_email(provider_id: &str) -> String {
    format!("{}@facebook.local", provider_id)
}

/// Normalize an ad account id to the `act_<id>` form the Marketing API uses.
pub fn normalize_act_id(id: &str) -> String {
    if id.starts_with("act_") {
        id.to_string()
    } else {
        format!("act_{}", id)
    }
}

#[derive(Clone)]
pub struct MetaClient {
    http: reqwest::Client,
    graph_base: String,
    app_id: String,
    app_secret: String,
    redirect_uri: String,
}

impl MetaClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, MetaApiError> {
        let app_id = config.meta_app_id.clone().ok_or(MetaApiError::NotConfigured)?;
        let app_secret = config
            .meta_app_secret
            .clone()
            .ok_or(MetaApiError::NotConfigured)?;

        Ok(Self {
            http: super::http_client(),
            graph_base: config.meta_graph_base.clone(),
            app_id,
            app_secret,
            redirect_uri: config.meta_redirect_uri.clone(),
        })
    }

    pub fn consent_url(&self, state: &str) -> Result<String, MetaApiError> {
        let mut url = Url::parse(&format!("{}/dialog/oauth", FACEBOOK_DIALOG_BASE))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.app_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", META_SCOPES)
            .append_pair("state", state);
        Ok(url.to_string())
    }

    /// Exchange the callback code for a short-lived user token.
    pub async fn exchange_code(&self, code: &str) -> Result<MetaTokenResponse, MetaApiError> {
        let response = self
            .http
            .get(format!("{}/oauth/access_token", self.graph_base))
            .query(&[
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
            ])
            .send()
            .await?;

        Self::expect_json(response).await
    }

    /// Upgrade to a long-lived token. Returns `None` when the exchange does
    /// not produce a usable token; callers fall back to the short-lived one.
    pub async fn exchange_long_lived(
        &self,
        short_lived_token: &str,
    ) -> Result<Option<MetaTokenResponse>, MetaApiError> {
        let response = self
            .http
            .get(format!("{}/oauth/access_token", self.graph_base))
            .query(&[
                ("grant_type", "fb_exchange_token"),
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("fb_exchange_token", short_lived_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(
                status = response.status().as_u16(),
                "long-lived token exchange failed, keeping short-lived token"
            );
            return Ok(None);
        }

        let body: JsonValue = response.json().await?;
        match body.get("access_token").and_then(|v| v.as_str()) {
            Some(token) => Ok(Some(MetaTokenResponse {
                access_token: token.to_string(),
                expires_in: body
                    .get("expires_in")
                    .and_then(|v| v.as_i64())
                    .or(Some(DEFAULT_LONG_LIVED_SECONDS)),
            })),
            None => Ok(None),
        }
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<MetaProfile, MetaApiError> {
        let response = self
            .http
            .get(format!("{}/me", self.graph_base))
            .query(&[("fields", "id,name,email"), ("access_token", access_token)])
            .send()
            .await?;

        Self::expect_json(response).await
    }

    /// Businesses the user belongs to, all pages.
    pub async fn list_businesses(&self, access_token: &str) -> Result<Vec<Business>, MetaApiError> {
        self.collect_pages(
            format!(
                "{}/me/businesses?fields=id,name&access_token={}",
                self.graph_base, access_token
            ),
        )
        .await
    }

    /// Ad accounts owned by a business, all pages.
    pub async fn list_owned_ad_accounts(
        &self,
        access_token: &str,
        business_id: &str,
    ) -> Result<Vec<AdAccount>, MetaApiError> {
        self.collect_pages(
            format!(
                "{}/{}/owned_ad_accounts?fields=id,account_id,name&access_token={}",
                self.graph_base, business_id, access_token
            ),
        )
        .await
    }

    /// Ad accounts directly on the user, used when no business owns any.
    pub async fn list_personal_ad_accounts(
        &self,
        access_token: &str,
    ) -> Result<Vec<AdAccount>, MetaApiError> {
        self.collect_pages(
            format!(
                "{}/me/adaccounts?fields=id,account_id,name&access_token={}",
                self.graph_base, access_token
            ),
        )
        .await
    }

    async fn collect_pages<T: serde::de::DeserializeOwned>(
        &self,
        first_url: String,
    ) -> Result<Vec<T>, MetaApiError> {
        let mut items = Vec::new();
        let mut next_url = Some(first_url);

        while let Some(url) = next_url {
            let response = self.http.get(&url).send().await?;
            let page: Page<T> = Self::expect_json(response).await?;

            items.extend(page.data);
            next_url = page.paging.and_then(|p| p.next);
        }

        Ok(items)
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MetaApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetaApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_act_id() {
        assert_eq!(normalize_act_id("12345"), "act_12345");
        assert_eq!(normalize_act_id("act_12345"), "act_12345");
    }

    #[test]
    fn test_placeholder_email() {
        assert_eq!(placeholder_email("9876"), "9876@facebook.local");
    }

    #[test]
    fn test_consent_url_shape() {
        let config = AppConfig {
            meta_app_id: Some("app-id".to_string()),
            meta_app_secret: Some("app-secret".to_string()),
            ..AppConfig::default()
        };
        let client = MetaClient::from_config(&config).unwrap();

        let url = client.consent_url("signed-state").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let query: std::collections::HashMap<_, _> = parsed.query_pairs().collect();

        assert_eq!(parsed.host_str(), Some("www.facebook.com"));
        assert_eq!(query["client_id"], "app-id");
        assert_eq!(query["state"], "signed-state");
        assert!(query["scope"].contains("business_management"));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(matches!(
            MetaClient::from_config(&AppConfig::default()),
            Err(MetaApiError::NotConfigured)
        ));
    }
}
