//! OAuth initiation and callback handlers for Gmail and Meta.
//!
//! Initiation is a JSON API: authenticate, authorize against the target
//! organization, mint a signed state, answer with the provider consent URL.
//! Callbacks are browser navigations arriving from the provider, so every
//! outcome, success or failure, is a redirect back to the frontend; JSON
//! errors would strand the user on a blank page.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Json, Redirect};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth;
use crate::error::ApiError;
use crate::providers::meta::{self, AdAccount};
use crate::server::AppState;
use crate::state_token::{StatePayload, StateTokenError};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OAuthInitRequest {
    pub organization_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OAuthInitResponse {
    /// Provider consent URL the frontend should navigate to.
    pub auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

fn frontend_redirect(state: &AppState, params: &[(&str, &str)]) -> Redirect {
    let base = format!("{}/integrations", state.config.frontend_base_url);
    match url::Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(params.iter().copied());
            Redirect::to(url.as_str())
        }
        // Frontend base URL is operator-provided; fall back to an unqualified
        // redirect rather than failing the browser navigation.
        Err(_) => Redirect::to(&base),
    }
}

fn error_redirect(state: &AppState, provider: &str, reason: &str) -> Redirect {
    frontend_redirect(state, &[("provider", provider), ("error", reason)])
}

/// Verify the callback state and re-check membership. Returns a redirect for
/// every failure mode so the callback handlers stay linear.
async fn verify_callback_state(
    state: &AppState,
    provider: &str,
    raw_state: &str,
) -> Result<StatePayload, Redirect> {
    let codec = state
        .state_codec()
        .map_err(|_| error_redirect(state, provider, "Connection failed, please try again"))?;

    let payload = codec.verify(raw_state).map_err(|err| {
        let reason = match &err {
            StateTokenError::SignatureMismatch => {
                tracing::warn!(
                    security = true,
                    provider,
                    "state signature verification failed on OAuth callback"
                );
                "Security validation failed"
            }
            StateTokenError::Expired { .. } => "Authorization session expired, please retry",
            _ => "Invalid state parameter",
        };
        error_redirect(state, provider, reason)
    })?;

    // The state already binds user and organization, but membership may have
    // been revoked while the consent screen was open.
    let is_member = state
        .memberships()
        .find_role(payload.user_id, payload.org_id)
        .await
        .map(|role| role.is_some())
        .unwrap_or(false);

    if !is_member {
        tracing::warn!(
            security = true,
            provider,
            user_id = %payload.user_id,
            organization_id = %payload.org_id,
            "membership check failed on OAuth callback"
        );
        return Err(error_redirect(
            state,
            provider,
            "User is not a member of this organization",
        ));
    }

    Ok(payload)
}

/// Start the Gmail OAuth flow
#[utoipa::path(
    post,
    path = "/auth/gmail/init",
    security(("bearer_auth" = [])),
    request_body = OAuthInitRequest,
    responses(
        (status = 200, description = "Consent URL generated", body = OAuthInitResponse),
        (status = 400, description = "Malformed organization id", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Caller is not a member of the organization", body = ApiError),
        (status = 500, description = "OAuth credentials not configured", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn gmail_init(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OAuthInitRequest>,
) -> Result<Json<OAuthInitResponse>, ApiError> {
    let (user, organization_id, _role) = auth::validate_auth_and_org(
        &state.config,
        &state.memberships(),
        &headers,
        &body.organization_id,
    )
    .await?;

    let google = state.google_client()?;
    let signed_state = state
        .state_codec()?
        .issue(user.id, organization_id)
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    let auth_url = google
        .consent_url(&signed_state)
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    Ok(Json(OAuthInitResponse { auth_url }))
}

/// Start the Meta OAuth flow
#[utoipa::path(
    post,
    path = "/auth/meta/init",
    security(("bearer_auth" = [])),
    request_body = OAuthInitRequest,
    responses(
        (status = 200, description = "Consent URL generated", body = OAuthInitResponse),
        (status = 400, description = "Malformed organization id", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Caller is not a member of the organization", body = ApiError),
        (status = 500, description = "OAuth credentials not configured", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn meta_init(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OAuthInitRequest>,
) -> Result<Json<OAuthInitResponse>, ApiError> {
    let (user, organization_id, _role) = auth::validate_auth_and_org(
        &state.config,
        &state.memberships(),
        &headers,
        &body.organization_id,
    )
    .await?;

    let meta = state.meta_client()?;
    let signed_state = state
        .state_codec()?
        .issue(user.id, organization_id)
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    let auth_url = meta
        .consent_url(&signed_state)
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    Ok(Json(OAuthInitResponse { auth_url }))
}

/// Gmail OAuth callback
#[utoipa::path(
    get,
    path = "/auth/gmail/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "Signed state token"),
        ("error" = Option<String>, Query, description = "Provider error code")
    ),
    responses(
        (status = 303, description = "Redirect back to the frontend")
    ),
    tag = "oauth"
)]
pub async fn gmail_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    if let Some(provider_error) = query.error {
        let reason = query.error_description.unwrap_or(provider_error);
        return error_redirect(&state, "gmail", &reason);
    }

    let (Some(code), Some(raw_state)) = (query.code, query.state) else {
        return error_redirect(&state, "gmail", "Missing authorization code or state");
    };

    let payload = match verify_callback_state(&state, "gmail", &raw_state).await {
        Ok(payload) => payload,
        Err(redirect) => return redirect,
    };

    match complete_gmail_connection(&state, &payload, &code).await {
        Ok(connection_id) => frontend_redirect(
            &state,
            &[
                ("provider", "gmail"),
                ("success", "pending"),
                ("connection_id", &connection_id),
            ],
        ),
        Err(err) => {
            tracing::error!(error = %err, "gmail callback failed");
            error_redirect(&state, "gmail", "Connection failed, please try again")
        }
    }
}

async fn complete_gmail_connection(
    state: &AppState,
    payload: &StatePayload,
    code: &str,
) -> anyhow::Result<String> {
    let google = state
        .google_client()
        .map_err(|e| anyhow::anyhow!("{}", e.message))?;

    let token = google.exchange_code(code).await?;
    let refresh_token = token
        .refresh_token
        .ok_or_else(|| anyhow::anyhow!("token response carried no refresh token"))?;
    let email = google.fetch_user_email(&token.access_token).await?;
    let expires_at = Utc::now() + chrono::Duration::seconds(token.expires_in);

    let connection = state
        .gmail_connections()
        .upsert(
            payload.org_id,
            payload.user_id,
            &email,
            &token.access_token,
            &refresh_token,
            expires_at,
        )
        .await?;

    tracing::info!(
        connection_id = %connection.id,
        organization_id = %payload.org_id,
        "gmail connection established"
    );

    Ok(connection.id.to_string())
}

/// Meta OAuth callback
#[utoipa::path(
    get,
    path = "/auth/meta/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "Signed state token"),
        ("error" = Option<String>, Query, description = "Provider error code")
    ),
    responses(
        (status = 303, description = "Redirect back to the frontend")
    ),
    tag = "oauth"
)]
pub async fn meta_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    if let Some(provider_error) = query.error {
        let reason = query.error_description.unwrap_or(provider_error);
        return error_redirect(&state, "meta", &reason);
    }

    let (Some(code), Some(raw_state)) = (query.code, query.state) else {
        return error_redirect(&state, "meta", "Missing authorization code or state");
    };

    let payload = match verify_callback_state(&state, "meta", &raw_state).await {
        Ok(payload) => payload,
        Err(redirect) => return redirect,
    };

    match complete_meta_connection(&state, &payload, &code).await {
        Ok((connection_id, account_count)) => frontend_redirect(
            &state,
            &[
                ("provider", "meta"),
                ("success", "pending"),
                ("connection_id", &connection_id),
                ("accounts", &account_count.to_string()),
            ],
        ),
        Err(err) => {
            tracing::error!(error = %err, "meta callback failed");
            error_redirect(&state, "meta", "Connection failed, please try again")
        }
    }
}

async fn complete_meta_connection(
    state: &AppState,
    payload: &StatePayload,
    code: &str,
) -> anyhow::Result<(String, usize)> {
    let meta = state
        .meta_client()
        .map_err(|e| anyhow::anyhow!("{}", e.message))?;

    let short_lived = meta.exchange_code(code).await?;

    // Prefer a long-lived token; keep the short-lived one when the upgrade
    // does not yield usable fields.
    let (access_token, expires_in) = match meta.exchange_long_lived(&short_lived.access_token).await
    {
        Ok(Some(long_lived)) => {
            let expires = long_lived.expires_in.unwrap_or(60 * 24 * 60 * 60);
            (long_lived.access_token, expires)
        }
        Ok(None) | Err(_) => {
            let expires = short_lived.expires_in.unwrap_or(60 * 60);
            (short_lived.access_token, expires)
        }
    };

    let profile = meta.fetch_profile(&access_token).await?;
    let email = profile
        .email
        .clone()
        .unwrap_or_else(|| meta::placeholder_email(&profile.id));

    let (ad_accounts, business_id) = discover_ad_accounts(&meta, &access_token).await?;
    let ad_account_ids: Vec<String> = ad_accounts
        .iter()
        .map(|account| meta::normalize_act_id(&account.id))
        .collect();
    let account_count = ad_account_ids.len();

    let connection = state
        .meta_connections()
        .upsert(crate::repositories::meta_connection::MetaAccountUpsert {
            organization_id: payload.org_id,
            user_id: payload.user_id,
            email: &email,
            user_name: profile.name.as_deref(),
            access_token: &access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
            ad_account_ids,
            ad_account_details: json!(ad_accounts),
            business_id,
        })
        .await?;

    tracing::info!(
        connection_id = %connection.id,
        organization_id = %payload.org_id,
        ad_accounts = account_count,
        "meta connection established"
    );

    Ok((connection.id.to_string(), account_count))
}

/// Enumerate the user's ad accounts: every business's owned accounts first,
/// personal accounts only when no business owns any.
async fn discover_ad_accounts(
    meta: &crate::providers::meta::MetaClient,
    access_token: &str,
) -> anyhow::Result<(Vec<AdAccount>, Option<String>)> {
    let businesses = meta.list_businesses(access_token).await?;

    let mut accounts = Vec::new();
    let mut source_business = None;

    for business in &businesses {
        let owned = meta
            .list_owned_ad_accounts(access_token, &business.id)
            .await?;
        if !owned.is_empty() && source_business.is_none() {
            source_business = Some(business.id.clone());
        }
        accounts.extend(owned);
    }

    if accounts.is_empty() {
        accounts = meta.list_personal_ad_accounts(access_token).await?;
    }

    Ok((accounts, source_business))
}
