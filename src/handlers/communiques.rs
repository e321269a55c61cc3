//! Communique creation: durable write first, best-effort relay after.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth;
use crate::error::{self, ApiError};
use crate::models::communique;
use crate::repositories::communique::NewCommunique;
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommuniqueRequest {
    #[serde(rename = "organization_id")]
    pub organization_id: String,
    #[serde(default)]
    pub client_marque: Option<String>,
    #[serde(default)]
    pub sujet_principal: Option<String>,
    #[serde(default)]
    pub date_diffusion: Option<String>,
    #[serde(default)]
    pub contact_nom: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_telephone: Option<String>,
    #[serde(default)]
    pub angle: Option<String>,
    #[serde(default)]
    pub cibles_media: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommuniqueView {
    pub id: String,
    pub client_marque: String,
    pub sujet_principal: String,
    pub date_diffusion: String,
    pub contact_nom: String,
    pub contact_email: String,
    pub contact_telephone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cibles_media: Option<String>,
    pub status: String,
}

impl From<communique::Model> for CommuniqueView {
    fn from(model: communique::Model) -> Self {
        Self {
            id: model.id.to_string(),
            client_marque: model.client_marque,
            sujet_principal: model.sujet_principal,
            date_diffusion: model.date_diffusion,
            contact_nom: model.contact_nom,
            contact_email: model.contact_email,
            contact_telephone: model.contact_telephone,
            angle: model.angle,
            cibles_media: model.cibles_media,
            status: model.status,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateCommuniqueResponse {
    pub success: bool,
    pub communique: CommuniqueView,
}

fn required<'a>(
    value: &'a Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> &'a str {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(name);
            ""
        }
    }
}

/// Create a press-release generation request
#[utoipa::path(
    post,
    path = "/communiques",
    security(("bearer_auth" = [])),
    request_body = CreateCommuniqueRequest,
    responses(
        (status = 200, description = "Communique recorded", body = CreateCommuniqueResponse),
        (status = 400, description = "Missing required fields", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Caller is not a member of the organization", body = ApiError)
    ),
    tag = "relay"
)]
pub async fn create_communique(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateCommuniqueRequest>,
) -> Result<Json<CreateCommuniqueResponse>, ApiError> {
    let (user, organization_id, _role) = auth::validate_auth_and_org(
        &state.config,
        &state.memberships(),
        &headers,
        &body.organization_id,
    )
    .await?;

    let mut missing = Vec::new();
    let client_marque = required(&body.client_marque, "clientMarque", &mut missing);
    let sujet_principal = required(&body.sujet_principal, "sujetPrincipal", &mut missing);
    let date_diffusion = required(&body.date_diffusion, "dateDiffusion", &mut missing);
    let contact_nom = required(&body.contact_nom, "contactNom", &mut missing);
    let contact_email = required(&body.contact_email, "contactEmail", &mut missing);
    let contact_telephone = required(&body.contact_telephone, "contactTelephone", &mut missing);

    if !missing.is_empty() {
        return Err(error::validation_error(
            "MISSING_FIELDS",
            "Required fields are missing",
            json!({ "missing": missing }),
        ));
    }

    let communique = state
        .communiques()
        .create(NewCommunique {
            organization_id,
            user_id: user.id,
            client_marque,
            sujet_principal,
            date_diffusion,
            contact_nom,
            contact_email,
            contact_telephone,
            angle: body.angle.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            cibles_media: body
                .cibles_media
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        })
        .await
        .map_err(ApiError::from)?;

    // The row is durable; a dead automation engine only delays generation.
    if let Some(webhook_url) = &state.config.communique_webhook_url {
        let payload = json!({
            "communique_id": communique.id,
            "organization_id": organization_id,
            "requested_by": user.id,
            "clientMarque": communique.client_marque,
            "sujetPrincipal": communique.sujet_principal,
            "dateDiffusion": communique.date_diffusion,
            "contactNom": communique.contact_nom,
            "contactEmail": communique.contact_email,
            "contactTelephone": communique.contact_telephone,
            "angle": communique.angle,
            "ciblesMedia": communique.cibles_media,
        });
        state.relay.forward_best_effort(webhook_url, &payload).await;
    } else {
        tracing::warn!("communique webhook URL not configured, skipping forward");
    }

    Ok(Json(CreateCommuniqueResponse {
        success: true,
        communique: communique.into(),
    }))
}
