//! # Server Configuration
//!
//! Router assembly, shared application state, and the request middleware
//! stack (trace context + CORS) for the Pressrelay API.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use sea_orm::DatabaseConnection;
use serde_json::json;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::cors;
use crate::crypto::TokenCipher;
use crate::db;
use crate::error::ApiError;
use crate::handlers;
use crate::providers::google::GoogleClient;
use crate::providers::meta::MetaClient;
use crate::relay::RelayClient;
use crate::repositories::communique::CommuniqueRepository;
use crate::repositories::gmail_connection::GmailConnectionRepository;
use crate::repositories::market_watch::MarketWatchRepository;
use crate::repositories::media_asset::MediaAssetRepository;
use crate::repositories::membership::MembershipRepository;
use crate::repositories::meta_connection::MetaConnectionRepository;
use crate::state_token::StateCodec;
use crate::storage::StorageClient;
use crate::telemetry::{self, TraceContext};
use crate::token_refresh::TokenRefreshManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub relay: RelayClient,
    pub storage: StorageClient,
    /// Client for media downloads; per-request timeouts come from config.
    pub media_http: reqwest::Client,
    cipher: TokenCipher,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        let cipher = TokenCipher::new(config.crypto_key.clone())?;
        let relay = RelayClient::new(config.relay_signing_secret.clone());
        let storage = StorageClient::new(
            config.storage.base_url.clone(),
            config.storage.api_token.clone(),
            config.storage.bucket.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            relay,
            storage,
            media_http: reqwest::Client::new(),
            cipher,
        })
    }

    pub fn memberships(&self) -> MembershipRepository {
        MembershipRepository::new(self.db.clone())
    }

    pub fn gmail_connections(&self) -> GmailConnectionRepository {
        GmailConnectionRepository::new(self.db.clone(), self.cipher.clone())
    }

    pub fn meta_connections(&self) -> MetaConnectionRepository {
        MetaConnectionRepository::new(self.db.clone(), self.cipher.clone())
    }

    pub fn communiques(&self) -> CommuniqueRepository {
        CommuniqueRepository::new(self.db.clone())
    }

    pub fn market_watch(&self) -> MarketWatchRepository {
        MarketWatchRepository::new(self.db.clone())
    }

    pub fn media_assets(&self) -> MediaAssetRepository {
        MediaAssetRepository::new(self.db.clone())
    }

    pub fn state_codec(&self) -> Result<StateCodec, ApiError> {
        let secret = self
            .config
            .state_secret
            .as_deref()
            .ok_or_else(|| ApiError::from(anyhow::anyhow!("state secret not configured")))?;

        Ok(StateCodec::new(
            secret.as_bytes().to_vec(),
            Duration::from_secs(self.config.state_max_age_seconds),
        ))
    }

    pub fn google_client(&self) -> Result<GoogleClient, ApiError> {
        GoogleClient::from_config(&self.config).map_err(|_| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "OAUTH_NOT_CONFIGURED",
                "Gmail OAuth credentials are not configured",
            )
        })
    }

    pub fn meta_client(&self) -> Result<MetaClient, ApiError> {
        MetaClient::from_config(&self.config).map_err(|_| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "OAUTH_NOT_CONFIGURED",
                "Meta OAuth credentials are not configured",
            )
        })
    }

    pub fn token_manager(&self) -> Result<TokenRefreshManager, ApiError> {
        Ok(TokenRefreshManager::new(
            self.gmail_connections(),
            self.google_client()?,
            Duration::from_secs(self.config.token_refresh.safety_margin_seconds),
        ))
    }
}

/// Wrap every request in a fresh trace context and echo the trace ID back.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let context = TraceContext {
        trace_id: trace_id.clone(),
    };
    let mut response = telemetry::with_trace_context(context, next.run(request)).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("x-trace-id", value);
    }

    tracing::info!(
        method = %method,
        path,
        status = response.status().as_u16(),
        trace_id,
        "request handled"
    );

    response
}

async fn cors_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        cors::apply_cors_headers(response.headers_mut(), origin.as_deref(), &state.config);
        return response;
    }

    let mut response = next.run(request).await;
    cors::apply_cors_headers(response.headers_mut(), origin.as_deref(), &state.config);
    response
}

/// Liveness/readiness probe.
async fn health(State(state): State<AppState>) -> Response {
    match db::health_check(&state.db).await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(health))
        .route("/auth/gmail/init", post(handlers::oauth::gmail_init))
        .route("/auth/gmail/callback", get(handlers::oauth::gmail_callback))
        .route("/auth/meta/init", post(handlers::oauth::meta_init))
        .route("/auth/meta/callback", get(handlers::oauth::meta_callback))
        .route("/communiques", post(handlers::communiques::create_communique))
        .route(
            "/market-watch/generate",
            post(handlers::market_watch::generate_market_watch),
        )
        .route(
            "/media-assets/persist",
            post(handlers::media::persist_media_assets),
        )
        .route("/creatives/search", post(handlers::creatives::search_creatives))
        .route(
            "/connections/meta",
            get(handlers::connections::list_meta_connections)
                .post(handlers::connections::list_meta_connections),
        )
        .route("/emails/read", post(handlers::emails::read_emails))
        .layer(middleware::from_fn_with_state(state.clone(), cors_middleware))
        .layer(middleware::from_fn(trace_context_middleware))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::oauth::gmail_init,
        crate::handlers::oauth::gmail_callback,
        crate::handlers::oauth::meta_init,
        crate::handlers::oauth::meta_callback,
        crate::handlers::communiques::create_communique,
        crate::handlers::market_watch::generate_market_watch,
        crate::handlers::media::persist_media_assets,
        crate::handlers::creatives::search_creatives,
        crate::handlers::connections::list_meta_connections,
        crate::handlers::emails::read_emails,
    ),
    components(
        schemas(
            crate::handlers::ServiceInfo,
            crate::handlers::oauth::OAuthInitRequest,
            crate::handlers::oauth::OAuthInitResponse,
            crate::handlers::communiques::CreateCommuniqueRequest,
            crate::handlers::communiques::CreateCommuniqueResponse,
            crate::handlers::communiques::CommuniqueView,
            crate::handlers::market_watch::MarketWatchRequest,
            crate::handlers::market_watch::MarketWatchResponse,
            crate::handlers::market_watch::MarketWatchDocumentView,
            crate::handlers::media::MediaItem,
            crate::handlers::media::MediaItemResult,
            crate::handlers::media::PersistMediaResponse,
            crate::handlers::creatives::SearchCreativesRequest,
            crate::handlers::creatives::SearchCreativesResponse,
            crate::handlers::connections::MetaConnectionView,
            crate::handlers::emails::ReadEmailsRequest,
            crate::handlers::emails::ReadEmailsResponse,
            crate::providers::google::EmailSummary,
            crate::error::ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Pressrelay API",
        description = "OAuth connections and webhook relay for the Pressrelay platform",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
