//! # Server Configuration
//!
//! Router assembly, shared application state and server startup for the
//! community console API.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth;
use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::handlers;
use crate::storage::{BlobStore, FsBlobStore};
use crate::telemetry::{self, TraceContext};
use crate::tenancy::TenantCache;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    /// Key for community credential bundles; absent in local profiles
    pub crypto_key: Option<Arc<CryptoKey>>,
    pub blobs: Arc<dyn BlobStore>,
    pub tenants: TenantCache,
}

impl AppState {
    /// Build state from configuration and an initialized pool.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, crate::crypto::CryptoError> {
        let crypto_key = config
            .crypto_key
            .clone()
            .map(CryptoKey::new)
            .transpose()?
            .map(Arc::new);

        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
            config.media.root.clone(),
            config.media.base_url.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            crypto_key,
            blobs,
            tenants: TenantCache::new(),
        })
    }
}

/// Attach a fresh trace context to every request so logs and error payloads
/// share a request identifier.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let context = TraceContext::new();
    let trace_id = context.trace_id.clone();

    let mut response = telemetry::with_trace_context(context, next.run(request)).await;

    if let Ok(value) = trace_id.parse() {
        response.headers_mut().insert("x-trace-id", value);
    }
    response
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/v1/auth/sign-up", post(handlers::auth::sign_up))
        .route("/api/v1/auth/sign-in", post(handlers::auth::sign_in))
        .route(
            "/api/v1/auth/password-reset",
            post(handlers::auth::request_password_reset),
        );

    let protected = Router::new()
        .route("/api/v1/auth/sign-out", post(handlers::auth::sign_out))
        .route(
            "/api/v1/auth/password-change",
            post(handlers::auth::change_password),
        )
        .route(
            "/api/v1/auth/me",
            get(handlers::auth::me).patch(handlers::auth::update_me),
        )
        .route(
            "/api/v1/communities",
            get(handlers::communities::list_communities)
                .post(handlers::communities::create_community),
        )
        .route(
            "/api/v1/communities/{slug}",
            patch(handlers::communities::update_community)
                .delete(handlers::communities::delete_community),
        )
        .route(
            "/api/v1/communities/{slug}/credentials",
            get(handlers::communities::get_community_credentials),
        )
        .route("/api/v1/enter", get(handlers::communities::enter_community))
        .route(
            "/api/v1/enter/{slug}",
            get(handlers::communities::enter_community_by_path),
        )
        .route(
            "/api/v1/communities/{slug}/principals",
            get(handlers::principals::list_principals)
                .post(handlers::principals::create_principal),
        )
        .route("/api/v1/admins", get(handlers::principals::list_admins))
        .route(
            "/api/v1/principals/{id}",
            patch(handlers::principals::update_principal)
                .delete(handlers::principals::remove_principal),
        )
        .route(
            "/api/v1/communities/{slug}/carousel",
            get(handlers::content::get_carousel).put(handlers::content::put_carousel),
        )
        .route(
            "/api/v1/communities/{slug}/buttons",
            get(handlers::content::get_buttons).put(handlers::content::put_buttons),
        )
        .route(
            "/api/v1/front/config",
            get(handlers::content::get_front_config),
        )
        .route(
            "/api/v1/communities/{slug}/media",
            post(handlers::content::upload_media),
        )
        .route("/api/v1/alerts", post(handlers::alerts::raise_alert))
        .route(
            "/api/v1/communities/{slug}/alerts",
            get(handlers::alerts::list_alerts),
        )
        .route(
            "/api/v1/alerts/{id}/acknowledge",
            post(handlers::alerts::acknowledge_alert),
        )
        .route(
            "/api/v1/alerts/{id}/resolve",
            post(handlers::alerts::resolve_alert),
        )
        .route(
            "/api/v1/communities/{slug}/residents/import",
            post(handlers::import::import_residents),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    public
        .merge(protected)
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build an [`AppState`] for handler tests: filesystem media under a temp
/// path and no credential encryption unless the config carries a key.
#[cfg(test)]
pub fn create_test_app_state(config: AppConfig, db: DatabaseConnection) -> AppState {
    AppState::new(config, db).unwrap()
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::sign_up,
        crate::handlers::auth::sign_in,
        crate::handlers::auth::sign_out,
        crate::handlers::auth::request_password_reset,
        crate::handlers::auth::change_password,
        crate::handlers::auth::me,
        crate::handlers::auth::update_me,
        crate::handlers::communities::list_communities,
        crate::handlers::communities::create_community,
        crate::handlers::communities::update_community,
        crate::handlers::communities::delete_community,
        crate::handlers::communities::get_community_credentials,
        crate::handlers::communities::enter_community,
        crate::handlers::communities::enter_community_by_path,
        crate::handlers::principals::list_principals,
        crate::handlers::principals::list_admins,
        crate::handlers::principals::create_principal,
        crate::handlers::principals::update_principal,
        crate::handlers::principals::remove_principal,
        crate::handlers::content::get_carousel,
        crate::handlers::content::put_carousel,
        crate::handlers::content::get_buttons,
        crate::handlers::content::put_buttons,
        crate::handlers::content::get_front_config,
        crate::handlers::content::upload_media,
        crate::handlers::alerts::raise_alert,
        crate::handlers::alerts::list_alerts,
        crate::handlers::alerts::acknowledge_alert,
        crate::handlers::alerts::resolve_alert,
        crate::handlers::import::import_residents,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::carousel_config::CarouselDocument,
            crate::models::carousel_config::CarouselItem,
            crate::models::carousel_config::PlaybackConfig,
            crate::models::carousel_config::MediaKind,
            crate::models::carousel_config::TransitionEffect,
            crate::models::carousel_config::LoopPolicy,
            crate::models::button_config::ButtonDocument,
            crate::models::button_config::ButtonSlot,
            crate::models::alert::AlertStatus,
            crate::models::community::CommunityStatus,
            crate::auth::Role,
            crate::auth::AccountStatus,
            crate::auth::PageArea,
            crate::content::ContentSource,
            crate::tenancy::CommunitySummary,
            crate::handlers::types::PrincipalDto,
            crate::handlers::auth::SignUpRequestDto,
            crate::handlers::auth::SignInRequestDto,
            crate::handlers::auth::SessionDto,
            crate::handlers::auth::PasswordResetRequestDto,
            crate::handlers::auth::PasswordChangeRequestDto,
            crate::handlers::auth::ProfileUpdateDto,
            crate::handlers::communities::CreateCommunityDto,
            crate::handlers::communities::UpdateCommunityDto,
            crate::handlers::communities::CommunityDto,
            crate::handlers::communities::EnterCommunityDto,
            crate::handlers::principals::CreateManagedPrincipalDto,
            crate::handlers::principals::UpdateManagedPrincipalDto,
            crate::handlers::content::CarouselConfigDto,
            crate::handlers::content::ButtonConfigDto,
            crate::handlers::content::FrontConfigDto,
            crate::handlers::content::MediaUploadDto,
            crate::handlers::alerts::RaiseAlertDto,
            crate::handlers::alerts::AlertDto,
            crate::handlers::import::ImportRequestDto,
            crate::import::ImportRow,
            crate::import::ImportReport,
            crate::import::RowFailure,
        )
    ),
    info(
        title = "Courtyard Community Console API",
        description = "Multi-tenant management console for residential communities",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
