//! # Server Configuration
//!
//! Server setup and configuration for the Fangate API: shared application
//! state, service wiring, the router, and the OpenAPI document.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::analytics::{AnalyticsSink, LoggingAnalyticsSink, LoggingPixelDispatcher, PixelDispatcher};
use crate::config::AppConfig;
use crate::gate_access::{
    AuthorizationStarter, CallbackProcessor, DownloadRedeemer, DownloadTokenIssuer,
    SideEffectOrchestrator,
};
use crate::handlers;
use crate::repositories::{GateRepository, OAuthStateRepository, SubmissionRepository};
use crate::soundcloud::http::{HttpSoundCloudClient, SoundCloudConfig};
use crate::soundcloud::SoundCloudApi;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub soundcloud: Arc<dyn SoundCloudApi>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub pixels: Arc<dyn PixelDispatcher>,
}

impl AppState {
    pub fn db_arc(&self) -> Arc<DatabaseConnection> {
        Arc::new(self.db.clone())
    }

    /// Redirect URI registered with the SoundCloud application. Local
    /// profiles fall back to the loopback callback.
    pub fn oauth_redirect_uri(&self) -> String {
        self.config
            .oauth_redirect_uri
            .clone()
            .unwrap_or_else(|| "http://localhost:8080/oauth/soundcloud/callback".to_string())
    }

    pub fn authorization_starter(&self) -> AuthorizationStarter {
        AuthorizationStarter::new(
            SubmissionRepository::new(self.db_arc()),
            GateRepository::new(self.db_arc()),
            OAuthStateRepository::new(self.db_arc()),
            Arc::clone(&self.soundcloud),
            self.oauth_redirect_uri(),
            self.config.oauth_state_ttl_minutes,
        )
    }

    pub fn callback_processor(&self) -> CallbackProcessor {
        CallbackProcessor::new(
            OAuthStateRepository::new(self.db_arc()),
            SubmissionRepository::new(self.db_arc()),
            GateRepository::new(self.db_arc()),
            Arc::clone(&self.soundcloud),
            SideEffectOrchestrator::new(
                Arc::clone(&self.soundcloud),
                Duration::from_secs(self.config.side_effect_timeout_secs),
            ),
        )
    }

    pub fn download_token_issuer(&self) -> DownloadTokenIssuer {
        DownloadTokenIssuer::new(
            SubmissionRepository::new(self.db_arc()),
            GateRepository::new(self.db_arc()),
            self.config.download_token_ttl_hours,
        )
    }

    pub fn download_redeemer(&self) -> DownloadRedeemer {
        DownloadRedeemer::new(
            SubmissionRepository::new(self.db_arc()),
            GateRepository::new(self.db_arc()),
            Arc::clone(&self.analytics),
            Arc::clone(&self.pixels),
        )
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/gates/{slug}/submissions",
            post(handlers::gates::create_submission),
        )
        .route(
            "/submissions/{id}/authorize",
            post(handlers::submissions::start_authorization),
        )
        .route(
            "/submissions/{id}/download-token",
            post(handlers::submissions::request_download_token),
        )
        .route(
            "/submissions/{id}/profile-click",
            post(handlers::submissions::record_profile_click),
        )
        .route(
            "/oauth/soundcloud/callback",
            get(handlers::oauth::soundcloud_callback),
        )
        .route("/download/{token}", get(handlers::downloads::redeem_download))
        .layer(TraceLayer::new_for_http())
        // Outermost so every handler (and the errors it builds) sees the
        // request's trace id.
        .layer(middleware::from_fn(crate::telemetry::trace_context_middleware))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let soundcloud_config = SoundCloudConfig::new(
        config.soundcloud_client_id.clone().unwrap_or_default(),
        config.soundcloud_client_secret.clone().unwrap_or_default(),
    )
    .with_bases(
        config.soundcloud_oauth_base.clone(),
        config.soundcloud_api_base.clone(),
    );

    let state = AppState {
        config: config.clone(),
        db,
        soundcloud: Arc::new(HttpSoundCloudClient::new(soundcloud_config)),
        analytics: Arc::new(LoggingAnalyticsSink),
        pixels: Arc::new(LoggingPixelDispatcher),
    };
    let app = create_app(state);

    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on: {}", addr);
    println!("Running in profile: {}", config.profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::gates::create_submission,
        crate::handlers::submissions::start_authorization,
        crate::handlers::submissions::request_download_token,
        crate::handlers::submissions::record_profile_click,
        crate::handlers::oauth::soundcloud_callback,
        crate::handlers::downloads::redeem_download,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::gates::CreateSubmissionRequest,
            crate::handlers::gates::SubmissionResponse,
            crate::handlers::submissions::AuthorizeUrlResponse,
            crate::handlers::submissions::DownloadTokenResponse,
        )
    ),
    info(
        title = "Fangate API",
        description = "Gated download pages with SoundCloud verification",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
