//! # API Handlers
//!
//! HTTP endpoint handlers for the Fangate API. Handlers are thin: they
//! extract request data, delegate to the gate access services, and map domain
//! errors onto [`ApiError`](crate::error::ApiError) responses.

pub mod downloads;
pub mod gates;
pub mod oauth;
pub mod submissions;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service health
    pub status: String,
}

/// Liveness/readiness probe verifying database connectivity
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    crate::db::health_check(&state.db).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// Pull the visitor's IP and user agent out of the request headers for
/// analytics capture. Proxied deployments forward the client IP.
pub(crate) fn request_metadata(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty());

    (ip_address, user_agent)
}
