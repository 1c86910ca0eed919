//! # Submission Handlers
//!
//! Verification endpoints operating on an existing submission: starting the
//! OAuth flow, requesting a download token, and recording profile clicks.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::repositories::submission::VerificationUpdate;
use crate::repositories::SubmissionRepository;
use crate::server::AppState;

/// OAuth authorization URL response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizeUrlResponse {
    /// Complete authorization URL for visitor redirection
    pub authorize_url: String,
}

/// Issued download token response
#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadTokenResponse {
    /// Single-use download token (64 hex characters)
    pub download_token: String,
    /// When the token stops being redeemable
    pub expires_at: DateTime<Utc>,
}

/// Start the SoundCloud OAuth flow for a submission
#[utoipa::path(
    post,
    path = "/submissions/{id}/authorize",
    params(
        ("id" = Uuid, Path, description = "Submission id")
    ),
    responses(
        (status = 200, description = "Authorization URL generated", body = AuthorizeUrlResponse),
        (status = 404, description = "Submission or gate not found", body = ApiError),
        (status = 410, description = "Gate inactive or expired", body = ApiError)
    ),
    tag = "submissions"
)]
pub async fn start_authorization(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuthorizeUrlResponse>, ApiError> {
    let start = state.authorization_starter().start(id).await?;

    Ok(Json(AuthorizeUrlResponse {
        authorize_url: start.authorize_url.to_string(),
    }))
}

/// Request a download token for a fully verified submission
#[utoipa::path(
    post,
    path = "/submissions/{id}/download-token",
    params(
        ("id" = Uuid, Path, description = "Submission id")
    ),
    responses(
        (status = 200, description = "Download token issued", body = DownloadTokenResponse),
        (status = 403, description = "A required verification is missing", body = ApiError),
        (status = 404, description = "Submission or gate not found", body = ApiError),
        (status = 410, description = "Gate closed or download cap reached", body = ApiError)
    ),
    tag = "submissions"
)]
pub async fn request_download_token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DownloadTokenResponse>, ApiError> {
    let issued = state.download_token_issuer().issue(id).await?;

    Ok(Json(DownloadTokenResponse {
        download_token: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// Record that the visitor clicked through to the configured profile/buy link
#[utoipa::path(
    post,
    path = "/submissions/{id}/profile-click",
    params(
        ("id" = Uuid, Path, description = "Submission id")
    ),
    responses(
        (status = 204, description = "Click recorded"),
        (status = 404, description = "Submission not found", body = ApiError)
    ),
    tag = "submissions"
)]
pub async fn record_profile_click(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let submissions = SubmissionRepository::new(state.db_arc());

    // Monotonic: repeated clicks keep the first timestamp.
    submissions
        .update_verification_flags(
            id,
            VerificationUpdate {
                profile_click: true,
                ..Default::default()
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
