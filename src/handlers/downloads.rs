//! # Download Handler
//!
//! One-time redemption of a download token for the gated file.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::error::ApiError;
use crate::server::AppState;

/// Redeem a download token and redirect to the gated file
#[utoipa::path(
    get,
    path = "/download/{token}",
    params(
        ("token" = String, Path, description = "Download token (64 hex characters)")
    ),
    responses(
        (status = 303, description = "Token redeemed; redirect to the file URL"),
        (status = 404, description = "Unknown or malformed token", body = ApiError),
        (status = 410, description = "Token expired, already used, or gate closed", body = ApiError)
    ),
    tag = "downloads"
)]
pub async fn redeem_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect, ApiError> {
    let redeemed = state.download_redeemer().redeem(&token).await?;
    Ok(Redirect::to(&redeemed.file_url))
}
