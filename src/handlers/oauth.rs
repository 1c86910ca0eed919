//! # OAuth Callback Handler
//!
//! The redirect target registered with the SoundCloud application. On success
//! the visitor's browser is sent back to the gate landing page.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::gate_access::CallbackRequest;
use crate::server::AppState;

/// Query parameters SoundCloud appends to the redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Complete the SoundCloud OAuth flow
#[utoipa::path(
    get,
    path = "/oauth/soundcloud/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "CSRF state token")
    ),
    responses(
        (status = 303, description = "Authorization complete; redirect to the gate page"),
        (status = 400, description = "Invalid, expired, or replayed state token", body = ApiError),
        (status = 502, description = "SoundCloud request failed", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn soundcloud_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let (ip_address, user_agent) = super::request_metadata(&headers);

    let outcome = state
        .callback_processor()
        .process(CallbackRequest {
            code: params.code,
            state: params.state,
            redirect_uri: state.oauth_redirect_uri(),
            ip_address,
            user_agent,
        })
        .await?;

    Ok(Redirect::to(&format!(
        "/gates/{}?connected=true",
        outcome.gate_slug
    )))
}
