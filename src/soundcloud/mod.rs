//! SoundCloud platform client
//!
//! Defines the interface the gate access pipeline uses to talk to
//! SoundCloud: PKCE generation, authorization-URL construction, the
//! code-for-token exchange, profile reads, and the write actions performed as
//! gate side effects.

pub mod http;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

pub use http::HttpSoundCloudClient;

/// SoundCloud client errors
#[derive(Debug, Error)]
pub enum SoundCloudError {
    #[error("OAuth token exchange failed: {0}")]
    OAuth(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// PKCE verifier/challenge pair (RFC 7636, S256 method)
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

/// Generate a fresh PKCE pair: a 32-byte random verifier (base64url, 43
/// characters) and its S256 challenge.
pub fn generate_pkce() -> PkcePair {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let verifier = base64_url::encode(&bytes);

    let digest = Sha256::digest(verifier.as_bytes());
    let challenge = base64_url::encode(&digest);

    PkcePair {
        verifier,
        challenge,
    }
}

/// Generate a cryptographically random CSRF state token (base64url, 43 chars).
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64_url::encode(&bytes)
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// SoundCloud user profile
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub permalink_url: Option<String>,
}

/// Track metadata; `duration` is the track length in milliseconds
#[derive(Debug, Clone, Deserialize)]
pub struct TrackInfo {
    pub id: i64,
    pub duration: i64,
}

/// Outcome of a single write action against the platform
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Interface to the SoundCloud API used by the gate access pipeline.
///
/// The HTTP implementation lives in [`http`]; orchestration tests substitute
/// trait objects.
#[async_trait]
pub trait SoundCloudApi: Send + Sync {
    /// Build the authorization URL the visitor is redirected to.
    fn build_authorize_url(
        &self,
        state: &str,
        redirect_uri: &str,
        code_challenge: &str,
    ) -> Result<Url, SoundCloudError>;

    /// Exchange an authorization code for an access token. The verifier and
    /// redirect URI must be exactly those used in the authorization request.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, SoundCloudError>;

    /// Fetch the authenticated visitor's profile.
    async fn get_profile(&self, access_token: &str) -> Result<Profile, SoundCloudError>;

    /// Repost a track to the visitor's feed.
    async fn create_repost(
        &self,
        access_token: &str,
        track_id: i64,
    ) -> Result<ActionResult, SoundCloudError>;

    /// Like a track.
    async fn create_favorite(
        &self,
        access_token: &str,
        track_id: i64,
    ) -> Result<ActionResult, SoundCloudError>;

    /// Follow a user.
    async fn create_follow(
        &self,
        access_token: &str,
        user_id: i64,
    ) -> Result<ActionResult, SoundCloudError>;

    /// Post a comment on a track, optionally anchored at `timestamp_ms` on
    /// the waveform. Returns the created comment id.
    async fn post_comment(
        &self,
        access_token: &str,
        track_id: i64,
        body: &str,
        timestamp_ms: Option<i64>,
    ) -> Result<i64, SoundCloudError>;

    /// Fetch track metadata (used for comment timestamp placement).
    async fn get_track_info(
        &self,
        access_token: &str,
        track_id: i64,
    ) -> Result<TrackInfo, SoundCloudError>;

    /// Update the track's buy link.
    async fn update_purchase_link(
        &self,
        access_token: &str,
        track_id: i64,
        url: &str,
        title: Option<&str>,
    ) -> Result<ActionResult, SoundCloudError>;
}
