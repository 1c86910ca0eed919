//! Authorization start
//!
//! Begins the OAuth round-trip for a submission: mints a CSRF state token
//! and a PKCE pair, persists them as a pending state record, and builds the
//! authorization URL the visitor is redirected to.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::models::gate::GateAvailability;
use crate::models::oauth_state::OAuthProvider;
use crate::repositories::{GateRepository, SubmissionRepository};
use crate::repositories::oauth_state::NewOAuthState;
use crate::repositories::OAuthStateRepository;
use crate::soundcloud::{generate_pkce, generate_state_token, SoundCloudApi, SoundCloudError};

#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error("Submission not found")]
    SubmissionNotFound,

    #[error("Gate not found")]
    GateNotFound,

    #[error("This gate is no longer active")]
    GateInactive,

    #[error("This gate has expired")]
    GateExpired,

    #[error("failed to build authorization URL: {0}")]
    UrlConstruction(#[source] SoundCloudError),

    #[error("authorization URL is not HTTPS")]
    InsecureAuthorizeUrl,

    #[error(transparent)]
    Store(#[from] sea_orm::DbErr),
}

/// The redirect handed back to the visitor's browser.
#[derive(Debug, Clone)]
pub struct AuthorizationStart {
    pub authorize_url: Url,
    pub state: String,
}

/// Service starting OAuth authorizations for submissions.
pub struct AuthorizationStarter {
    submissions: SubmissionRepository,
    gates: GateRepository,
    states: OAuthStateRepository,
    client: Arc<dyn SoundCloudApi>,
    redirect_uri: String,
    state_ttl_minutes: i64,
}

impl AuthorizationStarter {
    pub fn new(
        submissions: SubmissionRepository,
        gates: GateRepository,
        states: OAuthStateRepository,
        client: Arc<dyn SoundCloudApi>,
        redirect_uri: String,
        state_ttl_minutes: i64,
    ) -> Self {
        Self {
            submissions,
            gates,
            states,
            client,
            redirect_uri,
            state_ttl_minutes,
        }
    }

    /// Begin an authorization round-trip for `submission_id`.
    ///
    /// Every call mints a fresh state record; abandoned attempts simply
    /// expire. The submission's pre-authored comment text is snapshotted
    /// into the state record so the callback posts exactly what the visitor
    /// wrote, even if the submission changes in between.
    pub async fn start(&self, submission_id: uuid::Uuid) -> Result<AuthorizationStart, AuthorizeError> {
        let submission = self
            .submissions
            .find_by_id(submission_id)
            .await?
            .ok_or(AuthorizeError::SubmissionNotFound)?;

        let gate = self
            .gates
            .find_for_verification(submission.gate_id)
            .await?
            .ok_or(AuthorizeError::GateNotFound)?;

        match gate.availability(Utc::now()) {
            GateAvailability::Open => {}
            GateAvailability::Inactive => return Err(AuthorizeError::GateInactive),
            GateAvailability::Expired => return Err(AuthorizeError::GateExpired),
        }

        let state = generate_state_token();
        let pkce = generate_pkce();

        self.states
            .create(
                NewOAuthState {
                    state: state.clone(),
                    provider: OAuthProvider::Soundcloud,
                    submission_id: submission.id,
                    gate_id: gate.id,
                    code_verifier: Some(pkce.verifier),
                    comment_text: submission.comment_text.clone(),
                },
                self.state_ttl_minutes,
            )
            .await?;

        let authorize_url = self
            .client
            .build_authorize_url(&state, &self.redirect_uri, &pkce.challenge)
            .map_err(AuthorizeError::UrlConstruction)?;

        // Visitors are redirected to this URL; anything but HTTPS is a
        // misconfiguration worth failing loudly on.
        if authorize_url.scheme() != "https" {
            return Err(AuthorizeError::InsecureAuthorizeUrl);
        }

        info!(
            submission_id = %submission.id,
            gate_id = %gate.id,
            "started oauth authorization"
        );

        Ok(AuthorizationStart {
            authorize_url,
            state,
        })
    }
}
