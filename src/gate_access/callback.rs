//! OAuth callback processing
//!
//! The single entry point the platform redirects back to. Validates the CSRF
//! state record, consumes it atomically, exchanges the code, and fans out the
//! gate's side effects. State consumption happens before the token exchange
//! so a state token is burned even when the exchange fails.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::oauth_state::{self, OAuthProvider, OAuthStateStatus};
use crate::repositories::{GateRepository, OAuthStateRepository, SubmissionRepository};
use crate::repositories::submission::VerificationUpdate;
use crate::soundcloud::{SoundCloudApi, SoundCloudError};

use super::side_effects::{SideEffectOrchestrator, SideEffectPlan};

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Missing code or state parameter")]
    MissingParameters,

    #[error("Invalid state token")]
    InvalidState,

    #[error("State token already used")]
    StateAlreadyUsed,

    #[error("State token expired")]
    StateExpired,

    #[error("Invalid OAuth provider")]
    ProviderMismatch,

    #[error("state record is missing its PKCE verifier")]
    MissingPkce,

    #[error("token exchange failed")]
    ExchangeFailed(#[source] SoundCloudError),

    #[error("profile fetch failed")]
    ProfileFetchFailed(#[source] SoundCloudError),

    #[error("Gate not found")]
    GateNotFound,

    #[error(transparent)]
    Store(#[from] sea_orm::DbErr),
}

/// Raw callback query parameters plus request metadata.
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    pub code: Option<String>,
    pub state: Option<String>,
    pub redirect_uri: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// What the handler needs to render the post-authorization redirect.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub gate_slug: String,
    pub buy_link_updated: bool,
}

/// Service processing OAuth callbacks.
pub struct CallbackProcessor {
    states: OAuthStateRepository,
    submissions: SubmissionRepository,
    gates: GateRepository,
    client: Arc<dyn SoundCloudApi>,
    side_effects: SideEffectOrchestrator,
}

impl CallbackProcessor {
    pub fn new(
        states: OAuthStateRepository,
        submissions: SubmissionRepository,
        gates: GateRepository,
        client: Arc<dyn SoundCloudApi>,
        side_effects: SideEffectOrchestrator,
    ) -> Self {
        Self {
            states,
            submissions,
            gates,
            client,
            side_effects,
        }
    }

    pub async fn process(&self, request: CallbackRequest) -> Result<CallbackOutcome, CallbackError> {
        let (code, state_token) = match (request.code.as_deref(), request.state.as_deref()) {
            (Some(code), Some(state)) if !code.is_empty() && !state.is_empty() => (code, state),
            _ => return Err(CallbackError::MissingParameters),
        };

        let record = self
            .states
            .find_by_state_token(state_token)
            .await?
            .ok_or(CallbackError::InvalidState)?;

        match record.status(Utc::now()) {
            OAuthStateStatus::Consumed => return Err(CallbackError::StateAlreadyUsed),
            OAuthStateStatus::Expired => {
                // Burn the record anyway so a later clock skew cannot revive it.
                self.states.mark_used(record.id).await?;
                return Err(CallbackError::StateExpired);
            }
            OAuthStateStatus::Pending => {}
        }

        if record.provider.parse::<OAuthProvider>() != Ok(OAuthProvider::Soundcloud) {
            self.states.mark_used(record.id).await?;
            return Err(CallbackError::ProviderMismatch);
        }

        let Some(code_verifier) = record.code_verifier.clone() else {
            self.states.mark_used(record.id).await?;
            return Err(CallbackError::MissingPkce);
        };

        // The conditional flip is the arbiter between concurrent callbacks
        // carrying the same token: exactly one proceeds past this point.
        if !self.states.mark_used(record.id).await? {
            return Err(CallbackError::StateAlreadyUsed);
        }

        let token = self
            .client
            .exchange_code(code, &request.redirect_uri, &code_verifier)
            .await
            .map_err(CallbackError::ExchangeFailed)?;

        let profile = self
            .client
            .get_profile(&token.access_token)
            .await
            .map_err(CallbackError::ProfileFetchFailed)?;

        let gate = self
            .gates
            .find_for_verification(record.gate_id)
            .await?
            .ok_or(CallbackError::GateNotFound)?;

        info!(
            submission_id = %record.submission_id,
            gate_id = %gate.id,
            soundcloud_user_id = profile.id,
            "oauth callback authenticated"
        );

        // Everything past authentication is best effort. The visitor has
        // proved account ownership; side-effect or bookkeeping failures must
        // not turn that into an error page.
        let report = self
            .side_effects
            .run(&token.access_token, &side_effect_plan(&gate, &record))
            .await;

        let update = VerificationUpdate {
            connect: true,
            repost: report.reposted,
            follow: report.followed,
            ..Default::default()
        };
        if let Err(err) = self
            .submissions
            .update_verification_flags(record.submission_id, update)
            .await
        {
            error!(
                submission_id = %record.submission_id,
                error = %err,
                "failed to persist verification flags after callback"
            );
        }

        if !report.reposted && gate.require_repost {
            warn!(submission_id = %record.submission_id, "required repost did not succeed");
        }
        if !report.followed && gate.require_follow {
            warn!(submission_id = %record.submission_id, "required follow did not succeed");
        }

        Ok(CallbackOutcome {
            gate_slug: gate.slug,
            buy_link_updated: report.buy_link_updated,
        })
    }
}

fn side_effect_plan(
    gate: &crate::models::gate::Model,
    record: &oauth_state::Model,
) -> SideEffectPlan {
    SideEffectPlan {
        track_id: gate.track_id,
        target_user_id: gate.target_user_id,
        comment_text: record.comment_text.clone(),
        buy_link_url: gate.buy_link_url.clone(),
        buy_link_title: gate.buy_link_title.clone(),
    }
}
