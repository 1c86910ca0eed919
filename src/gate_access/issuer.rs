//! Download token issuance
//!
//! Issues a download token once a submission has satisfied every requirement
//! its gate configures. Re-requesting while a token is still valid returns
//! that token unchanged; a new one is minted only when none exists or the
//! previous one expired.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::gate::{self, GateAvailability};
use crate::models::submission::{self, DownloadTokenStatus};
use crate::repositories::{GateRepository, SubmissionRepository};

use super::token::DownloadToken;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Submission not found")]
    SubmissionNotFound,

    #[error("Gate not found")]
    GateNotFound,

    #[error("This gate is no longer active")]
    GateInactive,

    #[error("This gate has expired")]
    GateExpired,

    #[error("Email verification required")]
    EmailVerificationRequired,

    #[error("SoundCloud repost verification required")]
    RepostVerificationRequired,

    #[error("SoundCloud follow verification required")]
    FollowVerificationRequired,

    #[error("SoundCloud connect verification required")]
    ConnectVerificationRequired,

    #[error("Profile visit required")]
    ProfileClickRequired,

    #[error("Download limit reached for this gate")]
    DownloadCapReached,

    #[error(transparent)]
    Store(#[from] sea_orm::DbErr),
}

/// An issued (or re-surfaced) download credential.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Service issuing download tokens against verified submissions.
pub struct DownloadTokenIssuer {
    submissions: SubmissionRepository,
    gates: GateRepository,
    token_ttl_hours: i64,
}

impl DownloadTokenIssuer {
    pub fn new(
        submissions: SubmissionRepository,
        gates: GateRepository,
        token_ttl_hours: i64,
    ) -> Self {
        Self {
            submissions,
            gates,
            token_ttl_hours,
        }
    }

    /// Issue a download token for `submission_id`, or return the currently
    /// valid one.
    pub async fn issue(&self, submission_id: Uuid) -> Result<IssuedToken, IssueError> {
        let now = Utc::now();

        let submission = self
            .submissions
            .find_by_id(submission_id)
            .await?
            .ok_or(IssueError::SubmissionNotFound)?;

        // Idempotent re-request: a still-valid token is handed back as is so
        // a visitor refreshing the success page never invalidates the link
        // they were already given.
        if submission.download_token_status(now) == DownloadTokenStatus::Issued {
            return Ok(IssuedToken {
                token: submission
                    .download_token
                    .clone()
                    .unwrap_or_default(),
                expires_at: submission
                    .download_token_expires_at
                    .unwrap_or(now),
            });
        }

        let gate = self
            .gates
            .find_for_verification(submission.gate_id)
            .await?
            .ok_or(IssueError::GateNotFound)?;

        match gate.availability(now) {
            GateAvailability::Open => {}
            GateAvailability::Inactive => return Err(IssueError::GateInactive),
            GateAvailability::Expired => return Err(IssueError::GateExpired),
        }

        check_requirements(&gate, &submission)?;

        if gate.max_downloads.is_some() {
            let completed = self
                .submissions
                .count_completed_for_gate(gate.id)
                .await?;
            if gate.cap_reached(completed) {
                return Err(IssueError::DownloadCapReached);
            }
        }

        let token = DownloadToken::generate();
        let expires_at = now + Duration::hours(self.token_ttl_hours);
        self.submissions
            .set_download_token(submission.id, token.as_str(), expires_at)
            .await?;

        info!(
            submission_id = %submission.id,
            gate_id = %gate.id,
            expires_at = %expires_at,
            "issued download token"
        );

        Ok(IssuedToken {
            token: token.as_str().to_string(),
            expires_at,
        })
    }
}

/// Check each configured requirement in a fixed order so a submission missing
/// several always hears about the same one first.
fn check_requirements(
    gate: &gate::Model,
    submission: &submission::Model,
) -> Result<(), IssueError> {
    if gate.require_email && !submission.email_verified {
        return Err(IssueError::EmailVerificationRequired);
    }
    if gate.require_repost && !submission.repost_verified {
        return Err(IssueError::RepostVerificationRequired);
    }
    if gate.require_follow && !submission.follow_verified {
        return Err(IssueError::FollowVerificationRequired);
    }
    if gate.require_connect && !submission.connect_verified {
        return Err(IssueError::ConnectVerificationRequired);
    }
    if gate.require_profile_click && !submission.profile_clicked {
        return Err(IssueError::ProfileClickRequired);
    }
    Ok(())
}
