//! Download token redemption
//!
//! Exchanges a valid token for the gated file URL exactly once. The
//! conditional completion flip is the arbiter between concurrent redemptions;
//! analytics and pixel dispatch are spawned fire-and-forget after the
//! redemption is committed.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::analytics::{
    hash_email, AnalyticsEvent, AnalyticsSink, ConversionEvent, PixelConfig, PixelDispatcher,
};
use crate::models::gate::{self, GateAvailability};
use crate::models::submission::{self, DownloadTokenStatus};
use crate::repositories::{GateRepository, SubmissionRepository};

use super::token::DownloadToken;

#[derive(Debug, Error)]
pub enum RedeemError {
    #[error("Invalid download token")]
    InvalidToken,

    #[error("Download token has expired")]
    ExpiredToken,

    #[error("Download token has already been used")]
    AlreadyUsed,

    #[error("This gate is no longer active")]
    GateInactive,

    #[error("This gate has expired")]
    GateExpired,

    #[error(transparent)]
    Store(#[from] sea_orm::DbErr),
}

/// A successfully redeemed download.
#[derive(Debug, Clone)]
pub struct RedeemedDownload {
    pub file_url: String,
    pub gate_slug: String,
}

/// Service redeeming download tokens.
pub struct DownloadRedeemer {
    submissions: SubmissionRepository,
    gates: GateRepository,
    analytics: Arc<dyn AnalyticsSink>,
    pixels: Arc<dyn PixelDispatcher>,
}

impl DownloadRedeemer {
    pub fn new(
        submissions: SubmissionRepository,
        gates: GateRepository,
        analytics: Arc<dyn AnalyticsSink>,
        pixels: Arc<dyn PixelDispatcher>,
    ) -> Self {
        Self {
            submissions,
            gates,
            analytics,
            pixels,
        }
    }

    /// Redeem `candidate` and return the gated file URL.
    ///
    /// A malformed token is rejected before any database access. Expired and
    /// already-used tokens are reported distinctly; neither touches the
    /// gate's download counter.
    pub async fn redeem(&self, candidate: &str) -> Result<RedeemedDownload, RedeemError> {
        let token = DownloadToken::parse(candidate).ok_or(RedeemError::InvalidToken)?;
        let now = Utc::now();

        let submission = self
            .submissions
            .find_by_download_token(token.as_str())
            .await?
            .ok_or(RedeemError::InvalidToken)?;

        match submission.download_token_status(now) {
            DownloadTokenStatus::Issued => {}
            DownloadTokenStatus::Redeemed => return Err(RedeemError::AlreadyUsed),
            DownloadTokenStatus::Expired => return Err(RedeemError::ExpiredToken),
            // Unreachable when the row was found by token, kept total.
            DownloadTokenStatus::Absent => return Err(RedeemError::InvalidToken),
        }

        let gate = self
            .gates
            .find_for_verification(submission.gate_id)
            .await?
            .ok_or(RedeemError::InvalidToken)?;

        match gate.availability(now) {
            GateAvailability::Open => {}
            GateAvailability::Inactive => return Err(RedeemError::GateInactive),
            GateAvailability::Expired => return Err(RedeemError::GateExpired),
        }

        // Exactly one concurrent redeemer wins this flip.
        if !self.submissions.mark_download_complete(submission.id).await? {
            return Err(RedeemError::AlreadyUsed);
        }

        self.gates.increment_download_count(gate.id).await?;

        info!(
            submission_id = %submission.id,
            gate_id = %gate.id,
            "download redeemed"
        );

        self.spawn_conversion_tracking(&gate, &submission);

        Ok(RedeemedDownload {
            file_url: gate.file_url,
            gate_slug: gate.slug,
        })
    }

    /// Record the conversion off the request path. The visitor's file
    /// response never waits on analytics.
    fn spawn_conversion_tracking(&self, gate: &gate::Model, submission: &submission::Model) {
        let analytics = Arc::clone(&self.analytics);
        let pixels = Arc::clone(&self.pixels);
        let pixel_config = PixelConfig::from_gate_value(gate.pixel_config.as_ref());

        let event = AnalyticsEvent {
            gate_id: gate.id,
            event_type: "download".to_string(),
            ip_address: submission.ip_address.clone(),
            user_agent: submission.user_agent.clone(),
        };
        let conversion = ConversionEvent {
            event_name: "Download".to_string(),
            gate_id: gate.id,
            hashed_email: Some(hash_email(&submission.email)),
            ip_address: submission.ip_address.clone(),
            user_agent: submission.user_agent.clone(),
        };

        tokio::spawn(async move {
            if let Err(err) = analytics.track(event).await {
                warn!(error = %err, "failed to record download event");
            }

            for pixel in pixel_config.enabled_pixels() {
                if let Err(err) = pixels.send_event(pixel, &conversion).await {
                    warn!(
                        platform = ?pixel.platform,
                        error = %err,
                        "failed to dispatch pixel event"
                    );
                }
            }
        });
    }
}
