//! Submission entity model
//!
//! A submission is one visitor's attempt to satisfy a gate's requirements.
//! Each verification flag is monotonic: it only ever transitions false to
//! true, and its timestamp records the first transition.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Submission entity tracking a visitor's verification progress on a gate
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Gate this submission belongs to
    pub gate_id: Uuid,

    /// Visitor email captured at submission time
    pub email: String,

    /// Email requirement satisfied
    pub email_verified: bool,
    pub email_verified_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Repost requirement satisfied
    pub repost_verified: bool,
    pub repost_verified_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Follow requirement satisfied
    pub follow_verified: bool,
    pub follow_verified_at: Option<chrono::DateTime<chrono::Utc>>,

    /// SoundCloud account connected (OAuth completed)
    pub connect_verified: bool,
    pub connect_verified_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Profile/buy link visited
    pub profile_clicked: bool,
    pub profile_clicked_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Comment text the visitor authored at submission time, posted to the
    /// track after a successful authorization
    pub comment_text: Option<String>,

    /// Currently issued download token (64 hex characters)
    pub download_token: Option<String>,

    /// Expiry of the issued download token
    pub download_token_expires_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Terminal one-time redemption flag, never reset
    pub download_completed: bool,
    pub download_completed_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Visitor IP captured for analytics
    pub ip_address: Option<String>,

    /// Visitor user agent captured for analytics
    pub user_agent: Option<String>,

    /// When the submission was created
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// When the submission was last updated
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// State of a submission's download credential.
///
/// Derived in one place so the issuer and the redeemer never re-implement
/// the expiry/completion arithmetic independently. `Redeemed` wins over
/// `Expired` so a replayed token is always reported as already used rather
/// than merely expired, matching how consumed state tokens are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadTokenStatus {
    /// No token has been issued yet
    Absent,
    /// A token exists and is still redeemable
    Issued,
    /// A token exists but its expiry has passed
    Expired,
    /// The download was completed; terminal
    Redeemed,
}

impl Model {
    /// Derive the download credential's status at `now`.
    pub fn download_token_status(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> DownloadTokenStatus {
        if self.download_completed {
            return DownloadTokenStatus::Redeemed;
        }
        match (&self.download_token, self.download_token_expires_at) {
            (Some(_), Some(expires_at)) if expires_at > now => DownloadTokenStatus::Issued,
            (Some(_), _) => DownloadTokenStatus::Expired,
            (None, _) => DownloadTokenStatus::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn submission() -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            gate_id: Uuid::new_v4(),
            email: "fan@example.com".to_string(),
            email_verified: true,
            email_verified_at: Some(now),
            repost_verified: false,
            repost_verified_at: None,
            follow_verified: false,
            follow_verified_at: None,
            connect_verified: false,
            connect_verified_at: None,
            profile_clicked: false,
            profile_clicked_at: None,
            comment_text: None,
            download_token: None,
            download_token_expires_at: None,
            download_completed: false,
            download_completed_at: None,
            ip_address: None,
            user_agent: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_status_absent_without_token() {
        assert_eq!(
            submission().download_token_status(Utc::now()),
            DownloadTokenStatus::Absent
        );
    }

    #[test]
    fn token_status_issued_while_unexpired() {
        let mut s = submission();
        s.download_token = Some("ab".repeat(32));
        s.download_token_expires_at = Some(Utc::now() + Duration::hours(24));
        assert_eq!(
            s.download_token_status(Utc::now()),
            DownloadTokenStatus::Issued
        );
    }

    #[test]
    fn token_status_expired_after_expiry() {
        let mut s = submission();
        s.download_token = Some("ab".repeat(32));
        s.download_token_expires_at = Some(Utc::now() - Duration::minutes(1));
        assert_eq!(
            s.download_token_status(Utc::now()),
            DownloadTokenStatus::Expired
        );
    }

    #[test]
    fn token_status_redeemed_is_terminal() {
        let mut s = submission();
        s.download_token = Some("ab".repeat(32));
        s.download_token_expires_at = Some(Utc::now() + Duration::hours(24));
        s.download_completed = true;
        assert_eq!(
            s.download_token_status(Utc::now()),
            DownloadTokenStatus::Redeemed
        );
    }

    #[test]
    fn token_status_redeemed_wins_over_expired() {
        let mut s = submission();
        s.download_token = Some("ab".repeat(32));
        s.download_token_expires_at = Some(Utc::now() - Duration::hours(1));
        s.download_completed = true;
        assert_eq!(
            s.download_token_status(Utc::now()),
            DownloadTokenStatus::Redeemed
        );
    }
}
