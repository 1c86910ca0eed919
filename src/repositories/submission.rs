//! # Submission Repository
//!
//! Database operations for submissions: monotonic verification-flag updates,
//! download-token persistence, and the one-time completion flip.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::submission::{self, Entity, Model};

/// Parameters for creating a new submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub gate_id: Uuid,
    pub email: String,
    pub comment_text: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Whether the email requirement is satisfied immediately (single opt-in)
    pub email_verified: bool,
}

/// Which verification flags to raise. Every field is monotonic: `true` means
/// "mark satisfied now", `false` means "leave as is". A flag that is already
/// set keeps its original timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationUpdate {
    pub email: bool,
    pub repost: bool,
    pub follow: bool,
    pub connect: bool,
    pub profile_click: bool,
}

/// Repository for submission database operations
#[derive(Clone)]
pub struct SubmissionRepository {
    db: Arc<DatabaseConnection>,
}

impl SubmissionRepository {
    /// Create a new submission repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a new submission with all verification flags down except,
    /// optionally, the email flag.
    pub async fn create(&self, new: NewSubmission) -> Result<Model, sea_orm::DbErr> {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            gate_id: new.gate_id,
            email: new.email,
            email_verified: new.email_verified,
            email_verified_at: new.email_verified.then_some(now),
            repost_verified: false,
            repost_verified_at: None,
            follow_verified: false,
            follow_verified_at: None,
            connect_verified: false,
            connect_verified_at: None,
            profile_clicked: false,
            profile_clicked_at: None,
            comment_text: new.comment_text,
            download_token: None,
            download_token_expires_at: None,
            download_completed: false,
            download_completed_at: None,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            created_at: now,
            updated_at: now,
        };

        Entity::insert(model.clone().into_active_model())
            .exec_without_returning(&*self.db)
            .await?;

        Ok(model)
    }

    /// Find a submission by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find_by_id(id).one(&*self.db).await
    }

    /// Find the submission holding a given download token.
    pub async fn find_by_download_token(
        &self,
        token: &str,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(submission::Column::DownloadToken.eq(token))
            .one(&*self.db)
            .await
    }

    /// Raise verification flags monotonically.
    ///
    /// Each flag is raised with a conditional update that only fires while
    /// the flag is still down, so concurrent raises of the same flag write
    /// the first-transition timestamp exactly once and repeated calls are
    /// no-ops.
    pub async fn update_verification_flags(
        &self,
        id: Uuid,
        update: VerificationUpdate,
    ) -> Result<Model, sea_orm::DbErr> {
        let now = Utc::now();

        if update.email {
            self.raise_flag(
                id,
                submission::Column::EmailVerified,
                submission::Column::EmailVerifiedAt,
                now,
            )
            .await?;
        }
        if update.repost {
            self.raise_flag(
                id,
                submission::Column::RepostVerified,
                submission::Column::RepostVerifiedAt,
                now,
            )
            .await?;
        }
        if update.follow {
            self.raise_flag(
                id,
                submission::Column::FollowVerified,
                submission::Column::FollowVerifiedAt,
                now,
            )
            .await?;
        }
        if update.connect {
            self.raise_flag(
                id,
                submission::Column::ConnectVerified,
                submission::Column::ConnectVerifiedAt,
                now,
            )
            .await?;
        }
        if update.profile_click {
            self.raise_flag(
                id,
                submission::Column::ProfileClicked,
                submission::Column::ProfileClickedAt,
                now,
            )
            .await?;
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| sea_orm::DbErr::RecordNotFound(format!("submission {}", id)))
    }

    /// Conditional false-to-true flip for one flag; a flag already set keeps
    /// its original timestamp.
    async fn raise_flag(
        &self,
        id: Uuid,
        flag: submission::Column,
        flagged_at: submission::Column,
        now: DateTime<Utc>,
    ) -> Result<(), sea_orm::DbErr> {
        Entity::update_many()
            .col_expr(flag, Expr::value(true))
            .col_expr(flagged_at, Expr::value(Some(now)))
            .col_expr(submission::Column::UpdatedAt, Expr::value(now))
            .filter(submission::Column::Id.eq(id))
            .filter(flag.eq(false))
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    /// Store the issued download token and its expiry on the submission.
    ///
    /// Concurrent issuance may overwrite a token written by a racing call;
    /// the latest write wins and either token was equally valid.
    pub async fn set_download_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sea_orm::DbErr> {
        Entity::update_many()
            .col_expr(
                submission::Column::DownloadToken,
                Expr::value(token.to_string()),
            )
            .col_expr(
                submission::Column::DownloadTokenExpiresAt,
                Expr::value(expires_at),
            )
            .col_expr(submission::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(submission::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    /// Atomically flip the one-time completion flag.
    ///
    /// Returns `true` when this call won the false-to-true transition; a
    /// concurrent redeemer that lost the race gets `false` and must report
    /// the token as already used.
    pub async fn mark_download_complete(&self, id: Uuid) -> Result<bool, sea_orm::DbErr> {
        let now = Utc::now();
        let result = Entity::update_many()
            .col_expr(submission::Column::DownloadCompleted, Expr::value(true))
            .col_expr(
                submission::Column::DownloadCompletedAt,
                Expr::value(Some(now)),
            )
            .col_expr(submission::Column::UpdatedAt, Expr::value(now))
            .filter(submission::Column::Id.eq(id))
            .filter(submission::Column::DownloadCompleted.eq(false))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Count completed downloads for a gate.
    pub async fn count_completed_for_gate(&self, gate_id: Uuid) -> Result<u64, sea_orm::DbErr> {
        Entity::find()
            .filter(submission::Column::GateId.eq(gate_id))
            .filter(submission::Column::DownloadCompleted.eq(true))
            .count(&*self.db)
            .await
    }
}
