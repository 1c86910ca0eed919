//! # OAuth State Repository
//!
//! Database operations for OAuth state records. `mark_used` is the only way
//! a record is ever consumed and is implemented as an atomic conditional
//! update: the caller that loses a concurrent race observes "already used",
//! never a transient error.

use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::oauth_state::{self, Entity, Model, OAuthProvider};

/// Parameters for creating a new OAuth state record
#[derive(Debug, Clone)]
pub struct NewOAuthState {
    pub state: String,
    pub provider: OAuthProvider,
    pub submission_id: Uuid,
    pub gate_id: Uuid,
    pub code_verifier: Option<String>,
    pub comment_text: Option<String>,
}

/// Repository for OAuth state database operations
#[derive(Clone)]
pub struct OAuthStateRepository {
    db: Arc<DatabaseConnection>,
}

impl OAuthStateRepository {
    /// Create a new OAuth state repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a new OAuth state record expiring `expires_in_minutes` from now.
    pub async fn create(
        &self,
        new_state: NewOAuthState,
        expires_in_minutes: i64,
    ) -> Result<Model, sea_orm::DbErr> {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            state: new_state.state,
            provider: new_state.provider.as_str().to_string(),
            submission_id: new_state.submission_id,
            gate_id: new_state.gate_id,
            code_verifier: new_state.code_verifier,
            comment_text: new_state.comment_text,
            used: false,
            expires_at: now + Duration::minutes(expires_in_minutes),
            created_at: now,
            updated_at: now,
        };

        // exec_without_returning sidesteps SeaORM's last-insert-id handling,
        // which cannot unpack UUID primary keys on SQLite.
        Entity::insert(model.clone().into_active_model())
            .exec_without_returning(&*self.db)
            .await?;

        Ok(model)
    }

    /// Find a state record by its token value.
    ///
    /// No expiry or `used` filter is applied: the callback validator needs
    /// the raw record to report "expired" and "already used" distinctly from
    /// "invalid".
    pub async fn find_by_state_token(
        &self,
        state: &str,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(oauth_state::Column::State.eq(state))
            .one(&*self.db)
            .await
    }

    /// Atomically consume a state record.
    ///
    /// Returns `true` if this call performed the false-to-true transition and
    /// `false` if the record was already consumed. Only succeeds when `used`
    /// was previously false, so two concurrent callbacks carrying the same
    /// token cannot both win.
    pub async fn mark_used(&self, id: Uuid) -> Result<bool, sea_orm::DbErr> {
        let result = Entity::update_many()
            .col_expr(oauth_state::Column::Used, Expr::value(true))
            .col_expr(oauth_state::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(oauth_state::Column::Id.eq(id))
            .filter(oauth_state::Column::Used.eq(false))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Maintenance sweep deleting expired state records.
    pub async fn cleanup_expired(&self) -> Result<u64, sea_orm::DbErr> {
        let result = Entity::delete_many()
            .filter(oauth_state::Column::ExpiresAt.lt(Utc::now()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
