//! # Gate Repository
//!
//! Database operations for gates. `find_for_verification` is the explicit
//! public-read lookup the verification pipeline uses; it carries no owner
//! auth context because gate pages are public records.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::gate::{self, Entity, Model};

/// Repository for gate database operations
#[derive(Clone)]
pub struct GateRepository {
    db: Arc<DatabaseConnection>,
}

impl GateRepository {
    /// Create a new gate repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a fully built gate row.
    pub async fn create(&self, gate: Model) -> Result<Model, sea_orm::DbErr> {
        Entity::insert(gate.clone().into_active_model())
            .exec_without_returning(&*self.db)
            .await?;
        Ok(gate)
    }

    /// Public-read lookup by id for the verification pipeline.
    pub async fn find_for_verification(
        &self,
        gate_id: Uuid,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find_by_id(gate_id).one(&*self.db).await
    }

    /// Public-read lookup by slug for landing-page routes.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(gate::Column::Slug.eq(slug))
            .one(&*self.db)
            .await
    }

    /// Atomically increment the gate's completed-download counter.
    pub async fn increment_download_count(&self, gate_id: Uuid) -> Result<(), sea_orm::DbErr> {
        Entity::update_many()
            .col_expr(
                gate::Column::DownloadCount,
                Expr::col(gate::Column::DownloadCount).add(1),
            )
            .col_expr(gate::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(gate::Column::Id.eq(gate_id))
            .exec(&*self.db)
            .await?;

        Ok(())
    }
}
