//! Gate entity model
//!
//! A gate is an artist-owned landing page that gates a file download behind
//! visitor actions. The requirement flags configure which verifications a
//! submission must carry before a download token may be issued.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Gate entity representing a gated download landing page
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gates")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Artist account that owns this gate
    pub owner_id: Uuid,

    /// URL slug, unique across all gates
    pub slug: String,

    /// Display title shown on the landing page
    pub title: String,

    /// URL of the gated file
    pub file_url: String,

    /// Whether the gate currently accepts submissions and downloads
    pub active: bool,

    /// Optional expiry after which the gate is closed
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Optional cap on completed downloads
    pub max_downloads: Option<i32>,

    /// Required verification: email submitted
    pub require_email: bool,

    /// Required verification: track reposted
    pub require_repost: bool,

    /// Required verification: artist followed
    pub require_follow: bool,

    /// Required verification: SoundCloud account connected
    pub require_connect: bool,

    /// Required verification: buy/profile link visited
    pub require_profile_click: bool,

    /// SoundCloud track id targeted by repost/favorite/comment actions
    pub track_id: Option<i64>,

    /// SoundCloud user id targeted by the follow action
    pub target_user_id: Option<i64>,

    /// Buy link pushed to the track's purchase field after authorization
    pub buy_link_url: Option<String>,

    /// Optional title for the buy link
    pub buy_link_title: Option<String>,

    /// Ad-platform pixel configuration (JSON, see `analytics::PixelConfig`)
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub pixel_config: Option<JsonValue>,

    /// Count of completed downloads, incremented at redemption
    pub download_count: i32,

    /// When the gate was created
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// When the gate was last updated
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Whether a gate is currently open for verification and redemption.
///
/// Both the token issuer and the redeemer consult this single derivation
/// instead of re-checking `active` and `expires_at` independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAvailability {
    Open,
    Inactive,
    Expired,
}

impl Model {
    /// Derive the gate's availability at `now`.
    pub fn availability(&self, now: chrono::DateTime<chrono::Utc>) -> GateAvailability {
        if !self.active {
            return GateAvailability::Inactive;
        }
        match self.expires_at {
            Some(expires_at) if expires_at < now => GateAvailability::Expired,
            _ => GateAvailability::Open,
        }
    }

    /// Whether the completed-download cap has been reached.
    pub fn cap_reached(&self, completed_downloads: u64) -> bool {
        match self.max_downloads {
            Some(max) => completed_downloads >= max.max(0) as u64,
            None => false,
        }
    }
}
