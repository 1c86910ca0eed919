//! OAuth state entity model
//!
//! One row per pending authorization round-trip, correlating a (gate,
//! submission) pair to the callback that will come back from the platform.
//! The `used` flag transitions false to true exactly once and never reverts.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Social platforms a gate can authorize against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    Soundcloud,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Soundcloud => "soundcloud",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "soundcloud" => Ok(OAuthProvider::Soundcloud),
            _ => Err(()),
        }
    }
}

/// OAuth state entity storing CSRF/PKCE state for one authorization attempt
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_states")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Random state token (CSRF nonce), unique and unguessable
    pub state: String,

    /// Provider name (e.g., "soundcloud")
    pub provider: String,

    /// Submission this authorization attempt belongs to
    pub submission_id: Uuid,

    /// Gate this authorization attempt belongs to
    pub gate_id: Uuid,

    /// PKCE code verifier; OAuth 2.1 flows always carry one
    pub code_verifier: Option<String>,

    /// Comment text the visitor pre-authored, posted as a side effect
    pub comment_text: Option<String>,

    /// Consumed flag; flipped by a conditional update exactly once
    pub used: bool,

    /// Expiration timestamp
    pub expires_at: chrono::DateTime<chrono::Utc>,

    /// When the state was created
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// When the state was last updated
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Explicit lifecycle of a state record.
///
/// `Consumed` wins over `Expired` so a replayed token is always reported as
/// already used rather than merely expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthStateStatus {
    Pending,
    Consumed,
    Expired,
}

impl Model {
    /// Derive the record's lifecycle status at `now`.
    pub fn status(&self, now: chrono::DateTime<chrono::Utc>) -> OAuthStateStatus {
        if self.used {
            OAuthStateStatus::Consumed
        } else if self.expires_at < now {
            OAuthStateStatus::Expired
        } else {
            OAuthStateStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn state_row() -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            state: "nonce".to_string(),
            provider: "soundcloud".to_string(),
            submission_id: Uuid::new_v4(),
            gate_id: Uuid::new_v4(),
            code_verifier: Some("verifier".to_string()),
            comment_text: None,
            used: false,
            expires_at: now + Duration::minutes(15),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pending_while_fresh_and_unused() {
        assert_eq!(state_row().status(Utc::now()), OAuthStateStatus::Pending);
    }

    #[test]
    fn consumed_wins_over_expired() {
        let mut row = state_row();
        row.used = true;
        row.expires_at = Utc::now() - Duration::minutes(1);
        assert_eq!(row.status(Utc::now()), OAuthStateStatus::Consumed);
    }

    #[test]
    fn expired_when_past_expiry() {
        let mut row = state_row();
        row.expires_at = Utc::now() - Duration::seconds(1);
        assert_eq!(row.status(Utc::now()), OAuthStateStatus::Expired);
    }

    #[test]
    fn provider_round_trips_through_str() {
        let provider: OAuthProvider = "soundcloud".parse().unwrap();
        assert_eq!(provider, OAuthProvider::Soundcloud);
        assert_eq!(provider.as_str(), "soundcloud");
        assert!("bandcamp".parse::<OAuthProvider>().is_err());
    }
}
