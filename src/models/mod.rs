//! # Data Models
//!
//! This module contains all the data models used throughout the Fangate service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod gate;
pub mod oauth_state;
pub mod submission;

pub use gate::Entity as Gate;
pub use oauth_state::Entity as OAuthState;
pub use submission::Entity as Submission;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "fangate".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
