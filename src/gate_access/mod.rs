//! # Gate access pipeline
//!
//! The security-sensitive core of the service: the OAuth callback state
//! machine, the best-effort side-effect fan-out, download-token issuance
//! gated on verification completeness, and one-time token redemption.

pub mod authorize;
pub mod callback;
pub mod issuer;
pub mod redeemer;
pub mod side_effects;
pub mod token;

pub use authorize::{AuthorizationStart, AuthorizationStarter, AuthorizeError};
pub use callback::{CallbackError, CallbackOutcome, CallbackProcessor, CallbackRequest};
pub use issuer::{DownloadTokenIssuer, IssueError, IssuedToken};
pub use redeemer::{DownloadRedeemer, RedeemError, RedeemedDownload};
pub use side_effects::{BestEffort, SideEffectOrchestrator, SideEffectPlan, SideEffectReport};
pub use token::DownloadToken;
