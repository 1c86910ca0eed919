//! # Repositories
//!
//! Database access for gates, submissions, and OAuth states. All mutation of
//! shared state flows through these repositories; the check-then-set flags
//! (`oauth_states.used`, `submissions.download_completed`) are flipped with
//! conditional updates so concurrent callers race safely.

pub mod gate;
pub mod oauth_state;
pub mod submission;

pub use gate::GateRepository;
pub use oauth_state::OAuthStateRepository;
pub use submission::SubmissionRepository;
