//! # Gate Handlers
//!
//! Public landing-page endpoints: submitting an email against a gate.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{validation_error, ApiError};
use crate::models::gate::GateAvailability;
use crate::repositories::submission::NewSubmission;
use crate::repositories::{GateRepository, SubmissionRepository};
use crate::server::AppState;

/// Request body for creating a submission on a gate
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubmissionRequest {
    /// Visitor email address
    pub email: String,
    /// Optional comment to post on the track after authorization
    #[serde(default)]
    pub comment_text: Option<String>,
}

/// A created submission and the requirements still outstanding
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionResponse {
    /// Submission id, used for all follow-up verification calls
    pub id: Uuid,
    /// Gate the submission belongs to
    pub gate_id: Uuid,
    /// Requirement names the visitor still has to satisfy
    pub outstanding_requirements: Vec<String>,
}

/// Submit an email against a gate, creating a submission
#[utoipa::path(
    post,
    path = "/gates/{slug}/submissions",
    params(
        ("slug" = String, Path, description = "Gate URL slug")
    ),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission created", body = SubmissionResponse),
        (status = 400, description = "Invalid email", body = ApiError),
        (status = 404, description = "Gate not found", body = ApiError),
        (status = 410, description = "Gate inactive or expired", body = ApiError)
    ),
    tag = "gates"
)]
pub async fn create_submission(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(validation_error(
            "Validation failed",
            json!({ "email": "Invalid email format" }),
        ));
    }

    let gates = GateRepository::new(state.db_arc());
    let gate = gates.find_by_slug(&slug).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Gate not found")
    })?;

    match gate.availability(Utc::now()) {
        GateAvailability::Open => {}
        GateAvailability::Inactive => {
            return Err(ApiError::new(
                StatusCode::GONE,
                "GATE_CLOSED",
                "This gate is no longer active",
            ));
        }
        GateAvailability::Expired => {
            return Err(ApiError::new(
                StatusCode::GONE,
                "GATE_CLOSED",
                "This gate has expired",
            ));
        }
    }

    let (ip_address, user_agent) = super::request_metadata(&headers);

    // Single opt-in: submitting the form satisfies the email requirement.
    let submissions = SubmissionRepository::new(state.db_arc());
    let submission = submissions
        .create(NewSubmission {
            gate_id: gate.id,
            email,
            comment_text: request
                .comment_text
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            ip_address,
            user_agent,
            email_verified: true,
        })
        .await?;

    tracing::info!(
        submission_id = %submission.id,
        gate_id = %gate.id,
        "submission created"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            id: submission.id,
            gate_id: gate.id,
            outstanding_requirements: outstanding_requirements(&gate, &submission),
        }),
    ))
}

fn outstanding_requirements(
    gate: &crate::models::gate::Model,
    submission: &crate::models::submission::Model,
) -> Vec<String> {
    let mut outstanding = Vec::new();
    if gate.require_email && !submission.email_verified {
        outstanding.push("email".to_string());
    }
    if gate.require_repost && !submission.repost_verified {
        outstanding.push("repost".to_string());
    }
    if gate.require_follow && !submission.follow_verified {
        outstanding.push("follow".to_string());
    }
    if gate.require_connect && !submission.connect_verified {
        outstanding.push("connect".to_string());
    }
    if gate.require_profile_click && !submission.profile_clicked {
        outstanding.push("profile_click".to_string());
    }
    outstanding
}
