use tracing::{info, warn};

use crate::database::issues_repo;
use crate::database::verifications_repo::{self, NewVerification};
use crate::error::AppError;
use crate::models::IssueStatus;
use crate::services::auth_service::SessionUser;
use crate::services::geo_service::{self, GeoPoint};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

impl VerifyOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            VerifyOutcome::Verified => "verified",
            VerifyOutcome::AlreadyVerified => "already_verified",
        }
    }
}

/// Marks the issue verified, then records who verified it.
///
/// A duplicate (issue, verifier) record counts as success. Any other failure
/// of the record insert is returned, but the status update stays in place.
pub async fn verify_issue(
    state: &AppState,
    issue_id: i64,
    verifier: &SessionUser,
    user_location: Option<GeoPoint>,
) -> Result<VerifyOutcome, AppError> {
    let Some(issue) = issues_repo::load_issue(&state.pool, issue_id).await? else {
        return Err(AppError::NotFound);
    };

    let issue_point = GeoPoint::new(issue.latitude, issue.longitude);
    if !geo_service::is_verifiable(user_location, issue_point) {
        return Err(AppError::TooFar);
    }

    let updated =
        issues_repo::update_issue_status(&state.pool, issue_id, IssueStatus::Verified).await?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }

    let inserted = verifications_repo::insert_verification(
        &state.pool,
        NewVerification {
            issue_id,
            verifier_id: &verifier.id,
        },
    )
    .await;

    state.refresh.broadcast();

    match inserted {
        Ok(record) => {
            info!(
                "✅ Issue {} verified by {} (record {} at {})",
                issue_id, record.verifier_id, record.id, record.created_at
            );
            Ok(VerifyOutcome::Verified)
        }
        Err(e) if verifications_repo::is_duplicate(&e) => {
            info!("Issue {} already verified by {}", issue_id, verifier.id);
            Ok(VerifyOutcome::AlreadyVerified)
        }
        Err(e) => {
            warn!(
                "Issue {} marked verified but verification record failed: {}",
                issue_id, e
            );
            Err(AppError::from(e))
        }
    }
}
