use std::future::Future;

use tracing::{info, warn};

use crate::database::issues_repo::{self, NewIssue};
use crate::error::AppError;
use crate::services::auth_service::SessionUser;
use crate::services::geo_service::{self, GeoPoint, GEOLOCATION_TIMEOUT};
use crate::services::storage_service;
use crate::state::AppState;

pub const SUCCESS_MESSAGE: &str = "Issue reported successfully!";

pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct NewReport {
    pub title: String,
    pub description: Option<String>,
    pub photo: Option<PhotoUpload>,
    pub map_center: Option<GeoPoint>,
}

#[derive(Debug)]
pub struct ReportOutcome {
    pub issue_id: i64,
    pub image_url: String,
    pub location: GeoPoint,
    pub notice: Option<String>,
}

/// Runs the report steps in order: resolve location, upload photo, insert
/// the issue row, broadcast. The first failure stops the chain; earlier
/// steps are not undone.
pub async fn submit_report<F>(
    state: &AppState,
    reporter: &SessionUser,
    report: NewReport,
    device_fix: F,
) -> Result<ReportOutcome, AppError>
where
    F: Future<Output = Result<GeoPoint, String>>,
{
    let title = report.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    let description = report
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let photo = match report.photo {
        Some(p) if !p.bytes.is_empty() => p,
        _ => return Err(AppError::Validation("An image is required".to_string())),
    };
    if let Some(ct) = photo.content_type.as_deref() {
        if !ct.starts_with("image/") {
            return Err(AppError::Validation(
                "Only image uploads are supported".to_string(),
            ));
        }
    }

    let location =
        geo_service::resolve_report_location(device_fix, report.map_center, GEOLOCATION_TIMEOUT)
            .await
            .map_err(AppError::Location)?;

    let object_path = storage_service::object_path_for(&reporter.id, &photo.file_name);
    state.storage.upload(&object_path, &photo.bytes).await?;
    let image_url = state.storage.public_url(&object_path);

    let issue_id = issues_repo::insert_issue(
        &state.pool,
        NewIssue {
            title,
            description,
            image_url: &image_url,
            latitude: location.point.lat,
            longitude: location.point.lon,
            reporter_id: &reporter.id,
        },
    )
    .await
    .map_err(|e| {
        warn!("Issue insert failed, photo {} left in storage: {}", object_path, e);
        AppError::from(e)
    })?;

    state.refresh.broadcast();
    info!("📌 Issue {} reported by {}", issue_id, reporter.id);

    Ok(ReportOutcome {
        issue_id,
        image_url,
        location: location.point,
        notice: location.notice,
    })
}
