use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::services::auth_service::Session;
use crate::services::geo_service::GeoPoint;
use crate::services::map_service::{self, IssueMarkerView};
use crate::services::report_service::{self, NewReport, PhotoUpload};
use crate::services::verification_service;
use crate::state::AppState;

pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize, Default)]
pub struct MarkersQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub verifying_id: Option<i64>,
}

pub async fn list_issues_handler(
    State(state): State<AppState>,
    Query(query): Query<MarkersQuery>,
) -> Json<Vec<IssueMarkerView>> {
    let issues = state.cache.snapshot().await;
    let user_location = GeoPoint::from_parts(query.lat, query.lon);
    Json(map_service::build_markers(
        &issues,
        user_location,
        query.verifying_id,
    ))
}

#[derive(Default)]
struct ReportFields {
    title: String,
    description: Option<String>,
    photo: Option<PhotoUpload>,
    device_lat: Option<f64>,
    device_lon: Option<f64>,
    device_error: Option<String>,
    center_lat: Option<f64>,
    center_lon: Option<f64>,
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::Validation(format!("Malformed form data: {}", e))
}

fn parse_coord(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

async fn read_report_fields(mut multipart: Multipart) -> Result<ReportFields, AppError> {
    let mut fields = ReportFields::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            fields.photo = Some(PhotoUpload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let text = field.text().await.map_err(bad_multipart)?;
        match name.as_str() {
            "title" => fields.title = text,
            "description" => fields.description = Some(text),
            "device_lat" => fields.device_lat = parse_coord(&text),
            "device_lon" => fields.device_lon = parse_coord(&text),
            "device_error" => fields.device_error = Some(text).filter(|s| !s.trim().is_empty()),
            "center_lat" => fields.center_lat = parse_coord(&text),
            "center_lon" => fields.center_lon = parse_coord(&text),
            _ => {}
        }
    }

    Ok(fields)
}

pub async fn report_issue_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let fields = read_report_fields(multipart).await?;

    // The browser resolves the device fix; a missing fix carries its reason.
    let device_fix = match GeoPoint::from_parts(fields.device_lat, fields.device_lon) {
        Some(point) => Ok(point),
        None => Err(fields
            .device_error
            .unwrap_or_else(|| "Location unavailable".to_string())),
    };

    let outcome = report_service::submit_report(
        &state,
        &session.user,
        NewReport {
            title: fields.title,
            description: fields.description,
            photo: fields.photo,
            map_center: GeoPoint::from_parts(fields.center_lat, fields.center_lon),
        },
        std::future::ready(device_fix),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": outcome.issue_id,
            "image_url": outcome.image_url,
            "latitude": outcome.location.lat,
            "longitude": outcome.location.lon,
            "notice": outcome.notice,
            "message": report_service::SUCCESS_MESSAGE,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub async fn verify_issue_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(issue_id): Path<i64>,
    Form(form): Form<VerifyForm>,
) -> Result<Json<Value>, AppError> {
    let user_location = GeoPoint::from_parts(form.lat, form.lon);
    let outcome =
        verification_service::verify_issue(&state, issue_id, &session.user, user_location).await?;

    Ok(Json(json!({
        "id": issue_id,
        "status": "VERIFIED",
        "outcome": outcome.as_str(),
    })))
}
