use serde::Serialize;

use crate::models::{IssueStatus, IssuesRow};
use crate::services::geo_service::{self, GeoPoint, GEOLOCATION_TIMEOUT};

pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    lat: 13.0827,
    lon: 80.2707,
};
pub const DEFAULT_ZOOM: u8 = 13;
pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

pub const LABEL_VERIFY: &str = "Verify Issue";
pub const LABEL_GET_CLOSER: &str = "Get Closer to Verify";
pub const LABEL_VERIFYING: &str = "Verifying...";

#[derive(Debug, Clone, Serialize)]
pub struct MapConfig {
    pub center: GeoPoint,
    pub zoom: u8,
    pub tile_url: &'static str,
    pub attribution: &'static str,
    pub geolocation_timeout_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            tile_url: TILE_URL,
            attribution: TILE_ATTRIBUTION,
            geolocation_timeout_ms: GEOLOCATION_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueMarkerView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: &'static str,
    pub icon_class: &'static str,
    pub distance_m: Option<f64>,
    pub can_verify: bool,
    pub show_verify_button: bool,
    pub verify_label: &'static str,
}

pub fn build_markers(
    issues: &[IssuesRow],
    user_location: Option<GeoPoint>,
    verifying_id: Option<i64>,
) -> Vec<IssueMarkerView> {
    issues
        .iter()
        .map(|issue| build_marker(issue, user_location, verifying_id))
        .collect()
}

fn build_marker(
    issue: &IssuesRow,
    user_location: Option<GeoPoint>,
    verifying_id: Option<i64>,
) -> IssueMarkerView {
    let point = GeoPoint::new(issue.latitude, issue.longitude);
    let distance = geo_service::distance_to(user_location, point);
    let is_verifiable = geo_service::within_verify_radius(distance);
    let is_verifying = verifying_id == Some(issue.id);
    let status = issue.status();

    let icon_class = match status {
        IssueStatus::Verified => "verified-icon",
        IssueStatus::Unverified => "unverified-icon",
    };

    let verify_label = if is_verifying {
        LABEL_VERIFYING
    } else if is_verifiable {
        LABEL_VERIFY
    } else {
        LABEL_GET_CLOSER
    };

    IssueMarkerView {
        id: issue.id,
        title: issue.title.clone(),
        description: issue.description.clone(),
        image_url: issue.image_url.clone(),
        latitude: issue.latitude,
        longitude: issue.longitude,
        status: status.as_str(),
        icon_class,
        distance_m: distance.is_finite().then_some(distance),
        can_verify: is_verifiable && !is_verifying,
        show_verify_button: status == IssueStatus::Unverified,
        verify_label,
    }
}
