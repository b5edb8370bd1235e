use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

pub const VERIFY_RADIUS_M: f64 = 50.0;
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    // Both halves or nothing; NaN/out-of-range input counts as no location.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        let (lat, lon) = (lat?, lon?);
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon })
    }
}

pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

pub fn distance_to(user: Option<GeoPoint>, issue: GeoPoint) -> f64 {
    match user {
        Some(user) => haversine_m(user, issue),
        None => f64::INFINITY,
    }
}

pub fn within_verify_radius(distance_m: f64) -> bool {
    distance_m < VERIFY_RADIUS_M
}

pub fn is_verifiable(user: Option<GeoPoint>, issue: GeoPoint) -> bool {
    within_verify_radius(distance_to(user, issue))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub point: GeoPoint,
    pub notice: Option<String>,
}

/// Waits for a device fix, falling back to the last map-viewport center when
/// the fix fails or does not arrive within `timeout`.
pub async fn resolve_report_location<F>(
    device_fix: F,
    map_center: Option<GeoPoint>,
    timeout: Duration,
) -> Result<ResolvedLocation, String>
where
    F: Future<Output = Result<GeoPoint, String>>,
{
    let reason = match tokio::time::timeout(timeout, device_fix).await {
        Ok(Ok(point)) => {
            return Ok(ResolvedLocation {
                point,
                notice: None,
            })
        }
        Ok(Err(reason)) => reason,
        Err(_) => "Timeout expired".to_string(),
    };

    let Some(center) = map_center else {
        return Err(reason);
    };

    warn!("📍 Device location failed ({}), using map center", reason);
    Ok(ResolvedLocation {
        point: center,
        notice: Some(format!(
            "Could not get precise location ({}). Using the center of your map view instead.",
            reason
        )),
    })
}
