use askama::Template;
use axum::{response::Response, Extension};
use tracing::warn;

use crate::services::auth_service::Session;
use crate::services::map_service::MapConfig;
use crate::web::render_html;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub email: String,
    pub map_config_json: String,
    pub build_id: &'static str,
}

pub async fn dashboard_handler(Extension(session): Extension<Session>) -> Response {
    let map_config_json = serde_json::to_string(&MapConfig::default()).unwrap_or_else(|e| {
        warn!("Map config serialization failed: {}", e);
        "{}".to_string()
    });

    render_html(&DashboardTemplate {
        email: session.user.email.unwrap_or_default(),
        map_config_json,
        build_id: env!("CIVICTRACK_BUILD_ID"),
    })
}
