pub mod middleware;
pub mod routes;

use askama::Template;
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CACHE_CONTROL, HeaderValue, StatusCode},
    middleware as axum_middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, get_service, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::error;

use crate::state::AppState;
use middleware::auth as auth_middleware;
use routes::{auth, dashboard, issues, realtime};

pub fn render_html<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            error!("Template render failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/", get(dashboard::dashboard_handler))
        .route("/api/issues", get(issues::list_issues_handler))
        .route("/api/realtime", get(realtime::realtime_handler))
        .route(
            "/issues",
            post(issues::report_issue_handler)
                .layer(DefaultBodyLimit::max(issues::MAX_PHOTO_BYTES)),
        )
        .route("/issues/:issue_id/verify", post(issues::verify_issue_handler))
        .route("/logout", post(auth::logout_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_auth,
        ));

    let photos_path = format!("/storage/{}", state.storage.bucket());
    let photos_dir = state.storage.bucket_dir();

    Router::new()
        .route("/login", get(auth::login_page).post(auth::login_handler))
        .merge(protected_routes)
        .nest_service("/assets", get_service(ServeDir::new("assets")))
        .nest_service(&photos_path, get_service(ServeDir::new(photos_dir)))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
