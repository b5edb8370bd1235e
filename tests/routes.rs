mod common;

use axum::{
    body::{to_bytes, Body},
    extract::Query,
    http::{header, Request, StatusCode},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;

use civictrack::database::issues_repo;
use civictrack::state::AppState;
use civictrack::web;

async fn app_with_state() -> (Router, AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = common::test_state(dir.path()).await;
    (web::app(state.clone()), state, dir)
}

/// Serves the token endpoint the way the auth provider does, answering a
/// refresh grant with a fresh pair for `user_id`.
async fn spawn_auth_provider(user_id: &'static str) -> String {
    let provider = Router::new().route(
        "/auth/v1/token",
        post(
            move |Query(params): Query<std::collections::HashMap<String, String>>,
                  Json(body): Json<Value>| async move {
                assert_eq!(params.get("grant_type").map(String::as_str), Some("refresh_token"));
                assert_eq!(body["refresh_token"], "stale-refresh");
                Json(json!({
                    "access_token": common::access_token(user_id),
                    "refresh_token": "fresh-refresh",
                }))
            },
        ),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind provider");
    let addr = listener.local_addr().expect("provider addr");
    tokio::spawn(async move {
        axum::serve(listener, provider).await.ok();
    });
    format!("http://{addr}")
}

fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

fn session_cookie(user_id: &str) -> String {
    format!("access_token={}; refresh_token=r", common::access_token(user_id))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

fn location(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn dashboard_requires_a_session() {
    let (app, _state, _dir) = app_with_state().await;

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn api_without_session_is_unauthorized() {
    let (app, _state, _dir) = app_with_state().await;

    let response = app
        .oneshot(Request::get("/api/issues").body(Body::empty()).unwrap())
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dashboard_shows_signed_in_email() {
    let (app, _state, _dir) = app_with_state().await;

    let response = app
        .oneshot(
            Request::get("/")
                .header(header::COOKIE, session_cookie("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("alice@civic.test"));
    assert!(html.contains("Sign Out"));
}

#[tokio::test]
async fn login_page_redirects_signed_in_users_home() {
    let (app, _state, _dir) = app_with_state().await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/login")
                .header(header::COOKIE, session_cookie("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));

    let response = app
        .oneshot(Request::get("/login").body(Body::empty()).unwrap())
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Sign In to CivicTrack"));
}

#[tokio::test]
async fn short_password_is_rejected_inline() {
    let (app, _state, _dir) = app_with_state().await;

    let response = app
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=a%40b.test&password=123&mode=signin"))
                .unwrap(),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Password must be at least 6 characters"));
    assert!(html.contains("a@b.test"));
}

#[tokio::test]
async fn unreachable_provider_surfaces_login_error() {
    let (app, _state, _dir) = app_with_state().await;

    let response = app
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=a%40b.test&password=secret123"))
                .unwrap(),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(body_text(response).await.contains("Connection error"));
}

#[tokio::test]
async fn sign_out_clears_session_and_leaves_dashboard() {
    let (app, _state, _dir) = app_with_state().await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/logout")
                .header(header::COOKIE, session_cookie("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    let cleared: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    assert_eq!(cleared.len(), 2);
    assert!(cleared
        .iter()
        .any(|c| c.starts_with("access_token=;") && c.contains("Max-Age=0")));
    assert!(cleared
        .iter()
        .any(|c| c.starts_with("refresh_token=;") && c.contains("Max-Age=0")));

    // The browser drops the cookie; the next visit lands on the login page.
    let response = app
        .oneshot(
            Request::get("/")
                .header(header::COOKIE, "access_token=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn markers_reflect_user_proximity() {
    let (app, state, _dir) = app_with_state().await;
    common::seed_issue(&state, "Pothole").await;
    state.cache.fetch_issues(&state.pool).await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/issues?lat=13.0828&lon=80.2708")
                .header(header::COOKIE, session_cookie("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let markers: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(markers[0]["can_verify"], true);
    assert_eq!(markers[0]["verify_label"], "Verify Issue");

    let response = app
        .oneshot(
            Request::get("/api/issues?lat=13.0927&lon=80.2707")
                .header(header::COOKIE, session_cookie("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");
    let markers: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(markers[0]["can_verify"], false);
    assert_eq!(markers[0]["verify_label"], "Get Closer to Verify");
}

#[tokio::test]
async fn verify_endpoint_enforces_the_radius() {
    let (app, state, _dir) = app_with_state().await;
    let issue_id = common::seed_issue(&state, "Pothole").await;

    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/issues/{issue_id}/verify"))
                .header(header::COOKIE, session_cookie("bob"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("lat=13.0927&lon=80.2707"))
                .unwrap(),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"], "Get Closer to Verify");

    let response = app
        .oneshot(
            Request::post(format!("/issues/{issue_id}/verify"))
                .header(header::COOKIE, session_cookie("bob"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("lat=13.0828&lon=80.2708"))
                .unwrap(),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "VERIFIED");
    assert_eq!(body["outcome"], "verified");
}

#[tokio::test]
async fn report_endpoint_accepts_multipart_upload() {
    let (app, state, _dir) = app_with_state().await;
    let boundary = "civic-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nFallen tree\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\nBlocking the lane\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"device_error\"\r\n\r\nTimeout expired\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"center_lat\"\r\n\r\n13.07\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"center_lon\"\r\n\r\n80.27\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"tree.png\"\r\n\
         Content-Type: image/png\r\n\r\nPNGDATA\r\n\
         --{b}--\r\n",
        b = boundary
    );

    let response = app
        .oneshot(
            Request::post("/issues")
                .header(header::COOKIE, session_cookie("carol"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["message"], "Issue reported successfully!");
    assert_eq!(json["latitude"], 13.07);
    assert!(json["notice"].as_str().unwrap().contains("Timeout expired"));

    let rows = issues_repo::list_issues(&state.pool).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reporter_id, "carol");
    assert_eq!(rows[0].title, "Fallen tree");
}

#[tokio::test]
async fn realtime_endpoint_streams_events() {
    let (app, _state, _dir) = app_with_state().await;

    let response = app
        .oneshot(
            Request::get("/api/realtime")
                .header(header::COOKIE, session_cookie("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}

#[tokio::test]
async fn hand_written_token_cannot_act_as_another_user() {
    let (app, state, _dir) = app_with_state().await;
    let issue_id = common::seed_issue(&state, "Pothole").await;
    let claims = general_purpose::URL_SAFE_NO_PAD
        .encode(json!({ "sub": "victim-user-id", "exp": common::FAR_FUTURE_EXP }).to_string());
    let unsigned = format!("x.{claims}.not-a-signature");
    let wrong_key = common::signed_token(
        &json!({ "sub": "victim-user-id", "exp": common::FAR_FUTURE_EXP }),
        "not-the-provider-secret",
    );

    for token in [unsigned, wrong_key] {
        let response = app
            .clone()
            .oneshot(
                Request::post(format!("/issues/{issue_id}/verify"))
                    .header(header::COOKIE, format!("access_token={token}"))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("lat=13.0827&lon=80.2707"))
                    .unwrap(),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/login"));

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/issues")
                    .header(header::COOKIE, format!("access_token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    assert!(common::verifier_ids(&state, issue_id).await.is_empty());
    let issue = issues_repo::load_issue(&state.pool, issue_id)
        .await
        .unwrap()
        .expect("issue");
    assert_eq!(issue.status, "UNVERIFIED");
}

#[tokio::test]
async fn expired_session_without_reachable_provider_goes_to_login() {
    let (app, _state, _dir) = app_with_state().await;
    let expired = common::access_token_expiring("alice", 1);

    let response = app
        .oneshot(
            Request::get("/")
                .header(
                    header::COOKIE,
                    format!("access_token={expired}; refresh_token=stale-refresh"),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn expired_session_is_refreshed_transparently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider_url = spawn_auth_provider("alice").await;
    let state =
        common::test_state_with(common::test_config_with_auth(dir.path(), &provider_url)).await;
    let app = web::app(state);
    let expired = common::access_token_expiring("alice", 1);

    let response = app
        .oneshot(
            Request::get("/")
                .header(
                    header::COOKIE,
                    format!("access_token={expired}; refresh_token=stale-refresh"),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies
        .iter()
        .any(|c| c.starts_with(&format!("access_token={};", common::access_token("alice")))));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=fresh-refresh;")));
    assert!(body_text(response).await.contains("alice@civic.test"));
}
