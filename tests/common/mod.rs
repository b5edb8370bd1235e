#![allow(dead_code)]

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use sqlx::sqlite::SqlitePoolOptions;

use civictrack::config::Config;
use civictrack::database::issues_repo::{self, NewIssue};
use civictrack::services::auth_service::SessionUser;
use civictrack::state::AppState;

pub const ISSUE_LAT: f64 = 13.0827;
pub const ISSUE_LON: f64 = 80.2707;

// Nothing listens on the discard port, so provider calls fail fast.
pub const UNREACHABLE_AUTH_URL: &str = "http://127.0.0.1:9";

pub const TEST_JWT_SECRET: &str = "civictrack-test-jwt-secret";
pub const FAR_FUTURE_EXP: u64 = 4_102_444_800;

pub fn test_config(storage_dir: &Path) -> Config {
    test_config_with_auth(storage_dir, UNREACHABLE_AUTH_URL)
}

pub fn test_config_with_auth(storage_dir: &Path, auth_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        auth_url: auth_url.to_string(),
        auth_anon_key: "anon-key".to_string(),
        auth_jwt_secret: TEST_JWT_SECRET.to_string(),
        storage_dir: storage_dir.to_path_buf(),
        public_base_url: String::new(),
    }
}

pub async fn test_state(storage_dir: &Path) -> AppState {
    test_state_with(test_config(storage_dir)).await
}

pub async fn test_state_with(config: Config) -> AppState {
    // One connection: every in-memory connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    AppState::new(pool, config)
        .await
        .expect("app state")
}

pub fn user(id: &str) -> SessionUser {
    SessionUser {
        id: id.to_string(),
        email: Some(format!("{id}@civic.test")),
    }
}

pub fn access_token(user_id: &str) -> String {
    access_token_expiring(user_id, FAR_FUTURE_EXP)
}

pub fn access_token_expiring(user_id: &str, exp: u64) -> String {
    let claims = json!({
        "sub": user_id,
        "email": format!("{user_id}@civic.test"),
        "exp": exp,
    });
    signed_token(&claims, TEST_JWT_SECRET)
}

/// HS256 token the way the auth provider mints them.
pub fn signed_token(claims: &serde_json::Value, secret: &str) -> String {
    let signing_input = format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string())
    );
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(signing_input.as_bytes());
    format!(
        "{}.{}",
        signing_input,
        general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    )
}

pub async fn verifier_ids(state: &AppState, issue_id: i64) -> Vec<String> {
    sqlx::query_scalar::<_, String>("SELECT verifier_id FROM verifications WHERE issue_id = ? ORDER BY id")
        .bind(issue_id)
        .fetch_all(&state.pool)
        .await
        .expect("verifier ids")
}

pub async fn seed_issue(state: &AppState, title: &str) -> i64 {
    issues_repo::insert_issue(
        &state.pool,
        NewIssue {
            title,
            description: None,
            image_url: "/storage/issue-images/seed/1_seed.jpg",
            latitude: ISSUE_LAT,
            longitude: ISSUE_LON,
            reporter_id: "reporter",
        },
    )
    .await
    .expect("seed issue")
}
