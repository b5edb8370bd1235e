use askama::Template;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::services::auth_service::{Session, SignUpOutcome};
use crate::state::AppState;
use crate::web::middleware::auth::{
    self as auth_middleware, append_cookie, session_cookie, with_session_cookies,
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::web::render_html;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const CONFIRM_EMAIL_MESSAGE: &str = "Check your email for the confirmation link!";

#[derive(Template, Default)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub signing_up: bool,
    pub email: String,
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoginQuery {
    pub mode: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    mode: Option<String>,
}

fn is_signup(mode: Option<&str>) -> bool {
    mode.map(str::trim) == Some("signup")
}

pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    // Already signed in: the login page is not reachable.
    if auth_middleware::session_from_headers(&state.auth, &headers).is_ok() {
        return Redirect::to("/").into_response();
    }

    render_html(&LoginTemplate {
        signing_up: is_signup(query.mode.as_deref()),
        ..LoginTemplate::default()
    })
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

pub async fn login_handler(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let signing_up = is_signup(form.mode.as_deref());
    let email = form.email.trim().to_string();

    let page = |error: Option<String>, message: Option<String>| {
        render_html(&LoginTemplate {
            signing_up,
            email: email.clone(),
            error,
            message,
        })
    };

    if let Err(msg) = validate_credentials(&email, &form.password) {
        return page(Some(msg), None);
    }

    let tokens = if signing_up {
        match state.auth.sign_up(&email, &form.password).await {
            Ok(SignUpOutcome::SignedIn(tokens)) => tokens,
            Ok(SignUpOutcome::ConfirmationPending) => {
                return page(None, Some(CONFIRM_EMAIL_MESSAGE.to_string()))
            }
            Err(e) => return page(Some(e.to_string()), None),
        }
    } else {
        match state.auth.sign_in_with_password(&email, &form.password).await {
            Ok(tokens) => tokens,
            Err(e) => return page(Some(e.to_string()), None),
        }
    };

    info!("✅ Signed in: {}", email);
    with_session_cookies(Redirect::to("/").into_response(), &tokens)
}

pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    if let Err(e) = state.auth.sign_out(&session.access_token).await {
        warn!("Sign-out at auth provider failed for {}: {}", session.user.id, e);
    }

    let mut response = Redirect::to("/login").into_response();
    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        let mut cookie = session_cookie(name, String::new());
        cookie.make_removal();
        append_cookie(&mut response, &cookie);
    }
    response
}
