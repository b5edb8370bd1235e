use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use cookie::{Cookie, SameSite};
use tracing::{info, warn};

use crate::error::AppError;
use crate::services::auth_service::{AuthClient, AuthTokens, Session, TokenError};
use crate::state::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

fn cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|hv| hv.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn access_token_from_headers(headers: &HeaderMap) -> Option<String> {
    cookie_from_headers(headers, ACCESS_TOKEN_COOKIE)
}

pub fn refresh_token_from_headers(headers: &HeaderMap) -> Option<String> {
    cookie_from_headers(headers, REFRESH_TOKEN_COOKIE)
}

pub fn session_from_headers(auth: &AuthClient, headers: &HeaderMap) -> Result<Session, TokenError> {
    let token = access_token_from_headers(headers).ok_or(TokenError::Missing)?;
    auth.verify_session(&token)
}

/// An expired access token is traded in once for a fresh pair; the new
/// cookies ride on whatever response the protected handler produces.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match session_from_headers(&state.auth, request.headers()) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            return next.run(request).await;
        }
        Err(TokenError::Expired) => {
            let refresh_token = refresh_token_from_headers(request.headers());
            if let Some((session, tokens)) = refresh(&state.auth, refresh_token).await {
                request.extensions_mut().insert(session);
                let response = next.run(request).await;
                return with_session_cookies(response, &tokens);
            }
        }
        Err(TokenError::Missing) => {}
        Err(e) => warn!("Rejected access token: {}", e),
    }

    // API callers get a status they can act on; pages go back to the login form.
    if request.uri().path().starts_with("/api/") {
        return AppError::Unauthorized.into_response();
    }
    Redirect::to("/login").into_response()
}

async fn refresh(auth: &AuthClient, refresh_token: Option<String>) -> Option<(Session, AuthTokens)> {
    let refresh_token = refresh_token?;
    let tokens = match auth.refresh_session(&refresh_token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!("Session refresh failed: {}", e);
            return None;
        }
    };
    match auth.verify_session(&tokens.access_token) {
        Ok(session) => {
            info!("🔄 Session refreshed for {}", session.user.id);
            Some((session, tokens))
        }
        Err(e) => {
            warn!("Refreshed access token rejected: {}", e);
            None
        }
    }
}

pub fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

pub fn with_session_cookies(mut response: Response, tokens: &AuthTokens) -> Response {
    let access = session_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone());
    let refresh = session_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone());
    append_cookie(&mut response, &access);
    append_cookie(&mut response, &refresh);
    response
}

pub fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!("Skipping unrepresentable cookie {}: {}", cookie.name(), e),
    }
}
