use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

/// Read-only projection of the provider's session, rebuilt from the
/// `access_token` cookie on every request once its signature checks out.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub user: SessionUser,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("no access token")]
    Missing,

    #[error("malformed access token")]
    Malformed,

    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("access token signature mismatch")]
    BadSignature,

    #[error("access token expired")]
    Expired,
}

#[derive(Deserialize)]
struct JwtHeader {
    alg: String,
}

#[derive(Deserialize)]
struct JwtPayload {
    sub: String,
    email: Option<String>,
    exp: u64,
}

impl Session {
    /// Checks the HS256 signature against the provider's JWT secret before
    /// any claim is read. Expired tokens are reported separately so the
    /// caller can try a refresh.
    pub fn from_access_token(token: &str, secret: &[u8]) -> Result<Self, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        let jwt_header: JwtHeader = decode_segment(header)?;
        if jwt_header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm(jwt_header.alg));
        }

        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature.trim_end_matches('='))
            .map_err(|_| TokenError::BadSignature)?;
        let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::BadSignature)?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: JwtPayload = decode_segment(payload)?;
        if claims.sub.trim().is_empty() {
            return Err(TokenError::Malformed);
        }
        if claims.exp <= unix_now() {
            return Err(TokenError::Expired);
        }

        Ok(Session {
            access_token: token.to_string(),
            user: SessionUser {
                id: claims.sub,
                email: claims.email,
            },
        })
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug)]
pub enum SignUpOutcome {
    SignedIn(AuthTokens),
    ConfirmationPending,
}

#[derive(Deserialize)]
struct SignUpResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ProviderError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct AuthClient {
    base_url: String,
    anon_key: String,
    jwt_secret: Vec<u8>,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: &str, anon_key: &str, jwt_secret: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            jwt_secret: jwt_secret.as_bytes().to_vec(),
            http: reqwest::Client::new(),
        }
    }

    pub fn verify_session(&self, access_token: &str) -> Result<Session, TokenError> {
        Session::from_access_token(access_token, &self.jwt_secret)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, AppError> {
        info!("🔐 Sign-in attempt: email={}", email);
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    /// Trades a refresh token for a new token pair.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthTokens, AppError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<AuthTokens, AppError> {
        let url = format!("{}/auth/v1/token?grant_type={}", self.base_url, grant_type);

        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        resp.json::<AuthTokens>().await.map_err(|e| {
            warn!("Could not parse auth response: {}", e);
            AppError::Auth(format!("Unexpected auth response: {}", e))
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AppError> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        info!("📝 Sign-up attempt: email={}", email);

        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        let body: SignUpResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Unexpected auth response: {}", e)))?;

        Ok(match (body.access_token, body.refresh_token) {
            (Some(access_token), Some(refresh_token)) => SignUpOutcome::SignedIn(AuthTokens {
                access_token,
                refresh_token,
            }),
            _ => SignUpOutcome::ConfirmationPending,
        })
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }
        Ok(())
    }
}

fn connect_failed(url: &str, err: reqwest::Error) -> AppError {
    warn!("Auth provider request failed ({}): {}", url, err);
    AppError::Auth(format!("Connection error: {}", err))
}

async fn provider_error(resp: reqwest::Response) -> AppError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    warn!("Auth provider error: {} {}", status, body);

    let message = serde_json::from_str::<ProviderError>(&body)
        .ok()
        .and_then(|e| e.error_description.or(e.msg).or(e.message).or(e.error))
        .unwrap_or_else(|| format!("Authentication failed: {}", status));
    AppError::Auth(message)
}
