use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::AppConfig,
    models::User,
    response::ApiResponse,
    storage::{Store, StoreError},
};

const RESET_PURPOSE: &str = "reset";

/// AuthError
///
/// Failures while issuing or verifying a token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is missing")]
    MissingToken,
    #[error("token has expired")]
    Expired,
    #[error("token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("token is not a {0} token")]
    WrongPurpose(&'static str),
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Invalid(e),
        }
    }
}

/// Claims
///
/// The payload of a login token. `id` and `name` identify the user, `admin` is the
/// flag at issue time (refreshed from the database on every request by `login_required`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub id: i64,
    pub name: String,
    pub admin: bool,
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Issued at, unix seconds.
    pub iat: i64,
}

impl Claims {
    pub fn for_user(id: i64, name: &str, admin: bool, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id,
            name: name.to_string(),
            admin,
            exp: now + ttl_secs,
            iat: now,
        }
    }
}

// Reset tokens carry only the account name and a purpose marker, so a login token
// never decodes as a reset token and vice versa.
#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    sub: String,
    purpose: String,
    exp: i64,
    iat: i64,
}

fn validation() -> Validation {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // Expiry is exact; the tokens are short-lived enough that skew is not a concern.
    validation.leeway = 0;
    validation
}

/// Signs a login token.
pub fn issue_token(secret: &str, claims: &Claims) -> Result<String, AuthError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::Sign)
}

/// Verifies signature and expiry of a login token and returns its claims.
pub fn parse_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation(),
    )?;
    Ok(data.claims)
}

/// Signs a password reset token for `name`, valid for `ttl_secs`.
pub fn issue_reset_token(secret: &str, name: &str, ttl_secs: i64) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = ResetClaims {
        sub: name.to_string(),
        purpose: RESET_PURPOSE.to_string(),
        exp: now + ttl_secs,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::Sign)
}

/// Verifies a reset token and returns the account name it was issued for.
pub fn parse_reset_token(secret: &str, token: &str) -> Result<String, AuthError> {
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    let data = decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation(),
    )?;
    if data.claims.purpose != RESET_PURPOSE {
        return Err(AuthError::WrongPurpose(RESET_PURPOSE));
    }
    Ok(data.claims.sub)
}

// Accepts both `Authorization: Bearer <jwt>` and a bare `Authorization: <jwt>`.
fn bearer(parts: &Parts) -> Option<&str> {
    let raw = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?
        .trim();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    (!token.is_empty()).then_some(token)
}

/// login_required
///
/// Authentication gate. Verifies the token, then loads the user so that deleted or
/// disabled accounts are rejected even while their token is still valid. On success
/// the refreshed `Claims` are stored in the request extensions for `CurrentUser`.
///
/// Rejection: 401 envelope.
pub async fn login_required(
    State(store): State<Store>,
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let Some(token) = bearer(&parts) else {
        return ApiResponse::unauthorized(AuthError::MissingToken).into_response();
    };

    let mut claims = match parse_token(&config.jwt_secret, token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("rejecting token: {e}");
            return ApiResponse::unauthorized(e).into_response();
        }
    };

    let user = match store.get::<User>(claims.id).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            tracing::debug!(user_id = claims.id, "token owner no longer exists");
            return ApiResponse::unauthorized("account not found").into_response();
        }
        Err(e) => {
            tracing::error!(user_id = claims.id, "failed to load token owner: {e}");
            return ApiResponse::unauthorized("account lookup failed").into_response();
        }
    };
    if !user.enabled {
        return ApiResponse::unauthorized("account disabled").into_response();
    }

    claims.name = user.name;
    claims.admin = user.admin;
    parts.extensions.insert(claims);

    next.run(Request::from_parts(parts, body)).await
}

/// admin_required
///
/// Authorization gate, installed behind `login_required`. Rejection: 403 envelope.
pub async fn admin_required(CurrentUser(claims): CurrentUser, request: Request, next: Next) -> Response {
    if !claims.admin {
        tracing::debug!(user = %claims.name, "admin privilege required");
        return ApiResponse::forbidden("admin privilege required").into_response();
    }
    next.run(request).await
}

/// CurrentUser
///
/// The identity resolved by `login_required`. Extracting it on a route without the
/// gate yields a 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiResponse::unauthorized("login required"))
    }
}
