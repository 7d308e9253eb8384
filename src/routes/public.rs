use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Public Router Module
///
/// Endpoints that need no token. `base` is the configured API prefix.
pub fn public_routes(base: &str) -> Router<AppState> {
    let auth = super::auth_prefix(base);
    Router::new()
        // GET /health
        // Liveness probe for monitors and load balancers.
        .route("/health", get(handlers::health))
        // POST {base}/v1/auth/register
        // Self-service account creation, optionally restricted to the company domain.
        .route(&format!("{auth}/register"), post(handlers::register))
        // POST {base}/v1/auth/login
        // Exchanges name and password for a signed token.
        .route(&format!("{auth}/login"), post(handlers::login))
        // POST {base}/v1/auth/restpasswordrequest
        // Mails a reset link to the account owner.
        .route(
            &format!("{auth}/restpasswordrequest"),
            post(handlers::reset_password_request),
        )
        // PUT {base}/v1/auth/resetpassword/{token}
        // The token from the mailed link authorizes the change.
        .route(
            &format!("{auth}/resetpassword/{{token}}"),
            put(handlers::reset_password),
        )
}
