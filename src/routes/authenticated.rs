use crate::{AppState, handlers};
use axum::{Router, routing::put};

/// Authenticated Router Module
///
/// Hand-written routes that need a logged-in user. The caller wraps the returned
/// router in `login_required`, so every handler here can extract `CurrentUser`.
pub fn authenticated_routes(base: &str) -> Router<AppState> {
    let auth = super::auth_prefix(base);
    Router::<AppState>::new()
        // PUT {base}/v1/auth/changepassword
        // Replaces the caller's password after checking the old one.
        .route(
            &format!("{auth}/changepassword"),
            put(handlers::change_password),
        )
}
