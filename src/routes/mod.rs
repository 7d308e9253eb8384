/// Router Module Index
///
/// Hand-written routes are split by access level; resource CRUD routes are
/// generated from the controllers by the installer in `resources`.

/// Routes open to anonymous clients: health probe and the account gateway.
pub mod public;

/// Hand-written routes behind `login_required`.
pub mod authenticated;

/// Versioned CRUD routes installed from every `RestController`.
pub mod resources;

/// Prefix of the auth endpoints, e.g. `/api/v1/auth`.
pub fn auth_prefix(base: &str) -> String {
    format!("{base}/v1/auth")
}
