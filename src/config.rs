use std::env;

/// Default signing secret for local runs and tests. Production must override it.
const LOCAL_JWT_SECRET: &str = "blade-local-jwt-secret-change-me";

/// AppConfig
///
/// Holds the application's entire configuration state. It is built once at startup,
/// carried inside `AppState` and pulled into handlers and middleware via `FromRef`.
/// Nothing in the crate reads the environment after `load()` returns.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the log format and the fail-fast secret checks.
    pub env: Env,
    // sqlx connection string for the relational store (SQLite).
    pub db_url: String,
    // Upper bound of the connection pool.
    pub db_max_connections: u32,
    // Port the HTTP server binds on 0.0.0.0.
    pub server_port: u16,
    // Prefix every versioned route group hangs under, e.g. `/api` -> `/api/v1/...`.
    pub api_base: String,
    // HMAC secret used to sign and verify every issued token.
    pub jwt_secret: String,
    // Lifetime of a login token, in seconds.
    pub token_expired: i64,
    // Lifetime of a password reset link, in seconds.
    pub url_expired: i64,
    // Public origin used to build links sent by email, e.g. `https://blade.example.com`.
    pub domain: String,
    // Front-end path of the reset page; the reset token is appended as the last segment.
    pub reset_path: String,
    // Password given to the bootstrap `admin` account when it does not exist yet.
    pub admin_password: String,
    // When non-empty, only emails under this domain may register.
    pub company: String,
    // Sender address for outgoing mail.
    pub mail_from: String,
    // Serve the Swagger UI at `/swagger-ui`.
    pub api_doc: bool,
    // Attach a permissive CORS layer.
    pub cors: bool,
    // `KEY="raw"` entries that failed to parse and fell back to their default.
    // Logged by the caller once a subscriber exists.
    pub ignored: Vec<String>,
}

/// Env
///
/// Defines the runtime context. `Local` is lenient with defaults, `Production`
/// refuses to start without explicit secrets.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// A safe, non-panicking configuration used by tests and by `load()` as the
    /// base that environment variables override.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: "sqlite://blade.db?mode=rwc".to_string(),
            db_max_connections: 5,
            server_port: 8080,
            api_base: "/api".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_expired: 3600 * 24,
            url_expired: 600,
            domain: "http://localhost:8080".to_string(),
            reset_path: "/reset-password".to_string(),
            admin_password: "admin".to_string(),
            company: String::new(),
            mail_from: "blade@localhost".to_string(),
            api_doc: true,
            cors: true,
            ignored: Vec::new(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables, falling back to `Default`
    /// for anything unset.
    ///
    /// # Panics
    /// Panics in `Env::Production` when `JWT_SECRET` or `ADMIN_PASSWORD` is missing,
    /// so the service never starts signing tokens with the public development secret.
    pub fn load() -> Self {
        let defaults = Self::default();

        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (jwt_secret, admin_password) = match env {
            Env::Production => (
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
                env::var("ADMIN_PASSWORD")
                    .expect("FATAL: ADMIN_PASSWORD must be set in production."),
            ),
            Env::Local => (
                env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
                env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            ),
        };

        let mut ignored = Vec::new();
        let db_max_connections = number("DB_MAX_CONNECTIONS", defaults.db_max_connections, &mut ignored);
        let server_port = number("SERVER_PORT", defaults.server_port, &mut ignored);
        let token_expired = number("TOKEN_EXPIRED", defaults.token_expired, &mut ignored);
        let url_expired = number("URL_EXPIRED", defaults.url_expired, &mut ignored);

        Self {
            api_doc: flag("API_DOC", env == Env::Local),
            cors: flag("CORS", defaults.cors),
            env,
            db_url: env::var("DATABASE_URL").unwrap_or(defaults.db_url),
            db_max_connections,
            server_port,
            api_base: env::var("API_BASE")
                .map(|base| normalize_base(&base))
                .unwrap_or(defaults.api_base),
            jwt_secret,
            token_expired,
            url_expired,
            domain: env::var("DOMAIN").unwrap_or(defaults.domain),
            reset_path: env::var("RESET_PATH").unwrap_or(defaults.reset_path),
            admin_password,
            company: env::var("COMPANY").unwrap_or(defaults.company),
            mail_from: env::var("MAIL_FROM").unwrap_or(defaults.mail_from),
            ignored,
        }
    }
}

// Numeric variables that fail to parse keep their default instead of aborting startup.
fn number<T: std::str::FromStr + Copy>(key: &str, default: T, ignored: &mut Vec<String>) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            ignored.push(format!("{key}={raw:?}"));
            default
        }),
        Err(_) => default,
    }
}

fn flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Ensures the base starts with a slash and has no trailing one (`api/` -> `/api`).
pub fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
