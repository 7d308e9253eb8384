use chrono::{DateTime, Utc};
use kdf::{constant_time_eq, derive_key};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::{self, Claims},
    config::AppConfig,
    storage::{Entity, Store, StoreError, Value},
};

// --- Core Application Schemas (Mapped to Database) ---

/// Base
///
/// Columns shared by every table. `deleted_at` marks a soft-deleted row; it never
/// leaves the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Base {
    pub id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    #[ts(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// User
///
/// An account in the `user` table. `token` and `roles` are computed per request
/// and never written; `password` holds the encoded hash and is emptied by
/// `truncate_password` before the record is serialized into a response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub base: Base,
    // Login identity, unique among live rows.
    pub name: String,
    pub cn_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub email: String,
    pub admin: bool,
    pub enabled: bool,
    pub phone: String,
    // Messaging handle (chat/IM account).
    pub im: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub token: Option<Token>,
    #[sqlx(skip)]
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Token
///
/// A freshly issued login token and its expiry as unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Token {
    pub token: String,
    pub expired: i64,
}

const PASSWORD_SCHEME: &str = "pbkdf2_sha256";
const PASSWORD_ITERATIONS: u32 = 10_000;

impl User {
    /// Replaces the plaintext password with `pbkdf2_sha256$iterations$salt$hash`.
    pub fn encode_password(&mut self) {
        self.password = encode_password(&self.password);
    }

    /// Checks a plaintext candidate against the stored hash in constant time.
    pub fn validate_password(&self, candidate: &str) -> bool {
        validate_password(&self.password, candidate)
    }

    /// Empties the password so it is skipped during serialization.
    pub fn truncate_password(&mut self) {
        self.password.clear();
    }

    /// Fills the transient role list from the admin flag.
    pub fn resolve_roles(&mut self) {
        self.roles = vec![if self.admin { "admin" } else { "user" }.to_string()];
    }

    /// Issues a login token for this user and attaches it.
    pub fn gen_token(&mut self, config: &AppConfig) -> Result<(), auth::AuthError> {
        let claims = Claims::for_user(self.base.id, &self.name, self.admin, config.token_expired);
        let token = auth::issue_token(&config.jwt_secret, &claims)?;
        self.token = Some(Token {
            token,
            expired: claims.exp,
        });
        Ok(())
    }

    /// The shape returned to clients: roles resolved, password gone.
    pub fn into_public(mut self) -> Self {
        self.resolve_roles();
        self.truncate_password();
        self
    }
}

/// Hashes a plaintext password with a fresh random salt.
pub fn encode_password(plain: &str) -> String {
    let salt: [u8; 16] = rand::random();
    let key = derive_key(plain, &salt, PASSWORD_ITERATIONS);
    format!(
        "{PASSWORD_SCHEME}${PASSWORD_ITERATIONS}${}${}",
        hex::encode(salt),
        hex::encode(key)
    )
}

/// Verifies `candidate` against an encoded password. Malformed hashes never match.
pub fn validate_password(stored: &str, candidate: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(PASSWORD_SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let (Ok(iterations), Ok(salt), Ok(expected)) =
        (iterations.parse::<u32>(), hex::decode(salt), hex::decode(hash))
    else {
        return false;
    };
    constant_time_eq(&derive_key(candidate, &salt, iterations), &expected)
}

mod kdf {
    use pbkdf2::pbkdf2_hmac;
    use sha2::Sha256;

    const KEY_LENGTH: usize = 32;

    pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LENGTH] {
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
        key
    }

    pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl Entity for User {
    const TABLE: &'static str = "user";
    const COLUMNS: &'static [&'static str] = &[
        "name", "cn_name", "password", "email", "admin", "enabled", "phone", "im",
    ];
    const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS "user" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            name TEXT NOT NULL,
            cn_name TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL,
            admin INTEGER NOT NULL DEFAULT 0,
            enabled INTEGER NOT NULL DEFAULT 1,
            phone TEXT NOT NULL DEFAULT '',
            im TEXT NOT NULL DEFAULT ''
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_user_name ON "user" (name) WHERE deleted_at IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_user_email ON "user" (email) WHERE deleted_at IS NULL;
    "#;

    fn values(&self) -> Vec<Value> {
        vec![
            (&self.name).into(),
            (&self.cn_name).into(),
            (&self.password).into(),
            (&self.email).into(),
            self.admin.into(),
            self.enabled.into(),
            (&self.phone).into(),
            (&self.im).into(),
        ]
    }
}

/// Module
///
/// A node of the service taxonomy. `parent_id == 0` marks a root. `level` is fixed
/// at creation from the parent chain; `full_name` (`root/child/leaf`) is rebuilt on
/// every read and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Module {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub base: Base,
    pub name: String,
    pub cn_name: String,
    pub description: String,
    pub parent_id: i64,
    pub level: i64,
    #[sqlx(skip)]
    #[serde(default)]
    pub full_name: String,
}

impl Entity for Module {
    const TABLE: &'static str = "module";
    const COLUMNS: &'static [&'static str] = &["name", "cn_name", "description", "parent_id", "level"];
    const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS "module" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            name TEXT NOT NULL,
            cn_name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            parent_id INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 1
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_module_name ON "module" (name) WHERE deleted_at IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_module_cn_name ON "module" (cn_name) WHERE deleted_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_module_parent_id ON "module" (parent_id);
        CREATE INDEX IF NOT EXISTS idx_module_level ON "module" (level);
    "#;

    fn values(&self) -> Vec<Value> {
        vec![
            (&self.name).into(),
            (&self.cn_name).into(),
            (&self.description).into(),
            self.parent_id.into(),
            self.level.into(),
        ]
    }
}

/// Project
///
/// A project record owned by a module. `module` carries the owning module's full
/// path, resolved at read time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Project {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub base: Base,
    pub name: String,
    pub cn_name: String,
    pub description: String,
    pub language: String,
    pub framework: String,
    pub owner: String,
    pub product_owner: String,
    pub test_owner: String,
    pub module_id: i64,
    #[sqlx(skip)]
    #[serde(default)]
    pub module: String,
}

impl Entity for Project {
    const TABLE: &'static str = "project";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "cn_name",
        "description",
        "language",
        "framework",
        "owner",
        "product_owner",
        "test_owner",
        "module_id",
    ];
    const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS "project" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            name TEXT NOT NULL,
            cn_name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            language TEXT NOT NULL DEFAULT '',
            framework TEXT NOT NULL DEFAULT '',
            owner TEXT NOT NULL DEFAULT '',
            product_owner TEXT NOT NULL DEFAULT '',
            test_owner TEXT NOT NULL DEFAULT '',
            module_id INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_project_name ON "project" (name) WHERE deleted_at IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_project_cn_name ON "project" (cn_name) WHERE deleted_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_project_module_id ON "project" (module_id);
    "#;

    fn values(&self) -> Vec<Value> {
        vec![
            (&self.name).into(),
            (&self.cn_name).into(),
            (&self.description).into(),
            (&self.language).into(),
            (&self.framework).into(),
            (&self.owner).into(),
            (&self.product_owner).into(),
            (&self.test_owner).into(),
            self.module_id.into(),
        ]
    }
}

/// Creates every table the service needs.
pub async fn migrate(store: &Store) -> Result<(), StoreError> {
    store.migrate::<User>().await?;
    store.migrate::<Module>().await?;
    store.migrate::<Project>().await?;
    Ok(())
}

// --- Request Payloads (Input Schemas) ---

/// LoginForm
///
/// Input payload for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// RegisterForm
///
/// Input payload for `POST /auth/register`. `password2` must repeat `password`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RegisterForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub password2: String,
    #[validate(length(min = 1, max = 64))]
    pub cn_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub im: String,
}

/// ChangePasswordForm
///
/// Input payload for `PUT /auth/changepassword`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordForm {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
    #[validate(must_match(other = "new_password"))]
    pub new_password_confirm: String,
}

/// ForgetPasswordForm
///
/// Input payload for `POST /auth/restpasswordrequest`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ForgetPasswordForm {
    #[validate(length(min = 1))]
    pub name: String,
}

/// ResetPasswordForm
///
/// Input payload for `PUT /auth/resetpassword/{token}`; the token travels in the path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ResetPasswordForm {
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub password_confirm: String,
}

/// CreateUserRequest
///
/// Admin-only payload for `POST /user`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[serde(default)]
    pub cn_name: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub im: String,
}

/// UpdateUserRequest
///
/// Partial update for `PUT /user/{id}`. `admin` and `enabled` are honoured only
/// when the caller is an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cn_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub im: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// CreateModuleRequest
///
/// Payload for `POST /module`. A zero (or absent) `parent_id` creates a root module.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 128))]
    pub cn_name: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub description: String,
    #[serde(default)]
    pub parent_id: i64,
}

/// UpdateModuleRequest
///
/// Payload for `PUT /module/{id}`. Only the description is mutable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateModuleRequest {
    #[validate(length(max = 1024))]
    pub description: String,
}

/// ProjectRequest
///
/// Full payload for `POST /project` and `PUT /project/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ProjectRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub cn_name: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub language: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub framework: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub product_owner: String,
    #[serde(default)]
    pub test_owner: String,
    #[validate(range(min = 1))]
    pub module_id: i64,
}

/// PatchProjectRequest
///
/// Partial payload for `PATCH /project/{id}`; absent fields keep their value.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct PatchProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 64))]
    pub cn_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub module_id: Option<i64>,
}

// --- Query Parameters ---

/// ListQuery
///
/// Pagination parameters shared by every list endpoint. `limit <= 0` returns everything.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number, defaults to 1.
    pub page: Option<i64>,
    /// Page size, defaults to 20.
    pub limit: Option<i64>,
}

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;

impl ListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// ModuleQuery
///
/// Filters for `GET /module`. At least one of `level` / `parent_id` must be non-zero;
/// `parent_id` wins when both are set.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ModuleQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub parent_id: i64,
}

/// ProjectQuery
///
/// Filters for `GET /project`; `module_id` narrows the list to one module.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ProjectQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub module_id: Option<i64>,
}
