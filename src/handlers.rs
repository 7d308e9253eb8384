use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use crate::{
    auth::{self, CurrentUser},
    config::AppConfig,
    controllers::json_body,
    mailer::MailerState,
    models::{ChangePasswordForm, ForgetPasswordForm, LoginForm, RegisterForm, ResetPasswordForm, User},
    response::ApiResponse,
    storage::{Store, StoreError},
};

/// Envelope codes of the authentication endpoints.
pub mod code {
    pub const INVALID_PARAM: i64 = 10001;
    pub const ACCOUNT_NOT_FOUND: i64 = 10002;
    pub const PASSWORD_INVALID: i64 = 10003;
    pub const GENERATE_TOKEN: i64 = 10004;
    pub const REGISTER_FAILED: i64 = 10005;
    pub const EMAIL_NOT_ALLOWED: i64 = 10006;
    pub const CHANGE_PASSWORD_FAILED: i64 = 10007;
    pub const SEND_RESET_EMAIL_FAILED: i64 = 10008;
    pub const RESET_TOKEN_INVALID: i64 = 10009;
    pub const RESET_PASSWORD_FAILED: i64 = 10010;
    pub const OTHER: i64 = 10011;
    pub const ACCOUNT_DISABLED: i64 = 10012;
}

// --- Handlers ---

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health() -> &'static str {
    "ok"
}

/// register
///
/// [Public Route] Creates a regular, enabled account. When a company domain is
/// configured, only addresses under it are accepted.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterForm,
    responses(
        (status = 200, description = "Ok, or failure envelope"),
        (status = 400, description = "Malformed or invalid form")
    )
)]
pub async fn register(
    State(store): State<Store>,
    State(config): State<AppConfig>,
    body: Result<Json<RegisterForm>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let form = json_body(body, code::INVALID_PARAM)?;
    tracing::debug!(name = %form.name, email = %form.email, "register user");

    if !config.company.is_empty() {
        let domain = form.email.rsplit_once('@').map(|(_, domain)| domain);
        if domain != Some(config.company.as_str()) {
            return Err(ApiResponse::fail(code::EMAIL_NOT_ALLOWED, "email not allowed"));
        }
    }

    let mut user = User {
        name: form.name,
        cn_name: form.cn_name,
        password: form.password,
        email: form.email,
        enabled: true,
        phone: form.phone,
        im: form.im,
        ..User::default()
    };
    user.encode_password();

    let created = store
        .create(&user)
        .await
        .map_err(|e| ApiResponse::fail(code::REGISTER_FAILED, e))?;
    tracing::info!(id = created.base.id, name = %created.name, "user registered");
    Ok(ApiResponse::ok())
}

/// login
///
/// [Public Route] Verifies the password and returns the user with a signed token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginForm,
    responses(
        (status = 200, description = "User with token, or failure envelope", body = User),
        (status = 400, description = "Malformed form")
    )
)]
pub async fn login(
    State(store): State<Store>,
    State(config): State<AppConfig>,
    body: Result<Json<LoginForm>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let form = json_body(body, code::INVALID_PARAM)?;
    tracing::debug!(name = %form.name, "login");

    let mut user = match store.get::<User>(form.name.as_str()).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(ApiResponse::fail(code::ACCOUNT_NOT_FOUND, "account not found")),
        Err(e) => return Err(ApiResponse::fail(code::OTHER, e)),
    };
    if !user.validate_password(&form.password) {
        return Err(ApiResponse::fail(code::PASSWORD_INVALID, "password invalid"));
    }
    if !user.enabled {
        return Err(ApiResponse::fail(code::ACCOUNT_DISABLED, "account disabled"));
    }

    user.gen_token(&config)
        .map_err(|e| ApiResponse::fail(code::GENERATE_TOKEN, e))?;
    tracing::info!(id = user.base.id, name = %user.name, "user logged in");
    Ok(ApiResponse::data(&user.into_public()))
}

/// change_password
///
/// [Authenticated Route] Replaces the caller's password after checking the old one.
#[utoipa::path(
    put,
    path = "/api/v1/auth/changepassword",
    request_body = ChangePasswordForm,
    responses(
        (status = 200, description = "Ok, or failure envelope"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn change_password(
    CurrentUser(current): CurrentUser,
    State(store): State<Store>,
    body: Result<Json<ChangePasswordForm>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let form = json_body(body, code::INVALID_PARAM)?;
    tracing::debug!(user = %current.name, "change password");

    let mut user = store
        .get::<User>(current.id)
        .await
        .map_err(|e| ApiResponse::fail(code::CHANGE_PASSWORD_FAILED, e))?;
    if !user.validate_password(&form.old_password) {
        return Err(ApiResponse::fail(code::PASSWORD_INVALID, "password invalid"));
    }

    user.password = form.new_password;
    user.encode_password();
    store
        .update(current.id, &user)
        .await
        .map_err(|e| ApiResponse::fail(code::CHANGE_PASSWORD_FAILED, e))?;
    tracing::info!(id = current.id, "password changed");
    Ok(ApiResponse::ok())
}

/// reset_password_request
///
/// [Public Route] Mails the account owner a link `{domain}{reset_path}/{token}`
/// carrying a reset token valid for `url_expired` seconds.
#[utoipa::path(
    post,
    path = "/api/v1/auth/restpasswordrequest",
    request_body = ForgetPasswordForm,
    responses((status = 200, description = "Ok, or failure envelope"))
)]
pub async fn reset_password_request(
    State(store): State<Store>,
    State(config): State<AppConfig>,
    State(mailer): State<MailerState>,
    body: Result<Json<ForgetPasswordForm>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let form = json_body(body, code::INVALID_PARAM)?;
    tracing::debug!(name = %form.name, "reset password request");

    let user = store
        .get::<User>(form.name.as_str())
        .await
        .map_err(|e| ApiResponse::fail(code::ACCOUNT_NOT_FOUND, e))?;

    let token = auth::issue_reset_token(&config.jwt_secret, &user.name, config.url_expired)
        .map_err(|e| ApiResponse::fail(code::GENERATE_TOKEN, e))?;
    let link = format!("{}{}/{}", config.domain.trim_end_matches('/'), config.reset_path, token);
    let body = format!(
        "Reset password link: {link}, valid for {} seconds.",
        config.url_expired
    );

    mailer
        .send(&user.email, "Reset Password", &body)
        .await
        .map_err(|e| {
            tracing::error!("reset mail failed: {e}");
            ApiResponse::fail(code::SEND_RESET_EMAIL_FAILED, e)
        })?;
    Ok(ApiResponse::ok())
}

/// reset_password
///
/// [Public Route] Consumes a reset token and stores the new password.
#[utoipa::path(
    put,
    path = "/api/v1/auth/resetpassword/{token}",
    params(("token" = String, Path, description = "Reset token from the mailed link")),
    request_body = ResetPasswordForm,
    responses((status = 200, description = "Ok, or failure envelope"))
)]
pub async fn reset_password(
    State(store): State<Store>,
    State(config): State<AppConfig>,
    token: Result<Path<String>, PathRejection>,
    body: Result<Json<ResetPasswordForm>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let form = json_body(body, code::INVALID_PARAM)?;
    let token = token
        .map(|Path(token)| token)
        .map_err(|e| ApiResponse::fail(code::RESET_TOKEN_INVALID, e.body_text()))?;

    let name = auth::parse_reset_token(&config.jwt_secret, &token)
        .map_err(|e| ApiResponse::fail(code::RESET_TOKEN_INVALID, e))?;
    tracing::debug!(%name, "reset password");

    let mut user = store
        .get::<User>(name.as_str())
        .await
        .map_err(|e| ApiResponse::fail(code::RESET_PASSWORD_FAILED, e))?;
    user.password = form.password;
    user.encode_password();
    store
        .update(user.base.id, &user)
        .await
        .map_err(|e| ApiResponse::fail(code::RESET_PASSWORD_FAILED, e))?;
    tracing::info!(id = user.base.id, "password reset");
    Ok(ApiResponse::ok())
}
