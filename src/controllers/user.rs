use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};

use super::{json_body, path_id, query};
use crate::{
    auth::CurrentUser,
    config::AppConfig,
    models::{CreateUserRequest, ListQuery, UpdateUserRequest, User},
    response::ApiResponse,
    rest::{Endpoint, EndpointResult, Middlewares, RestController, Verb},
    storage::{Filter, Store},
};

/// Envelope codes of the user resource.
pub mod code {
    pub const CREATE_FAILED: i64 = 20001;
    pub const DELETE_FAILED: i64 = 20002;
    pub const DELETE_SELF: i64 = 20003;
    pub const UPDATE_OTHER: i64 = 20004;
    pub const ID_ERROR: i64 = 20005;
    pub const UPDATE_FAILED: i64 = 20006;
    pub const GET_OTHER: i64 = 20007;
    pub const GET_FAILED: i64 = 20008;
    pub const LIST_FAILED: i64 = 20009;
    pub const INVALID_PARAM: i64 = 20010;
    pub const GENERATE_TOKEN: i64 = 20011;
}

/// UserController
///
/// Account management. Administrators create, delete and list accounts; every
/// logged-in user may read and update their own record.
pub struct UserController;

impl RestController for UserController {
    fn name(&self) -> &str {
        "user"
    }

    fn create(&self) -> EndpointResult {
        Ok(Endpoint::new(create_user))
    }

    fn delete(&self) -> EndpointResult {
        Ok(Endpoint::new(delete_user))
    }

    fn update(&self) -> EndpointResult {
        Ok(Endpoint::new(update_user))
    }

    fn get(&self) -> EndpointResult {
        Ok(Endpoint::new(get_user))
    }

    fn list(&self) -> EndpointResult {
        Ok(Endpoint::new(list_users))
    }

    fn middlewares(&self) -> Middlewares {
        Middlewares::new()
            .admin(&[Verb::Create, Verb::Delete, Verb::List])
            .login(&[Verb::Update, Verb::Get])
    }
}

/// create_user
///
/// [Admin Route] Creates an enabled account with an encoded password.
#[utoipa::path(
    post,
    path = "/api/v1/user",
    request_body = CreateUserRequest,
    responses((status = 200, description = "Created user, or failure envelope", body = User))
)]
pub async fn create_user(
    State(store): State<Store>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let req = json_body(body, code::INVALID_PARAM)?;
    tracing::debug!(name = %req.name, admin = req.admin, "create user");

    let mut user = User {
        name: req.name,
        cn_name: req.cn_name,
        password: req.password,
        email: req.email,
        admin: req.admin,
        enabled: true,
        phone: req.phone,
        im: req.im,
        ..User::default()
    };
    user.encode_password();

    let created = store
        .create(&user)
        .await
        .map_err(|e| ApiResponse::fail(code::CREATE_FAILED, e))?;
    tracing::info!(id = created.base.id, name = %created.name, "user created");
    Ok(ApiResponse::data(&created.into_public()))
}

/// delete_user
///
/// [Admin Route] Soft-deletes an account. Administrators can not delete themselves.
#[utoipa::path(
    delete,
    path = "/api/v1/user/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Ok, or failure envelope"))
)]
pub async fn delete_user(
    CurrentUser(current): CurrentUser,
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    if current.id == id {
        return Err(ApiResponse::fail(code::DELETE_SELF, "can not delete yourself"));
    }

    store
        .delete::<User>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::DELETE_FAILED, e))?;
    tracing::info!(id, by = %current.name, "user deleted");
    Ok(ApiResponse::ok())
}

/// update_user
///
/// [Authenticated Route] Updates profile fields. Non-admins may only update
/// themselves and can not change `admin`/`enabled`. Returns the user with a
/// freshly issued token.
#[utoipa::path(
    put,
    path = "/api/v1/user/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Updated user with a new token, or failure envelope", body = User))
)]
pub async fn update_user(
    CurrentUser(current): CurrentUser,
    State(store): State<Store>,
    State(config): State<AppConfig>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    let req = json_body(body, code::INVALID_PARAM)?;
    if !current.admin && current.id != id {
        return Err(ApiResponse::fail(code::UPDATE_OTHER, "can not update other user"));
    }

    let mut user = store
        .get::<User>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::UPDATE_FAILED, e))?;

    if let Some(cn_name) = req.cn_name {
        user.cn_name = cn_name;
    }
    if let Some(email) = req.email {
        user.email = email;
    }
    if let Some(phone) = req.phone {
        user.phone = phone;
    }
    if let Some(im) = req.im {
        user.im = im;
    }
    if current.admin {
        user.admin = req.admin.unwrap_or(user.admin);
        user.enabled = req.enabled.unwrap_or(user.enabled);
    } else if req.admin.is_some() || req.enabled.is_some() {
        tracing::debug!(id, "ignoring privilege fields from non-admin");
    }

    let mut updated = store
        .update(id, &user)
        .await
        .map_err(|e| ApiResponse::fail(code::UPDATE_FAILED, e))?;
    updated
        .gen_token(&config)
        .map_err(|e| ApiResponse::fail(code::GENERATE_TOKEN, e))?;
    tracing::info!(id, by = %current.name, "user updated");
    Ok(ApiResponse::data(&updated.into_public()))
}

/// get_user
///
/// [Authenticated Route] Reads one account. Non-admins may only read themselves.
#[utoipa::path(
    get,
    path = "/api/v1/user/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "User, or failure envelope", body = User))
)]
pub async fn get_user(
    CurrentUser(current): CurrentUser,
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    if !current.admin && current.id != id {
        return Err(ApiResponse::fail(code::GET_OTHER, "can not get other user"));
    }

    let user = store
        .get::<User>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::GET_FAILED, e))?;
    Ok(ApiResponse::data(&user.into_public()))
}

/// list_users
///
/// [Admin Route] Paginated account list, passwords stripped.
#[utoipa::path(
    get,
    path = "/api/v1/user",
    params(ListQuery),
    responses((status = 200, description = "Page of users, or failure envelope", body = [User]))
)]
pub async fn list_users(
    State(store): State<Store>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let params = query(params, code::INVALID_PARAM)?;
    tracing::debug!(?params, "list users");

    let (total, users) = store
        .list::<User>(params.limit(), params.page(), &Filter::new())
        .await
        .map_err(|e| ApiResponse::fail(code::LIST_FAILED, e))?;
    let users: Vec<User> = users.into_iter().map(User::into_public).collect();
    Ok(ApiResponse::list(total, &users))
}
