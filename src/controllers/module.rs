use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};

use super::{json_body, path_id, query};
use crate::{
    models::{CreateModuleRequest, DEFAULT_LIMIT, DEFAULT_PAGE, Module, ModuleQuery, UpdateModuleRequest},
    repository::{self, ModuleError},
    response::ApiResponse,
    rest::{Endpoint, EndpointResult, Middlewares, RestController, Verb},
    storage::{Filter, Store},
};

/// Envelope codes of the module resource.
pub mod code {
    pub const CREATE_FAILED: i64 = 30001;
    pub const DELETE_FAILED: i64 = 30002;
    pub const UPDATE_FAILED: i64 = 30003;
    pub const GET_FAILED: i64 = 30004;
    pub const ID_ERROR: i64 = 30005;
    pub const LIST_FAILED: i64 = 30006;
    pub const INVALID_PARAM: i64 = 30007;
}

/// ModuleController
///
/// The module taxonomy. Every verb is reserved to administrators.
pub struct ModuleController;

impl RestController for ModuleController {
    fn name(&self) -> &str {
        "module"
    }

    fn create(&self) -> EndpointResult {
        Ok(Endpoint::new(create_module))
    }

    fn delete(&self) -> EndpointResult {
        Ok(Endpoint::new(delete_module))
    }

    fn update(&self) -> EndpointResult {
        Ok(Endpoint::new(update_module))
    }

    fn get(&self) -> EndpointResult {
        Ok(Endpoint::new(get_module))
    }

    fn list(&self) -> EndpointResult {
        Ok(Endpoint::new(list_modules))
    }

    fn middlewares(&self) -> Middlewares {
        Middlewares::new().admin(&Verb::ALL)
    }
}

/// create_module
///
/// [Admin Route] Creates a module under `parent_id` (0 for a root). Fails when the
/// parent is missing or the new module would sit deeper than level 5.
#[utoipa::path(
    post,
    path = "/api/v1/module",
    request_body = CreateModuleRequest,
    responses((status = 200, description = "Created module, or failure envelope", body = Module))
)]
pub async fn create_module(
    State(store): State<Store>,
    body: Result<Json<CreateModuleRequest>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let req = json_body(body, code::INVALID_PARAM)?;
    tracing::debug!(name = %req.name, parent_id = req.parent_id, "create module");

    let module = Module {
        name: req.name,
        cn_name: req.cn_name,
        description: req.description,
        parent_id: req.parent_id,
        ..Module::default()
    };
    let created = repository::create_module(&store, module).await.map_err(|e| {
        if let ModuleError::Store(inner) = &e {
            tracing::warn!("module create failed: {inner}");
        }
        ApiResponse::fail(code::CREATE_FAILED, e)
    })?;
    Ok(ApiResponse::data(&created))
}

/// delete_module
///
/// [Admin Route] Removes a module and its whole subtree.
#[utoipa::path(
    delete,
    path = "/api/v1/module/{id}",
    params(("id" = i64, Path, description = "Module id")),
    responses((status = 200, description = "Ok, or failure envelope"))
)]
pub async fn delete_module(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    repository::delete_module_tree(&store, id)
        .await
        .map_err(|e| ApiResponse::fail(code::DELETE_FAILED, e))?;
    Ok(ApiResponse::ok())
}

/// update_module
///
/// [Admin Route] Changes the description; nothing else about a module is mutable.
#[utoipa::path(
    put,
    path = "/api/v1/module/{id}",
    params(("id" = i64, Path, description = "Module id")),
    request_body = UpdateModuleRequest,
    responses((status = 200, description = "Ok, or failure envelope"))
)]
pub async fn update_module(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateModuleRequest>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    let req = json_body(body, code::INVALID_PARAM)?;

    let mut module = store
        .get::<Module>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::UPDATE_FAILED, e))?;
    if module.description == req.description {
        tracing::debug!(id, "module description not changed");
        return Ok(ApiResponse::ok());
    }

    tracing::debug!(id, old = %module.description, new = %req.description, "update module");
    module.description = req.description;
    store
        .update(id, &module)
        .await
        .map_err(|e| ApiResponse::fail(code::UPDATE_FAILED, e))?;
    Ok(ApiResponse::ok())
}

/// get_module
///
/// [Admin Route] Reads one module with its full path.
#[utoipa::path(
    get,
    path = "/api/v1/module/{id}",
    params(("id" = i64, Path, description = "Module id")),
    responses((status = 200, description = "Module, or failure envelope", body = Module))
)]
pub async fn get_module(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    let mut module = store
        .get::<Module>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::GET_FAILED, e))?;
    module.full_name = repository::resolve_full_name(&store, &module)
        .await
        .map_err(|e| ApiResponse::fail(code::GET_FAILED, e))?;
    Ok(ApiResponse::data(&module))
}

/// list_modules
///
/// [Admin Route] Lists the children of `parent_id`, or every module at `level`.
/// One of the two must be non-zero; `parent_id` takes precedence.
#[utoipa::path(
    get,
    path = "/api/v1/module",
    params(ModuleQuery),
    responses(
        (status = 200, description = "Page of modules, or failure envelope", body = [Module]),
        (status = 400, description = "Neither level nor parent_id given")
    )
)]
pub async fn list_modules(
    State(store): State<Store>,
    params: Result<Query<ModuleQuery>, QueryRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let params = query(params, code::INVALID_PARAM)?;
    tracing::debug!(?params, "list modules");

    let filter = if params.parent_id != 0 {
        Filter::new().eq("parent_id", params.parent_id)
    } else if params.level != 0 {
        Filter::new().eq("level", params.level)
    } else {
        return Err(ApiResponse::bad_request(
            code::INVALID_PARAM,
            "level and parent_id can't be 0 at the same time",
        ));
    };

    let (total, modules) = store
        .list::<Module>(
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.page.unwrap_or(DEFAULT_PAGE),
            &filter,
        )
        .await
        .map_err(|e| ApiResponse::fail(code::LIST_FAILED, e))?;
    let modules = repository::with_full_names(&store, modules)
        .await
        .map_err(|e| ApiResponse::fail(code::LIST_FAILED, e))?;
    Ok(ApiResponse::list(total, &modules))
}
