use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};

use super::{json_body, path_id, query};
use crate::{
    models::{DEFAULT_LIMIT, DEFAULT_PAGE, Module, PatchProjectRequest, Project, ProjectQuery, ProjectRequest},
    repository,
    response::ApiResponse,
    rest::{Endpoint, EndpointResult, Middlewares, RestController, Verb},
    storage::{Filter, Store, StoreError},
};

/// Envelope codes of the project resource.
pub mod code {
    pub const CREATE_FAILED: i64 = 40001;
    pub const DELETE_FAILED: i64 = 40002;
    pub const UPDATE_FAILED: i64 = 40003;
    pub const GET_FAILED: i64 = 40004;
    pub const ID_ERROR: i64 = 40005;
    pub const LIST_FAILED: i64 = 40006;
    pub const INVALID_PARAM: i64 = 40007;
}

/// ProjectController
///
/// Project records attached to a module. Any logged-in user can read and edit;
/// creating and deleting is for administrators.
pub struct ProjectController;

impl RestController for ProjectController {
    fn name(&self) -> &str {
        "project"
    }

    fn create(&self) -> EndpointResult {
        Ok(Endpoint::new(create_project))
    }

    fn delete(&self) -> EndpointResult {
        Ok(Endpoint::new(delete_project))
    }

    fn update(&self) -> EndpointResult {
        Ok(Endpoint::new(update_project))
    }

    fn patch(&self) -> EndpointResult {
        Ok(Endpoint::new(patch_project))
    }

    fn get(&self) -> EndpointResult {
        Ok(Endpoint::new(get_project))
    }

    fn list(&self) -> EndpointResult {
        Ok(Endpoint::new(list_projects))
    }

    fn middlewares(&self) -> Middlewares {
        Middlewares::new()
            .admin(&[Verb::Create, Verb::Delete])
            .login(&[Verb::Update, Verb::Patch, Verb::Get, Verb::List])
    }
}

// A project may only point at a live module.
async fn check_module(store: &Store, module_id: i64, code: i64) -> Result<(), ApiResponse> {
    match store.get::<Module>(module_id).await {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound) => Err(ApiResponse::fail(code, format!("module {module_id} not found"))),
        Err(e) => Err(ApiResponse::fail(code, e)),
    }
}

fn apply(project: &mut Project, req: ProjectRequest) {
    project.name = req.name;
    project.cn_name = req.cn_name;
    project.description = req.description;
    project.language = req.language;
    project.framework = req.framework;
    project.owner = req.owner;
    project.product_owner = req.product_owner;
    project.test_owner = req.test_owner;
    project.module_id = req.module_id;
}

/// create_project
///
/// [Admin Route] Creates a project under an existing module.
#[utoipa::path(
    post,
    path = "/api/v1/project",
    request_body = ProjectRequest,
    responses((status = 200, description = "Created project, or failure envelope", body = Project))
)]
pub async fn create_project(
    State(store): State<Store>,
    body: Result<Json<ProjectRequest>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let req = json_body(body, code::INVALID_PARAM)?;
    tracing::debug!(name = %req.name, module_id = req.module_id, "create project");
    check_module(&store, req.module_id, code::CREATE_FAILED).await?;

    let mut project = Project::default();
    apply(&mut project, req);
    let created = store
        .create(&project)
        .await
        .map_err(|e| ApiResponse::fail(code::CREATE_FAILED, e))?;
    let created = repository::attach_module(&store, created)
        .await
        .map_err(|e| ApiResponse::fail(code::CREATE_FAILED, e))?;
    tracing::info!(id = created.base.id, name = %created.name, "project created");
    Ok(ApiResponse::data(&created))
}

/// delete_project
///
/// [Admin Route] Soft-deletes a project.
#[utoipa::path(
    delete,
    path = "/api/v1/project/{id}",
    params(("id" = i64, Path, description = "Project id")),
    responses((status = 200, description = "Ok, or failure envelope"))
)]
pub async fn delete_project(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    store
        .delete::<Project>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::DELETE_FAILED, e))?;
    tracing::info!(id, "project deleted");
    Ok(ApiResponse::ok())
}

/// update_project
///
/// [Authenticated Route] Replaces every editable field of a project.
#[utoipa::path(
    put,
    path = "/api/v1/project/{id}",
    params(("id" = i64, Path, description = "Project id")),
    request_body = ProjectRequest,
    responses((status = 200, description = "Updated project, or failure envelope", body = Project))
)]
pub async fn update_project(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProjectRequest>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    let req = json_body(body, code::INVALID_PARAM)?;

    let mut project = store
        .get::<Project>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::UPDATE_FAILED, e))?;
    if project.module_id != req.module_id {
        check_module(&store, req.module_id, code::UPDATE_FAILED).await?;
    }
    apply(&mut project, req);

    save(&store, id, &project).await
}

/// patch_project
///
/// [Authenticated Route] Updates only the fields present in the body. The project
/// name is immutable here.
#[utoipa::path(
    patch,
    path = "/api/v1/project/{id}",
    params(("id" = i64, Path, description = "Project id")),
    request_body = PatchProjectRequest,
    responses((status = 200, description = "Updated project, or failure envelope", body = Project))
)]
pub async fn patch_project(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<PatchProjectRequest>, JsonRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    let req = json_body(body, code::INVALID_PARAM)?;

    let mut project = store
        .get::<Project>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::UPDATE_FAILED, e))?;
    if let Some(module_id) = req.module_id.filter(|m| *m != project.module_id) {
        check_module(&store, module_id, code::UPDATE_FAILED).await?;
        project.module_id = module_id;
    }
    let fields = [
        (req.cn_name, &mut project.cn_name),
        (req.description, &mut project.description),
        (req.language, &mut project.language),
        (req.framework, &mut project.framework),
        (req.owner, &mut project.owner),
        (req.product_owner, &mut project.product_owner),
        (req.test_owner, &mut project.test_owner),
    ];
    for (value, field) in fields {
        if let Some(value) = value {
            *field = value;
        }
    }

    save(&store, id, &project).await
}

async fn save(store: &Store, id: i64, project: &Project) -> Result<ApiResponse, ApiResponse> {
    let updated = store
        .update(id, project)
        .await
        .map_err(|e| ApiResponse::fail(code::UPDATE_FAILED, e))?;
    let updated = repository::attach_module(store, updated)
        .await
        .map_err(|e| ApiResponse::fail(code::UPDATE_FAILED, e))?;
    tracing::info!(id, "project updated");
    Ok(ApiResponse::data(&updated))
}

/// get_project
///
/// [Authenticated Route] Reads one project with its module path.
#[utoipa::path(
    get,
    path = "/api/v1/project/{id}",
    params(("id" = i64, Path, description = "Project id")),
    responses((status = 200, description = "Project, or failure envelope", body = Project))
)]
pub async fn get_project(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let id = path_id(path, code::ID_ERROR)?;
    let project = store
        .get::<Project>(id)
        .await
        .map_err(|e| ApiResponse::fail(code::GET_FAILED, e))?;
    let project = repository::attach_module(&store, project)
        .await
        .map_err(|e| ApiResponse::fail(code::GET_FAILED, e))?;
    Ok(ApiResponse::data(&project))
}

/// list_projects
///
/// [Authenticated Route] Paginated project list, optionally narrowed to one module.
#[utoipa::path(
    get,
    path = "/api/v1/project",
    params(ProjectQuery),
    responses((status = 200, description = "Page of projects, or failure envelope", body = [Project]))
)]
pub async fn list_projects(
    State(store): State<Store>,
    params: Result<Query<ProjectQuery>, QueryRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let params = query(params, code::INVALID_PARAM)?;
    tracing::debug!(?params, "list projects");

    let filter = match params.module_id {
        Some(module_id) if module_id != 0 => Filter::new().eq("module_id", module_id),
        _ => Filter::new(),
    };
    let (total, projects) = store
        .list::<Project>(
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.page.unwrap_or(DEFAULT_PAGE),
            &filter,
        )
        .await
        .map_err(|e| ApiResponse::fail(code::LIST_FAILED, e))?;

    let mut items = Vec::with_capacity(projects.len());
    for project in projects {
        items.push(
            repository::attach_module(&store, project)
                .await
                .map_err(|e| ApiResponse::fail(code::LIST_FAILED, e))?,
        );
    }
    Ok(ApiResponse::list(total, &items))
}
