use axum::{
    Json,
    extract::{
        Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use validator::Validate;

use crate::{response::ApiResponse, rest::RestController};

pub mod module;
pub mod project;
pub mod user;

pub use module::ModuleController;
pub use project::ProjectController;
pub use user::UserController;

/// Every resource served through the route installer.
pub fn all() -> Vec<Box<dyn RestController>> {
    vec![
        Box::new(UserController),
        Box::new(ModuleController),
        Box::new(ProjectController),
    ]
}

/// Unwraps an `{id}` path segment; a non-numeric or non-positive id is a 400 with `code`.
pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>, code: i64) -> Result<i64, ApiResponse> {
    match path {
        Ok(Path(id)) if id > 0 => Ok(id),
        Ok(Path(id)) => Err(ApiResponse::bad_request(code, format!("invalid id {id}"))),
        Err(e) => Err(ApiResponse::bad_request(code, e.body_text())),
    }
}

/// Unwraps and validates a JSON body; malformed or invalid input is a 400 with `code`.
pub(crate) fn json_body<T: Validate>(body: Result<Json<T>, JsonRejection>, code: i64) -> Result<T, ApiResponse> {
    let Json(payload) = body.map_err(|e| ApiResponse::bad_request(code, e.body_text()))?;
    payload
        .validate()
        .map_err(|e| ApiResponse::bad_request(code, e))?;
    Ok(payload)
}

/// Unwraps query parameters; a malformed query string is a 400 with `code`.
pub(crate) fn query<T>(query: Result<Query<T>, QueryRejection>, code: i64) -> Result<T, ApiResponse> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiResponse::bad_request(code, e.body_text()))
}
