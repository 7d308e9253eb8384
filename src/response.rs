use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

/// ApiResponse
///
/// The JSON envelope every API handler answers with. `code == 0` means success;
/// any other value is a resource-scoped error code carried next to a message.
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    body: Value,
}

impl ApiResponse {
    /// `{"code":0,"message":"ok"}`
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "code": 0, "message": "ok" }),
        }
    }

    /// `{"code":0,"data":…}`
    pub fn data<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                status: StatusCode::OK,
                body: json!({ "code": 0, "data": data }),
            },
            Err(e) => {
                tracing::error!("failed to serialize response body: {e}");
                Self::except(StatusCode::INTERNAL_SERVER_ERROR, 500, "serialize response")
            }
        }
    }

    /// `{"code":0,"data":{"total":N,"items":[…]}}`
    pub fn list<T: Serialize>(total: i64, items: &[T]) -> Self {
        #[derive(Serialize)]
        struct Page<'a, T> {
            total: i64,
            items: &'a [T],
        }
        Self::data(&Page { total, items })
    }

    /// A business failure: HTTP 200 with a non-zero code.
    pub fn fail(code: i64, message: impl ToString) -> Self {
        Self::except(StatusCode::OK, code, message)
    }

    /// A failure with an explicit HTTP status (malformed request, gates).
    pub fn except(status: StatusCode, code: i64, message: impl ToString) -> Self {
        Self {
            status,
            body: json!({ "code": code, "message": message.to_string() }),
        }
    }

    pub fn bad_request(code: i64, message: impl ToString) -> Self {
        Self::except(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl ToString) -> Self {
        Self::except(StatusCode::UNAUTHORIZED, 401, message)
    }

    pub fn forbidden(message: impl ToString) -> Self {
        Self::except(StatusCode::FORBIDDEN, 403, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
