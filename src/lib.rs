use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod controllers;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod repository;
pub mod response;
pub mod rest;
pub mod storage;

// Hand-written route groups plus the generated resource routes.
pub mod routes;
use routes::{authenticated, public, resources};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use mailer::{LogMailer, MailerState, MockMailer};
pub use storage::Store;

/// ApiDoc
///
/// OpenAPI document for every hand-written and generated route, served at
/// `/api-docs/openapi.json` when `api_doc` is enabled.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::register, handlers::login, handlers::change_password,
        handlers::reset_password_request, handlers::reset_password,
        controllers::user::create_user, controllers::user::delete_user,
        controllers::user::update_user, controllers::user::get_user, controllers::user::list_users,
        controllers::module::create_module, controllers::module::delete_module,
        controllers::module::update_module, controllers::module::get_module,
        controllers::module::list_modules,
        controllers::project::create_project, controllers::project::delete_project,
        controllers::project::update_project, controllers::project::patch_project,
        controllers::project::get_project, controllers::project::list_projects,
    ),
    components(
        schemas(
            models::Base, models::User, models::Token, models::Module, models::Project,
            models::LoginForm, models::RegisterForm, models::ChangePasswordForm,
            models::ForgetPasswordForm, models::ResetPasswordForm,
            models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateModuleRequest, models::UpdateModuleRequest,
            models::ProjectRequest, models::PatchProjectRequest,
        )
    ),
    tags(
        (name = "blade-admin", description = "Users, module taxonomy and project records")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The shared, cheaply clonable container of every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    /// Relational store behind the generic CRUD facade.
    pub store: Store,
    /// Outgoing mail transport.
    pub mailer: MailerState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for Store {
    fn from_ref(app_state: &AppState) -> Store {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles public, authenticated and generated resource routes, then wraps them
/// in the request-id, tracing and (optionally) CORS layers.
pub fn create_router(state: AppState) -> Router {
    let base = state.config.api_base.clone();

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let mut base_router = Router::new()
        .merge(public::public_routes(&base))
        .merge(
            authenticated::authenticated_routes(&base).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::login_required,
            )),
        )
        .merge(resources::resource_routes(&state));

    if state.config.api_doc {
        base_router = base_router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    let cors = state.config.cors;
    let router = base_router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    );

    if cors {
        router.layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_origin(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, uri and the `x-request-id` of the request,
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
