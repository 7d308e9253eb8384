use std::fmt;

use axum::{
    Router,
    handler::Handler,
    middleware,
    routing::{self, MethodFilter, MethodRouter},
};
use thiserror::Error;

use crate::{
    AppState,
    auth::{admin_required, login_required},
};

/// Verb
///
/// The six operations a resource can expose, each bound to one HTTP method and to
/// either the collection path or the item path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    Delete,
    Update,
    Patch,
    Get,
    List,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::Create,
        Verb::Delete,
        Verb::Update,
        Verb::Patch,
        Verb::Get,
        Verb::List,
    ];

    pub fn method(self) -> MethodFilter {
        match self {
            Verb::Create => MethodFilter::POST,
            Verb::Delete => MethodFilter::DELETE,
            Verb::Update => MethodFilter::PUT,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Get | Verb::List => MethodFilter::GET,
        }
    }

    /// Whether the verb addresses a single item rather than the collection.
    pub fn on_item(self) -> bool {
        !matches!(self, Verb::Create | Verb::List)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Create => "create",
            Verb::Delete => "delete",
            Verb::Update => "update",
            Verb::Patch => "patch",
            Verb::Get => "get",
            Verb::List => "list",
        };
        f.write_str(name)
    }
}

/// Returned by a controller for verbs it does not support.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("not implemented")]
pub struct Unimplemented;

/// Endpoint
///
/// A handler waiting to be bound to an HTTP method. Controllers wrap their handler
/// functions in it; the installer decides which method and path it lands on.
pub struct Endpoint(Box<dyn FnOnce(MethodFilter) -> MethodRouter<AppState> + Send>);

impl Endpoint {
    pub fn new<H, T>(handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self(Box::new(move |filter| routing::on(filter, handler)))
    }

    fn bind(self, filter: MethodFilter) -> MethodRouter<AppState> {
        (self.0)(filter)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Endpoint")
    }
}

pub type EndpointResult = Result<Endpoint, Unimplemented>;

/// Access
///
/// Gate chain a verb runs behind. `Admin` implies `Login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Public,
    Login,
    Admin,
}

/// Middlewares
///
/// Per-verb access declaration. Verbs not mentioned are public.
#[derive(Debug, Clone, Default)]
pub struct Middlewares {
    login: Vec<Verb>,
    admin: Vec<Verb>,
}

impl Middlewares {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a valid login token for `verbs`.
    pub fn login(mut self, verbs: &[Verb]) -> Self {
        self.login.extend_from_slice(verbs);
        self
    }

    /// Require a logged-in administrator for `verbs`.
    pub fn admin(mut self, verbs: &[Verb]) -> Self {
        self.admin.extend_from_slice(verbs);
        self
    }

    pub fn access(&self, verb: Verb) -> Access {
        if self.admin.contains(&verb) {
            Access::Admin
        } else if self.login.contains(&verb) {
            Access::Login
        } else {
            Access::Public
        }
    }
}

/// RestController
///
/// The contract a resource implements once to be served as versioned REST routes.
/// Every verb defaults to `Unimplemented`, so a resource overrides only what it supports.
pub trait RestController: Send + Sync {
    /// Path segment of the resource, e.g. `user`.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "v1"
    }

    fn create(&self) -> EndpointResult {
        Err(Unimplemented)
    }

    fn delete(&self) -> EndpointResult {
        Err(Unimplemented)
    }

    fn update(&self) -> EndpointResult {
        Err(Unimplemented)
    }

    fn patch(&self) -> EndpointResult {
        Err(Unimplemented)
    }

    fn get(&self) -> EndpointResult {
        Err(Unimplemented)
    }

    fn list(&self) -> EndpointResult {
        Err(Unimplemented)
    }

    fn middlewares(&self) -> Middlewares {
        Middlewares::default()
    }

    fn endpoint(&self, verb: Verb) -> EndpointResult {
        match verb {
            Verb::Create => self.create(),
            Verb::Delete => self.delete(),
            Verb::Update => self.update(),
            Verb::Patch => self.patch(),
            Verb::Get => self.get(),
            Verb::List => self.list(),
        }
    }
}

/// RestfulApi
///
/// Route installer. Paths are `{base}/{version}/{pre_parameter}/{name}` for the
/// collection and `{collection}/{post_parameter}` for a single item.
#[derive(Debug, Clone, Default)]
pub struct RestfulApi {
    pub base: String,
    pub pre_parameter: Option<String>,
    pub post_parameter: Option<String>,
}

fn push_segment(path: &mut String, segment: &str) {
    let segment = segment.trim_matches('/');
    if !segment.is_empty() {
        path.push('/');
        path.push_str(segment);
    }
}

impl RestfulApi {
    pub fn new(base: &str) -> Self {
        Self {
            base: crate::config::normalize_base(base),
            ..Self::default()
        }
    }

    pub fn with_pre_parameter(mut self, segment: &str) -> Self {
        self.pre_parameter = Some(segment.to_string());
        self
    }

    pub fn with_post_parameter(mut self, segment: &str) -> Self {
        self.post_parameter = Some(segment.to_string());
        self
    }

    pub fn collection_path(&self, rc: &dyn RestController) -> String {
        let mut path = self.base.clone();
        push_segment(&mut path, rc.version());
        if let Some(pre) = &self.pre_parameter {
            push_segment(&mut path, pre);
        }
        push_segment(&mut path, rc.name());
        path
    }

    pub fn item_path(&self, rc: &dyn RestController) -> String {
        let mut path = self.collection_path(rc);
        if let Some(post) = &self.post_parameter {
            push_segment(&mut path, post);
        }
        path
    }

    /// install
    ///
    /// Registers every verb `rc` implements on `router`, wrapping each in the gates
    /// it declares. `login_required` always runs before `admin_required`. Verbs the
    /// controller leaves unimplemented are not registered and fall through to the
    /// router's 404/405.
    pub fn install(&self, mut router: Router<AppState>, state: &AppState, rc: &dyn RestController) -> Router<AppState> {
        let collection = self.collection_path(rc);
        let item = self.item_path(rc);
        let middlewares = rc.middlewares();

        for verb in Verb::ALL {
            let endpoint = match rc.endpoint(verb) {
                Ok(endpoint) => endpoint,
                Err(Unimplemented) => {
                    tracing::debug!(resource = rc.name(), %verb, "verb not implemented, skipping");
                    continue;
                }
            };

            let path = if verb.on_item() { &item } else { &collection };
            // Without an item segment, get and list would both claim GET on one path.
            if verb == Verb::Get && item == collection {
                tracing::warn!(resource = rc.name(), path = %item, "no item path, get is not installed");
                continue;
            }

            let mut method_router = endpoint.bind(verb.method());
            let access = middlewares.access(verb);
            if access == Access::Admin {
                method_router = method_router.route_layer(middleware::from_fn(admin_required));
            }
            if access != Access::Public {
                method_router =
                    method_router.route_layer(middleware::from_fn_with_state(state.clone(), login_required));
            }

            tracing::debug!(resource = rc.name(), %verb, path = %path, ?access, "route installed");
            router = router.route(path, method_router);
        }

        router
    }
}
