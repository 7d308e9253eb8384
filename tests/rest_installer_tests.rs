use axum::{
    Router,
    body::{Body, to_bytes},
    extract::Path,
    http::{Method, Request, StatusCode, header},
};
use blade_admin::{
    AppConfig, AppState, MockMailer,
    auth::{self, Claims},
    controllers::{ModuleController, UserController},
    models::{self, User},
    rest::{Access, Endpoint, EndpointResult, Middlewares, RestController, RestfulApi, Unimplemented, Verb},
    storage::Store,
};
use std::sync::Arc;
use tower::ServiceExt;

// --- A minimal read-only resource ---

struct Ping;

async fn list_pings() -> &'static str {
    "list"
}

async fn get_ping(Path(id): Path<i64>) -> String {
    format!("get {id}")
}

async fn delete_ping() -> &'static str {
    "deleted"
}

impl RestController for Ping {
    fn name(&self) -> &str {
        "ping"
    }

    fn version(&self) -> &str {
        "v2"
    }

    fn list(&self) -> EndpointResult {
        Ok(Endpoint::new(list_pings))
    }

    fn get(&self) -> EndpointResult {
        Ok(Endpoint::new(get_ping))
    }

    fn delete(&self) -> EndpointResult {
        Ok(Endpoint::new(delete_ping))
    }

    fn middlewares(&self) -> Middlewares {
        Middlewares::new().admin(&[Verb::Delete])
    }
}

async fn state() -> AppState {
    let store = Store::in_memory().await.unwrap();
    models::migrate(&store).await.unwrap();
    AppState {
        store,
        mailer: Arc::new(MockMailer::new()),
        config: AppConfig::default(),
    }
}

fn installed(api: &RestfulApi, state: &AppState, rc: &dyn RestController) -> Router {
    api.install(Router::new(), state, rc).with_state(state.clone())
}

async fn send(router: &Router, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

// --- Paths ---

#[test]
fn test_paths_follow_version_and_parameters() {
    let api = RestfulApi::new("api/").with_post_parameter("{id}");
    assert_eq!(api.collection_path(&ModuleController), "/api/v1/module");
    assert_eq!(api.item_path(&ModuleController), "/api/v1/module/{id}");
    assert_eq!(api.collection_path(&Ping), "/api/v2/ping");

    let nested = RestfulApi::new("/api")
        .with_pre_parameter("{tenant}")
        .with_post_parameter("/{id}/");
    assert_eq!(nested.collection_path(&UserController), "/api/v1/{tenant}/user");
    assert_eq!(nested.item_path(&UserController), "/api/v1/{tenant}/user/{id}");

    let bare = RestfulApi::new("");
    assert_eq!(bare.collection_path(&Ping), "/v2/ping");
    assert_eq!(bare.item_path(&Ping), bare.collection_path(&Ping));
}

#[test]
fn test_default_contract_is_unimplemented() {
    struct Empty;
    impl RestController for Empty {
        fn name(&self) -> &str {
            "empty"
        }
    }

    assert_eq!(Empty.version(), "v1");
    for verb in Verb::ALL {
        assert!(matches!(Empty.endpoint(verb), Err(Unimplemented)), "{verb}");
        assert_eq!(Empty.middlewares().access(verb), Access::Public);
    }
}

#[test]
fn test_middleware_declarations() {
    let users = UserController.middlewares();
    assert_eq!(users.access(Verb::Create), Access::Admin);
    assert_eq!(users.access(Verb::List), Access::Admin);
    assert_eq!(users.access(Verb::Get), Access::Login);
    assert_eq!(users.access(Verb::Patch), Access::Public);

    let modules = ModuleController.middlewares();
    assert!(Verb::ALL.iter().all(|v| modules.access(*v) == Access::Admin));
}

// --- Installation ---

#[tokio::test]
async fn test_installed_verbs_dispatch_to_method_and_path() {
    let state = state().await;
    let api = RestfulApi::new("/api").with_post_parameter("{id}");
    let router = installed(&api, &state, &Ping);

    assert_eq!(
        send(&router, Method::GET, "/api/v2/ping", None).await,
        (StatusCode::OK, "list".to_string())
    );
    assert_eq!(
        send(&router, Method::GET, "/api/v2/ping/7", None).await,
        (StatusCode::OK, "get 7".to_string())
    );
}

#[tokio::test]
async fn test_unimplemented_verbs_are_not_routed() {
    let state = state().await;
    let api = RestfulApi::new("/api").with_post_parameter("{id}");
    let router = installed(&api, &state, &Ping);

    assert_eq!(
        send(&router, Method::POST, "/api/v2/ping", None).await.0,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        send(&router, Method::PUT, "/api/v2/ping/7", None).await.0,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        send(&router, Method::GET, "/api/v1/ping", None).await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_declared_gates_wrap_only_their_verb() {
    let state = state().await;
    let api = RestfulApi::new("/api").with_post_parameter("{id}");
    let router = installed(&api, &state, &Ping);

    assert_eq!(
        send(&router, Method::DELETE, "/api/v2/ping/7", None).await.0,
        StatusCode::UNAUTHORIZED
    );

    let mut user = User {
        name: "bob".to_string(),
        email: "bob@example.com".to_string(),
        enabled: true,
        ..User::default()
    };
    user.encode_password();
    let bob = state.store.create(&user).await.unwrap();
    let token = auth::issue_token(
        &state.config.jwt_secret,
        &Claims::for_user(bob.base.id, "bob", false, 60),
    )
    .unwrap();
    assert_eq!(
        send(&router, Method::DELETE, "/api/v2/ping/7", Some(&token)).await.0,
        StatusCode::FORBIDDEN
    );

    user.name = "root".to_string();
    user.email = "root@example.com".to_string();
    user.admin = true;
    let root = state.store.create(&user).await.unwrap();
    let token = auth::issue_token(
        &state.config.jwt_secret,
        &Claims::for_user(root.base.id, "root", true, 60),
    )
    .unwrap();
    assert_eq!(
        send(&router, Method::DELETE, "/api/v2/ping/7", Some(&token)).await,
        (StatusCode::OK, "deleted".to_string())
    );

    // The public list stays reachable without a token.
    assert_eq!(send(&router, Method::GET, "/api/v2/ping", None).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_get_is_skipped_without_item_segment() {
    let state = state().await;
    let router = installed(&RestfulApi::new("/api"), &state, &Ping);

    // Only list owns GET on the shared path.
    assert_eq!(
        send(&router, Method::GET, "/api/v2/ping", None).await,
        (StatusCode::OK, "list".to_string())
    );
}
