use blade_admin::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    mailer::{LogMailer, MailerState},
    models, repository,
    storage::Store,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database and schema, admin bootstrap,
/// then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and request summaries from tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blade_admin=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    for entry in &config.ignored {
        tracing::warn!("ignoring unparsable {entry}, default kept");
    }

    // 4. Database Initialization (SQLite)
    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to open the database. Check DATABASE_URL.");
    let store = Store::new(pool);

    models::migrate(&store)
        .await
        .expect("FATAL: Failed to create the schema.");

    // 5. Admin Bootstrap
    repository::ensure_admin(&store, &config.admin_password)
        .await
        .expect("FATAL: Failed to create the admin account.");

    // 6. Unified State Assembly
    let mailer = Arc::new(LogMailer::new(config.mail_from.clone())) as MailerState;
    let port = config.server_port;
    let api_doc = config.api_doc;
    let app_state = AppState {
        store,
        mailer,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind the HTTP port. Check SERVER_PORT.");

    tracing::info!("Listening on {addr}");
    if api_doc {
        tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");
    }

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
