use blog_backend::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{RepositoryState, SqliteRepository},
    seed,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database, token services, HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production settings)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_backend=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!(env = ?config.env, token_ttl_secs = config.token_ttl.as_secs(), "application starting");

    // 3. Database
    let sqlite = SqliteRepository::connect(&config.db_url)
        .await
        .expect("FATAL: Failed to open the database. Check DATABASE_URL.");
    sqlite
        .migrate()
        .await
        .expect("FATAL: Failed to run database migrations.");

    if config.seed_sample_data {
        match seed::seed_sample_data(&sqlite).await {
            Ok(true) => tracing::info!(
                password = seed::SAMPLE_PASSWORD,
                "sample accounts: reader@example.com, author@example.com, editor@example.com"
            ),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "failed to seed sample data"),
        }
    }

    let repo = Arc::new(sqlite) as RepositoryState;

    // 4. Shared state: the token issuer/validator are built from the configured secret here.
    let port = config.port;
    let app_state = AppState::new(repo, config);

    // 5. Router and server
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
    }
}
