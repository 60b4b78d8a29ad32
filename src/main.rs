// src/main.rs

use assessment::config::Config;
use assessment::routes;
use assessment::state::AppState;
use assessment::store::answer_keys::AnswerKeyStore;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Load the test catalog; an invalid catalog is fatal at startup
    let answer_keys = match &config.catalog_path {
        Some(path) => {
            tracing::info!("Loading test catalog from {}", path.display());
            AnswerKeyStore::from_path(path, config.default_test_id.clone()).await?
        }
        None => {
            tracing::info!("Using bundled test catalog");
            AnswerKeyStore::builtin(config.default_test_id.clone())?
        }
    };
    tracing::info!(
        "Catalog ready: {} test(s), default '{}'",
        answer_keys.list_tests().len(),
        answer_keys.default_test_id()
    );

    let addr = config.bind_addr;
    let state = AppState::new(config, answer_keys);

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    // Start the server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
