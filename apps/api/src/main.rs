use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobmatch::config::Config;
use jobmatch::credentials::store::PgCredentialStore;
use jobmatch::db::{create_pool, run_migrations};
use jobmatch::llm_client::HttpCompletionClient;
use jobmatch::matching::{AiRouter, MatchService};
use jobmatch::routes::build_router;
use jobmatch::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_PKG_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobmatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize completion client (shared by every provider call)
    let client = HttpCompletionClient::open(&config.client_settings())?;

    let router_config = config.router_config();
    info!(
        "Provider calls: timeout {}ms, {} retr{}",
        router_config.timeout.as_millis(),
        router_config.max_retries,
        if router_config.max_retries == 1 { "y" } else { "ies" }
    );

    let router = AiRouter::new(Arc::new(client.clone()), router_config);
    let store = Arc::new(PgCredentialStore::new(db.clone()));
    let matcher = MatchService::new(router, store).with_kdf_params(config.kdf_params());

    let app = build_router(AppState::new(matcher))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    client.close();
    db.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
