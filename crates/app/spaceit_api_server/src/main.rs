//! Space-It API server binary.
//!
//! Settings come from `ApiConfig::from_env`; the flags below override the
//! listener address and database URL.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spaceit_api::AppState;
use spaceit_api::config::ApiConfig;
use spaceit_core::auth::session::MemorySessionStore;
use spaceit_core::store::postgres::PgStore;

const DEFAULT_LOG_FILTER: &str = "info,spaceit_api=debug,spaceit_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "spaceit_api_server", about = "Space-It API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    info!(
        bind_addr = %config.bind_addr,
        origins = ?config.allowed_origins,
        rate_capacity = config.rate_limit.capacity,
        rate_refill_per_sec = config.rate_limit.refill_per_sec,
        "starting spaceit_api_server"
    );

    info!(max_connections = args.max_connections, "configuring connection pool");
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    spaceit_api::migrate(&pool).await?;

    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(MemorySessionStore::new()),
        config.clone(),
    );
    let app = spaceit_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
