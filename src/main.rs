//! Etude backend server
//!
//! Serves the authentication API over HTTP, backed by SQLite or Postgres.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use etude_api::{ApiServer, ApiServerConfig, SecurityConfig};
use etude_db::DbStore;

/// Etude - practice tracking backend server
#[derive(Parser, Debug)]
#[command(name = "etude")]
#[command(about = "Etude - practice tracking backend server")]
#[command(version)]
struct Cli {
    /// Database URL (SQLite or Postgres)
    #[arg(long, env = "ETUDE_DATABASE_URL", default_value = "sqlite::memory:")]
    database_url: String,

    /// Address to bind the API server
    #[arg(long, env = "ETUDE_BIND_ADDR", default_value = "127.0.0.1:8080")]
    bind_addr: SocketAddr,

    /// Secret for signing access tokens
    #[arg(long, env = "ETUDE_JWT_SECRET")]
    jwt_secret: String,

    /// Issuer claim stamped into access tokens
    #[arg(long, env = "ETUDE_JWT_ISSUER", default_value = "etude")]
    jwt_issuer: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "ETUDE_ACCESS_TOKEN_TTL_SECS", default_value = "86400")]
    access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "ETUDE_REFRESH_TOKEN_TTL_SECS", default_value = "2419200")]
    refresh_token_ttl_secs: i64,

    /// Bcrypt cost factor for password hashing
    #[arg(long, env = "ETUDE_BCRYPT_COST", default_value = "12")]
    bcrypt_cost: u32,

    /// Disable the permissive development CORS layer
    #[arg(long, env = "ETUDE_DISABLE_CORS")]
    disable_cors: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Setup logging with the specified log level
fn setup_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    info!(
        "Etude backend {} ({}, built {})",
        env!("GIT_TAG"),
        env!("GIT_HASH"),
        env!("BUILD_TIME")
    );

    let db = etude_db::connect(&cli.database_url)
        .await
        .context("Failed to connect to database")?;

    etude_db::migrate(&db)
        .await
        .context("Failed to run database migrations")?;

    let store = Arc::new(DbStore::new(db));

    let config = ApiServerConfig {
        bind_addr: cli.bind_addr,
        enable_cors: !cli.disable_cors,
        security: SecurityConfig {
            jwt_secret: cli.jwt_secret,
            jwt_issuer: cli.jwt_issuer,
            access_token_ttl_secs: cli.access_token_ttl_secs,
            refresh_token_ttl_secs: cli.refresh_token_ttl_secs,
            bcrypt_cost: cli.bcrypt_cost,
        },
    };

    let server = ApiServer::new(config, store).context("Failed to initialize auth service")?;

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let server_task = tokio::spawn(server.start());

    // Wait for Ctrl+C or server exit
    tokio::select! {
        _ = &mut ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = server_task => {
            match result {
                Ok(Ok(())) => {
                    info!("Server stopped normally");
                }
                Ok(Err(e)) => {
                    error!("Server error: {:#}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Server task panicked: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    info!("Etude backend stopped");
    Ok(())
}
