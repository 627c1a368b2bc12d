//! YaMDb server - Main Application Entry Point
//!
//! # Commands
//!
//! - `serve` (default): run the HTTP API
//! - `import-csv --dir <path>`: load the seed CSV files
//! - `create-superuser --username <u> --email <e>`: bootstrap an admin
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Run the requested command

use std::path::PathBuf;

use anyhow::Context;
use axum::{ServiceExt, extract::Request};
use clap::{Parser, Subcommand};
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing_subscriber::EnvFilter;

use yamdb_api::{
    AppState, build_router,
    config::Config,
    db::{self, DbPool},
    error::AppError,
    services::{auth_service, import_service, mailer::Mailer},
};

/// Command-line arguments for the YaMDb server
#[derive(Parser, Debug)]
#[command(name = "yamdb")]
#[command(about = "Review aggregation API: titles, reviews, comments and ratings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve,

    /// Load seed data from CSV files
    ImportCsv {
        /// Directory holding users.csv, category.csv, genre.csv, ...
        #[arg(long, default_value = "static/data", env = "YAMDB_IMPORT_DIR")]
        dir: PathBuf,
    },

    /// Create or promote an admin account and print its confirmation code
    CreateSuperuser {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG, defaults to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to the database")?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, config).await,
        Command::ImportCsv { dir } => import_csv(&pool, dir).await,
        Command::CreateSuperuser { username, email } => {
            create_superuser(&pool, &username, &email).await
        }
    }
}

async fn serve(pool: DbPool, config: Config) -> anyhow::Result<()> {
    let mailer = Mailer::from_config(&config).context("Invalid mail configuration")?;
    tracing::info!(backend = ?config.mail_backend, "Mailer ready");

    let port = config.server_port;
    let state = AppState::new(pool, config, mailer);

    // Trailing slashes are stripped before routing
    let app = NormalizePathLayer::trim_trailing_slash().layer(build_router(state));

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn import_csv(pool: &DbPool, dir: PathBuf) -> anyhow::Result<()> {
    tracing::info!(dir = %dir.display(), "Importing CSV data");

    let reports = import_service::import_directory(pool, &dir).await?;
    for report in &reports {
        println!(
            "{}: {} inserted, {} skipped",
            report.file, report.inserted, report.skipped
        );
    }

    if reports.is_empty() {
        tracing::warn!(dir = %dir.display(), "No CSV files found");
    }
    Ok(())
}

async fn create_superuser(pool: &DbPool, username: &str, email: &str) -> anyhow::Result<()> {
    let (user, code) = auth_service::bootstrap_superuser(pool, username, email)
        .await
        .map_err(|e| match e {
            AppError::Validation(fields) => anyhow::anyhow!(
                "Could not create superuser: {}",
                serde_json::to_string(&fields).unwrap_or_default()
            ),
            other => anyhow::anyhow!("Could not create superuser: {other}"),
        })?;

    tracing::info!(username = %user.username, "Superuser ready");
    println!("Superuser '{}' ready.", user.username);
    println!("Confirmation code: {code}");
    println!("Exchange it at POST /api/v1/auth/token");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
