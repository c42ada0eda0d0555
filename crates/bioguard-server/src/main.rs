//! bioguard-server: HTTP server for biometric PIN re-authentication
//!
//! Serves the biometric endpoints and provides small admin commands for the
//! JSON user store.

use anyhow::{bail, Context, Result};
use bioguard_core::{BiometricGuard, JsonFileUserStore, LogMailer, ResetCodeMailer, UserStore};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bioguard_server::{router, AccessTokenIssuer, AppState, ServerConfig};

#[derive(Parser)]
#[command(name = "bioguard-server")]
#[command(about = "HTTP server for PIN-based biometric re-authentication", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the server config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Register a user in the store
    AddUser {
        /// Email address of the new user
        email: String,
    },

    /// Print a primary access token for a user
    IssueToken {
        /// Email address of the user
        email: String,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "bioguard_server=debug,bioguard_core=debug,tower_http=debug"
    } else {
        "bioguard_server=info,bioguard_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.unwrap_or_else(ServerConfig::default_path);

    match cli.command {
        Commands::Serve { host, port } => serve(load_config(&config_path)?, host, port).await,
        Commands::AddUser { email } => add_user(&load_config(&config_path)?, &email).await,
        Commands::IssueToken { email } => issue_token(&load_config(&config_path)?, &email).await,
        Commands::InitConfig { force } => init_config(&config_path, force),
    }
}

/// Config file (or defaults) with environment overrides applied
fn load_config(path: &Path) -> Result<ServerConfig> {
    let mut config = if path.exists() {
        ServerConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?
    } else {
        info!("No config file at {:?}, using defaults", path);
        ServerConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Config file {:?} already exists (use --force to overwrite)", path);
    }
    ServerConfig::default().save(path)?;
    println!("Wrote default config to {:?}", path);
    println!("Set session_secret and access_secret before running `serve`.");
    Ok(())
}

async fn serve(mut config: ServerConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    config.validate()?;

    info!("Starting bioguard-server v{}", env!("CARGO_PKG_VERSION"));
    info!("User store: {:?}", config.store_path);

    let store = Arc::new(JsonFileUserStore::open(&config.store_path)?);
    let guard = BiometricGuard::builder(store, config.session_secret()?.as_bytes())
        .mailer(build_mailer(&config)?)
        .config(config.guard.clone())
        .build()?;
    let access = AccessTokenIssuer::new(
        config.access_secret()?.as_bytes(),
        config.access_token_ttl_secs,
    )?;

    // Configure CORS for mobile app access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(AppState::new(guard, access))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("bioguard-server stopped");
    Ok(())
}

#[cfg(feature = "smtp")]
fn build_mailer(config: &ServerConfig) -> Result<Arc<dyn ResetCodeMailer>> {
    match &config.smtp {
        Some(smtp) => {
            info!("Sending reset codes through SMTP relay {}", smtp.host);
            Ok(Arc::new(bioguard_core::SmtpMailer::new(smtp)?))
        }
        None => {
            warn!("No SMTP relay configured - reset codes are written to the log");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[cfg(not(feature = "smtp"))]
fn build_mailer(config: &ServerConfig) -> Result<Arc<dyn ResetCodeMailer>> {
    if config.smtp.is_some() {
        warn!("SMTP configured but the `smtp` feature is disabled - using log mailer");
    } else {
        warn!("No SMTP relay configured - reset codes are written to the log");
    }
    Ok(Arc::new(LogMailer))
}

async fn add_user(config: &ServerConfig, email: &str) -> Result<()> {
    let store = JsonFileUserStore::open(&config.store_path)?;
    let user = store.register_user(email, Utc::now()).await?;

    println!("Created user {} <{}>", user.user_id, user.email);
    Ok(())
}

async fn issue_token(config: &ServerConfig, email: &str) -> Result<()> {
    let store = JsonFileUserStore::open(&config.store_path)?;
    let email = bioguard_core::record::normalize_email(email);
    let user = store
        .find_by_email(&email)
        .await?
        .with_context(|| format!("No user with email {}", email))?;

    let access = AccessTokenIssuer::new(
        config.access_secret()?.as_bytes(),
        config.access_token_ttl_secs,
    )?;
    println!("{}", access.issue(user.user_id, Utc::now())?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
