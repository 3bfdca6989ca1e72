//! Agora forum kernel
//!
//! HTTP server and maintenance commands.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use uuid::Uuid;

use agora_kernel::config_storage::{ConfigProvider, ConfigStore, SiteConfigStore};
use agora_kernel::permissions::{Capability, PermissionService};
use agora_kernel::{AppState, Config, db, session};

#[derive(Parser)]
#[command(name = "agora", version, about = "Agora forum kernel")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Apply database migrations and exit.
    Migrate,
    /// Read or change forum settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Grant a capability to a single forum user.
    Grant {
        /// Forum user id.
        user_id: Uuid,
        /// `administrator` or `moderate`.
        capability: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a setting.
    Get { key: String },
    /// Store a setting.
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let pool = db::create_pool(&config).await?;
            db::run_migrations(&pool).await?;
            info!("Migrations applied");
            Ok(())
        }
        Command::Config { action } => {
            let pool = db::create_pool(&config).await?;
            let store = SiteConfigStore::new(pool, config.config_cache_ttl);
            match action {
                ConfigAction::Get { key } => {
                    match store.get(&key).await? {
                        Some(value) => println!("{value}"),
                        None => println!("(not set)"),
                    }
                    Ok(())
                }
                ConfigAction::Set { key, value } => {
                    store.set(&key, &value).await?;
                    info!(key = %key, "setting stored");
                    Ok(())
                }
            }
        }
        Command::Grant {
            user_id,
            capability,
        } => {
            let capability: Capability = capability.parse()?;
            let pool = db::create_pool(&config).await?;
            PermissionService::new(pool)
                .grant(user_id, capability)
                .await?;
            info!(user_id = %user_id, capability = capability.as_str(), "capability granted");
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Agora forum kernel");

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    info!("Database and Redis connections established");

    let same_site = match config.cookie_same_site.as_str() {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    };
    let session_layer = session::create_session_layer(&config.redis_url, same_site)
        .await
        .context("failed to create session layer")?;

    // TraceLayer → session → gate → routes
    let app = agora_kernel::app(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
