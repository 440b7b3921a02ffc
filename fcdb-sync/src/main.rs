//! fcdb-sync - card metadata synchronization service
//!
//! `serve` runs the HTTP trigger API; `run` performs a single sync in-process
//! (for schedulers) and exits non-zero if the run fails.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fcdb_common::config::{
    default_config_path, load_config, resolve_root_folder, write_toml_config, TomlConfig,
    ROOT_FOLDER_ENV,
};
use fcdb_common::events::EventBus;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fcdb_sync::config::SyncSettings;
use fcdb_sync::types::{SyncMode, SyncRequest, SyncTarget};
use fcdb_sync::{AppState, SyncPipeline};

const DATABASE_FILE: &str = "fcdb.db";
const DEFAULT_LOG_FILTER: &str = "fcdb_sync=info,fcdb_common=info,tower_http=info";

/// Command-line arguments for fcdb-sync
#[derive(Parser, Debug)]
#[command(name = "fcdb-sync")]
#[command(about = "Card metadata synchronization service")]
#[command(version)]
struct Args {
    /// TOML config file (default: platform config dir)
    #[arg(short, long, global = true, env = "FCDB_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Port to listen on (overrides FCDB_PORT and the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one sync and exit
    Run {
        /// `metadata` or a family slug (clubs, leagues, nations, programs,
        /// traits, skill-moves, celebrations)
        target: String,

        #[arg(long, value_enum, default_value = "full")]
        mode: ModeArg,

        /// Page limit for paginated families in full mode
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Write a starter config file (to --config or the platform location)
    InitConfig {
        /// Provider base URL to put in the file
        #[arg(long)]
        base_url: String,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Test,
    Full,
}

impl From<ModeArg> for SyncMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Test => SyncMode::Test,
            ModeArg::Full => SyncMode::Full,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { base_url, force } = &args.command {
        return init_config(args.config.as_deref(), base_url, *force);
    }

    let toml_config = load_config(args.config.as_deref()).context("Failed to load config")?;

    let default_filter = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("fcdb-sync {}", env!("CARGO_PKG_VERSION"));

    let mut settings = SyncSettings::from_toml(&toml_config).context("Invalid configuration")?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml_config);
    let db_path = root_folder.join(DATABASE_FILE);
    info!("Database: {}", db_path.display());

    let db_pool = fcdb_sync::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let event_bus = EventBus::new(100);

    match args.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.port = port;
            }
            let port = settings.port;
            let pipeline = SyncPipeline::from_pool(db_pool.clone(), Arc::new(settings), event_bus.clone())
                .context("Failed to build sync pipeline")?;

            let state = AppState::new(db_pool, Arc::new(pipeline), event_bus);
            serve(state, port).await
        }
        Command::InitConfig { .. } => Ok(()),
        Command::Run {
            target,
            mode,
            max_pages,
        } => {
            let target: SyncTarget = target
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let pipeline = SyncPipeline::from_pool(db_pool, Arc::new(settings), event_bus)
                .context("Failed to build sync pipeline")?;

            let request = SyncRequest {
                mode: mode.into(),
                max_pages,
            };
            let report = pipeline.run(target, request).await;

            println!("{}", serde_json::to_string_pretty(&report.to_response())?);

            if report.is_success() {
                Ok(())
            } else {
                error!("{}", report.message());
                std::process::exit(1);
            }
        }
    }
}

/// Write a minimal config naming the provider; everything else stays default
fn init_config(explicit: Option<&std::path::Path>, base_url: &str, force: bool) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("No platform config directory")?,
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to replace it)", path.display());
    }

    let mut config = TomlConfig::default();
    config.provider.base_url = Some(base_url.to_string());
    SyncSettings::from_toml(&config).context("Invalid provider base URL")?;

    write_toml_config(&config, &path).context("Failed to write config file")?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = fcdb_sync::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
