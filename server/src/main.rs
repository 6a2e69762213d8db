//! licman reference license server
//!
//! Hosts the license activation API (`licenses/{activate,deactivate,validate}/{key}`)
//! backed by an in-memory repository, guarded by the server-side validator.
//!
//! Usage:
//!   licman-server --port 8080 --seed licenses.json --consumer-key ck_... --consumer-secret cs_...

use anyhow::{Context, Result};
use clap::Parser;
use licman_server::{build_router, AppState, ServerConfig};
use licman_validator::{MemoryRepository, MemoryTransientStore, RepositorySeed, ValidatorConfig};
use std::{fs, path::PathBuf, sync::Arc};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "licman-server")]
#[command(about = "Reference license server for the licman activation protocol")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// JSON file with licenses, products, orders and users to serve
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// API consumer key clients authenticate with
    #[arg(long, env = "LICMAN_CONSUMER_KEY")]
    consumer_key: String,

    /// API consumer secret clients authenticate with
    #[arg(long, env = "LICMAN_CONSUMER_SECRET")]
    consumer_secret: String,

    /// Skip license form checks and accept unknown keys. Never use in production.
    #[arg(long)]
    debug: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("licman license server starting...");
    let seed = match &args.seed {
        Some(path) => load_seed(path)?,
        None => {
            warn!("No seed file given, serving an empty license repository");
            RepositorySeed::default()
        }
    };
    info!(
        "Loaded {} licenses, {} products",
        seed.licenses.len(),
        seed.products.len()
    );
    if args.debug {
        warn!("Debug mode is on: license form checks are disabled");
    }

    let config = ServerConfig {
        consumer_key: args.consumer_key,
        consumer_secret: args.consumer_secret,
        validator: ValidatorConfig {
            debug: args.debug,
            ..ValidatorConfig::default()
        },
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(
        config,
        Arc::new(MemoryRepository::seeded(seed)),
        Arc::new(MemoryTransientStore::new()),
    ));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .with_context(|| format!("Failed to bind port {}", args.port))?;
    info!("License API listening on port {}", args.port);
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}

fn load_seed(path: &PathBuf) -> Result<RepositorySeed> {
    info!("Loading seed from {:?}", path);
    let raw = fs::read_to_string(path).context("Failed to read seed file")?;
    serde_json::from_str(&raw).context("Failed to parse seed file")
}
