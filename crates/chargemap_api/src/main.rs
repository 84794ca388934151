use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chargemap_api::{create_app, share, spawn_location_pump};
use chargemap_engine::Engine;
use chargemap_engine::config::ChargemapConfig;
use clap::Parser;

/// Command line arguments for the chargemap server
#[derive(Parser, Debug)]
#[command(name = "chargemap")]
#[command(about = "Find EV charging stations near you and register your own")]
struct Args {
    /// Path to a JSON configuration file; defaults are used without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider registry file, overrides the configured path
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the server to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Skip location detection at startup
    #[arg(long)]
    no_detect: bool,

    /// Write exported maps without opening them
    #[arg(long)]
    no_viewer: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().pretty().init();

    let mut config = match &args.config {
        Some(path) => {
            let config = ChargemapConfig::load(path)?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => ChargemapConfig::default(),
    };
    if let Some(registry) = args.registry {
        config.registry_path = registry;
    }
    if args.no_viewer {
        config.map.open_viewer = false;
    }

    let mut engine = Engine::new(config);
    if !args.no_detect {
        if let Err(e) = engine.detect_location() {
            tracing::warn!("Location detection not started: {}", e);
        }
    }

    let engine = share(engine);
    let _pump = spawn_location_pump(engine.clone(), Duration::from_millis(250));
    let app = create_app(engine);

    let bind_addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
