//! Homedash - home telemetry dashboard engine.
//!
//! Run with: `cargo run -p homedash-service`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use homedash_core::{ChannelRenderer, Engine};
use homedash_service::{Config, LogRenderer, build_store};

/// Homedash - polls the telemetry store and renders the dashboard state.
#[derive(Parser, Debug)]
#[command(name = "homedash")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Telemetry store URL (overrides config).
    #[arg(long, global = true)]
    store_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run both schedules until interrupted (default behavior).
    Run,

    /// Run a single refresh cycle and print the snapshot as JSON.
    Once,

    /// Validate the configuration and print the effective settings.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("homedash_service=info".parse()?)
                .add_directive("homedash_core=info".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Override config with CLI args
    if let Some(url) = args.store_url {
        config.store.url = url;
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Once => once(&config).await,
        Command::Check => check(&config),
    }
}

fn check(config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    print!("{}", config.to_toml()?);
    Ok(())
}

async fn once(config: &Config) -> anyhow::Result<()> {
    let engine_config = config.engine_config()?;
    let store = build_store(&config.store).context("Failed to create store client")?;

    let mut engine = Engine::new(
        Arc::new(store),
        engine_config,
        Arc::new(ChannelRenderer::default()),
    );
    let snapshot = engine.refresh_mut().run_cycle().await;

    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
    Ok(())
}

async fn run(config: &Config) -> anyhow::Result<()> {
    let engine_config = config.engine_config()?;
    let store = build_store(&config.store).context("Failed to create store client")?;

    info!(
        "Polling {} slot(s) from {} (database {})",
        engine_config.slots.len(),
        config.store.url,
        config.store.database
    );

    let handle = Engine::new(Arc::new(store), engine_config, Arc::new(LogRenderer::new())).start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received shutdown signal");

    handle.shutdown().await;
    Ok(())
}
