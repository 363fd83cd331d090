//! Streamcast Server
//!
//! Run with: cargo run -- [--config streamcast.toml] [--generator random]
//!
//! # Configuration
//!
//! Settings come from the config file (or the default search path), then
//! `STREAMCAST_*` environment variables, then command-line flags.
//! `RUST_LOG` overrides the configured log level.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use streamcast::api::{serve, AppState};
use streamcast::config::{generate_default_config, Config, LoggingConfig};
use streamcast::generators::GeneratorKind;
use streamcast::hub::SubscriptionManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "streamcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Server-push broadcast hub for named event streams")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Event generator feeding every stream
    #[arg(short, long, value_enum)]
    generator: Option<GeneratorKind>,

    /// Time between events on a stream (ms)
    #[arg(long)]
    tick_interval_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::InitConfig { output }) = &cli.command {
        let template = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, template)?;
                println!("Wrote default config to {}", path.display());
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    init_logging(&config.logging);

    tracing::info!("Starting Streamcast v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        generator = %config.broadcast.generator,
        tick_interval_ms = config.broadcast.tick_interval_ms,
        grace_period_ms = config.broadcast.grace_period_ms,
        "Broadcast settings"
    );

    let hub = SubscriptionManager::new(
        config.broadcast.generator.build(),
        config.broadcast.to_hub_config(),
    );
    let api_config = config.server.to_api_config();

    serve(AppState::new(hub, api_config.clone()), &api_config).await?;

    tracing::info!("Streamcast stopped");
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(generator) = cli.generator {
        config.broadcast.generator = generator;
    }
    if let Some(ms) = cli.tick_interval_ms {
        config.broadcast.tick_interval_ms = ms;
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("streamcast={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
