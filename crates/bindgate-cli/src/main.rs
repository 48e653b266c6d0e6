//! Bindgate - LDAP authentication over HTTP
//!
//! Accepts a login/password pair over HTTP, binds against a directory
//! server with it and returns the matching entry.

use bindgate_api::{GatewayServer, MetricsRecorder};
use bindgate_core::config::GatewayConfig;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bindgate")]
#[command(author = "Bindgate Team")]
#[command(version = bindgate_core::VERSION)]
#[command(about = "LDAP authentication gateway over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "BINDGATE_HOST")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<String>,

    /// Do not expose Prometheus metrics at /metrics
    #[arg(long)]
    no_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway (default)
    Serve,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Version)) {
        println!("bindgate {}", bindgate_core::VERSION);
        return Ok(());
    }

    // Load config
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::from_env()?,
    };
    apply_overrides(&mut config, &cli);

    init_logging(&config.logging.level, &config.logging.format);

    let mut server = GatewayServer::new(config);
    if !cli.no_metrics {
        server = server.with_metrics(MetricsRecorder::install()?);
        info!("Prometheus metrics enabled at /metrics");
    }

    info!("Starting Bindgate {}", bindgate_core::VERSION);
    server.run().await?;

    Ok(())
}

/// CLI arguments win over file and environment values
fn apply_overrides(config: &mut GatewayConfig, cli: &Cli) {
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
}

fn init_logging(level: &str, format: &str) {
    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
