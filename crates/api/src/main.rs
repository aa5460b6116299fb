use clap::Parser;

use astrobadge_api::{logging, server, ServerConfig};

/// Astrobadge API server: signed trust report intake and shields badges.
#[derive(Parser, Debug)]
#[command(name = "astrobadge-api")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging (overrides ASTROBADGE_LOG_LEVEL and RUST_LOG)
    #[arg(short, long)]
    debug: bool,

    /// Listen port (overrides ASTROBADGE_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }

    logging::init_logging(&config, args.debug)?;

    server::run_with_config(config).await
}
