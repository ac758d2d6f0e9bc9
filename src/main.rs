use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ackermann_zenoh_runtime::config::RuntimeConfig;

/// Ackermann steering runtime: converts drive commands and laser scans into
/// per-wheel actuator commands over Zenoh.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Path to a JSON configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let config = RuntimeConfig::load(args.config.as_deref());

    if let Err(e) = ackermann_zenoh_runtime::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
