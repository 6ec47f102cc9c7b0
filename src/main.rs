mod cli;

use clap::Parser;
use restructure::telemetry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env with RESTRUCTURE_* variables.
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();

    let filter = telemetry::env_filter_with_level("warn", cli.log_level());
    tracing_subscriber::registry()
        .with(filter)
        .with(telemetry::layer())
        .init();

    cli::run(cli).await
}
