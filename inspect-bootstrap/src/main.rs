use anyhow::Result;
use clap::Parser;

use inspect_infrastructure::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "inspect-service")]
#[command(about = "Item Inspect Service", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match args.config {
        Some(path) => AppConfig::load_from(&path).await?,
        None => AppConfig::load().await?,
    };

    let _log_guard = inspect_bootstrap::logging::init(&config);

    inspect_bootstrap::run_standalone(config).await
}
