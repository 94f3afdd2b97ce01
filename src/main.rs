mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use jobbroker::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::SubmitApi(args) => jobbroker::submit_api::run(args.address, config).await?,
        Commands::WorkerApi(args) => jobbroker::worker_api::run(args.address, config).await?,
    }

    Ok(())
}
