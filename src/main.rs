//! Entry point wiring CLI dispatch to the pipeline.

use anyhow::Result;
use relation_miner::{cli::Cli, logging};
use tracing::{info, instrument};

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    logging::init_tracing()?;
    let cli = Cli::parse();

    info!(?cli, "starting command");
    cli.dispatch().await
}
