//! Command-line interface wiring for relation-miner.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{ModelSettings, Settings};

pub mod classify;
pub mod run;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(
    name = "relation-miner",
    author,
    version,
    about = "Keyword co-occurrence relation mining over article corpora",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command, loading only the settings it needs.
    pub async fn dispatch(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run::run(args, Settings::load()?).await,
            Commands::Classify(args) => classify::run(args, ModelSettings::load()?).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Page through the document store, extract, classify and persist relations.
    Run(run::Args),
    /// Classify a single sentence for a keyword pair. Needs only MODEL_PATH.
    Classify(classify::Args),
}
