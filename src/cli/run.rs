//! CLI entry-point for the offset-paged extraction pipeline.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::{export, store::PgStore},
    nlp::relclf,
    pipeline::{pool::WorkerPool, Orchestrator, RunOptions},
};

/// Args for the `run` command. Unset flags fall back to the environment.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Override START_DOCUMENT_OFFSET.
    #[arg(long)]
    pub start_offset: Option<i64>,
    /// Override MAX_DOCUMENT_OFFSET.
    #[arg(long)]
    pub max_offset: Option<i64>,
    /// Override PAGE_SIZE.
    #[arg(long)]
    pub page_size: Option<i64>,
    /// Override BATCH_SIZE.
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Fixed worker count instead of cores minus RESERVED_CORES.
    #[arg(long)]
    pub workers: Option<usize>,
    /// Extract and classify without writing to the store.
    #[arg(long)]
    pub dry_run: bool,
    /// Also write every result row to this file (`.parquet` or CSV).
    #[arg(long)]
    pub export: Option<PathBuf>,
}

impl Args {
    fn options(&self, settings: &Settings) -> RunOptions {
        RunOptions {
            start_offset: self.start_offset.unwrap_or(settings.start_offset),
            max_offset: self.max_offset.unwrap_or(settings.max_offset),
            page_size: self.page_size.unwrap_or(settings.page_size),
            batch_size: self.batch_size.unwrap_or(settings.batch_size),
            dry_run: self.dry_run,
            collect_results: self.export.is_some(),
            missing_report: Some(settings.missing_files_report()),
        }
    }
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let options = args.options(&settings);
    let pool = match args.workers {
        Some(workers) => WorkerPool::new(workers),
        None => WorkerPool::for_host(settings.reserved_cores),
    };
    info!(workers = pool.workers(), ?options, "configured run");

    let classifier = relclf::load_classifier(&settings.model)?;
    let store = Arc::new(PgStore::new(&settings.database));
    let orchestrator = Orchestrator::new(
        store,
        classifier,
        pool,
        options,
        settings.documents_path.clone(),
    );
    let summary = orchestrator.run().await?;

    if let Some(path) = &args.export {
        export::write_results(path, &summary.results)?;
    }
    Ok(())
}
