use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::analyze::Analysis;
use crate::cli::RunArgs;
use crate::config::{CacheConfig, ScrapeConfig};
use crate::formats::RawRecord;
use crate::scrape::{HttpListingSource, ListingSource};
use crate::table::Table;

#[derive(Debug, Clone, Copy)]
pub enum PipelineEvent<'a> {
    Scraping { url: &'a str, target_count: usize },
    Scraped { records: usize },
    Cleaned { before: usize, after: usize },
    Analyzed { analysis: &'a Analysis },
    Stored { table: &'a str, rows: usize },
}

/// Receives pipeline progress and outputs as each stage completes.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent<'_>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        match event {
            PipelineEvent::Scraping { url, target_count } => {
                tracing::info!(url, target_count, "pipeline: scrape");
            }
            PipelineEvent::Scraped { records } => tracing::info!(records, "pipeline: scraped"),
            PipelineEvent::Cleaned { before, after } => {
                tracing::info!(before, after, "pipeline: cleaned");
            }
            PipelineEvent::Analyzed { analysis } => {
                tracing::info!(rows = analysis.rows, "pipeline: analyzed");
            }
            PipelineEvent::Stored { table, rows } => tracing::info!(table, rows, "pipeline: stored"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub scrape: ScrapeConfig,
    pub cache: Option<CacheConfig>,
    pub db_path: PathBuf,
    pub table_name: String,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub raw: Vec<RawRecord>,
    pub clean: Table,
    pub analysis: Analysis,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let request = PipelineRequest {
        scrape: ScrapeConfig::from_args(&args.source)?,
        cache: CacheConfig::from_args(&args.source),
        db_path: PathBuf::from(&args.db),
        table_name: args.table.clone(),
    };
    let source = HttpListingSource::new(&request.scrape)?;
    let reporter = crate::report::ConsoleReporter::new(args.json);

    execute(&source, &request, &reporter).await?;
    Ok(())
}

/// fetch → clean → analyze → persist, once.
pub async fn execute(
    source: &dyn ListingSource,
    request: &PipelineRequest,
    observer: &dyn PipelineObserver,
) -> anyhow::Result<PipelineOutput> {
    observer.on_event(&PipelineEvent::Scraping {
        url: request.scrape.search_url.as_str(),
        target_count: request.scrape.target_count,
    });
    let raw = crate::scrape::scrape_with_cache(source, &request.scrape, request.cache.as_ref())
        .await
        .context("scrape")?;
    observer.on_event(&PipelineEvent::Scraped { records: raw.len() });

    let clean = crate::clean::clean(&raw).context("clean")?;
    observer.on_event(&PipelineEvent::Cleaned {
        before: raw.len(),
        after: clean.len(),
    });

    let analysis = crate::analyze::analyze(&clean);
    observer.on_event(&PipelineEvent::Analyzed {
        analysis: &analysis,
    });

    let stored = crate::analyze::with_derived_columns(clean.clone()).context("derive columns")?;
    persist(&request.db_path, &request.table_name, &stored).await?;
    observer.on_event(&PipelineEvent::Stored {
        table: &request.table_name,
        rows: stored.len(),
    });

    Ok(PipelineOutput {
        raw,
        clean,
        analysis,
    })
}

async fn persist(db_path: &Path, table_name: &str, table: &Table) -> anyhow::Result<()> {
    crate::store::persist(db_path, table_name, table)
        .await
        .with_context(|| format!("store table {table_name} in {}", db_path.display()))
}
