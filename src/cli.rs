use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_DB_PATH, DEFAULT_DELAY_MS, DEFAULT_SEARCH_URL, DEFAULT_TABLE_NAME,
    DEFAULT_TARGET_COUNT, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape listing pages into a raw JSONL snapshot.
    Scrape(ScrapeArgs),
    /// Clean a raw snapshot into a JSONL table.
    Clean(CleanArgs),
    /// Clean a raw snapshot and print the analysis report.
    Analyze(AnalyzeArgs),
    /// Clean a raw snapshot and replace the SQLite table with it.
    Store(StoreArgs),
    /// Scrape, clean, analyze and store in one run.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Search results URL (must be http/https); `page` is appended per request.
    #[arg(long, default_value = DEFAULT_SEARCH_URL)]
    pub url: String,

    /// Number of valid records to collect before stopping.
    #[arg(long, default_value_t = DEFAULT_TARGET_COUNT)]
    pub target_count: usize,

    /// Delay between page requests (politeness).
    #[arg(long, default_value_t = DEFAULT_DELAY_MS)]
    pub delay_ms: u64,

    /// Per-request timeout.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Directory for memoized scrape results (disabled when unset).
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Maximum age of a cached scrape result (default: never expires).
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Drop the cached result for this URL/target count before scraping.
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output path for the raw `*.jsonl` snapshot.
    #[arg(long)]
    pub out: String,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Raw snapshot (created by `scrape`).
    #[arg(long)]
    pub raw: String,

    /// Output path for the cleaned `*.jsonl` table.
    #[arg(long)]
    pub out: String,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Raw snapshot (created by `scrape`).
    #[arg(long)]
    pub raw: String,

    /// Print the analysis as JSON instead of a text report.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Raw snapshot (created by `scrape`).
    #[arg(long)]
    pub raw: String,

    /// SQLite database file (created if missing).
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: String,

    /// Table to replace.
    #[arg(long, default_value = DEFAULT_TABLE_NAME)]
    pub table: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// SQLite database file (created if missing).
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: String,

    /// Table to replace.
    #[arg(long, default_value = DEFAULT_TABLE_NAME)]
    pub table: String,

    /// Print the analysis as JSON instead of a text report.
    #[arg(long)]
    pub json: bool,
}
