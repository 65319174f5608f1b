use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::cli::SourceArgs;

pub const DEFAULT_SEARCH_URL: &str =
    "https://openlibrary.org/search?q=subject%3AScience+fiction&mode=ebooks&sort=rating";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";
pub const DEFAULT_TARGET_COUNT: usize = 500;
pub const DEFAULT_DELAY_MS: u64 = 300;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DB_PATH: &str = "novels.db";
pub const DEFAULT_TABLE_NAME: &str = "novels";

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub search_url: Url,
    pub user_agent: String,
    pub timeout: Duration,
    pub delay: Duration,
    pub target_count: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub dir: PathBuf,
    /// `None` keeps entries forever.
    pub ttl: Option<Duration>,
    pub refresh: bool,
}

impl ScrapeConfig {
    pub fn from_args(args: &SourceArgs) -> anyhow::Result<Self> {
        let search_url = Url::parse(&args.url).context("parse --url")?;
        if search_url.scheme() != "http" && search_url.scheme() != "https" {
            anyhow::bail!("--url must be http/https: {search_url}");
        }
        if args.target_count == 0 {
            anyhow::bail!("--target-count must be at least 1");
        }

        Ok(Self {
            search_url,
            user_agent: args.user_agent.clone(),
            timeout: Duration::from_secs(args.timeout_secs),
            delay: Duration::from_millis(args.delay_ms),
            target_count: args.target_count,
        })
    }
}

impl CacheConfig {
    pub fn from_args(args: &SourceArgs) -> Option<Self> {
        let dir = args.cache_dir.as_ref()?;
        Some(Self {
            dir: PathBuf::from(dir),
            ttl: args.cache_ttl_secs.map(Duration::from_secs),
            refresh: args.refresh,
        })
    }
}
