use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::cache::{LocalFsScrapeCache, ScrapeCache, ScrapeKey};
use crate::cli::ScrapeArgs;
use crate::config::{CacheConfig, ScrapeConfig};
use crate::formats::RawRecord;

/// A paginated listing; pages are numbered from 1.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_page(&self, page: u32) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpListingSource {
    client: reqwest::Client,
    search_url: Url,
    user_agent: String,
}

impl HttpListingSource {
    pub fn new(config: &ScrapeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build listing http client")?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, page: u32) -> anyhow::Result<String> {
        let url = self.page_url(page);
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url}: HTTP {status}");
        }

        response
            .text()
            .await
            .with_context(|| format!("read body: {url}"))
    }
}

pub async fn run(args: ScrapeArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    if out_path.exists() {
        anyhow::bail!("raw snapshot output already exists: {}", out_path.display());
    }

    let config = ScrapeConfig::from_args(&args.source)?;
    let source = HttpListingSource::new(&config)?;
    let cache = CacheConfig::from_args(&args.source);

    let records = scrape_with_cache(&source, &config, cache.as_ref()).await?;
    tracing::info!(records = records.len(), out = %out_path.display(), "scrape finished");

    crate::formats::write_jsonl(&out_path, &records).context("write raw snapshot")?;
    Ok(())
}

/// How a scrape run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The target was reached or the source ran out of listing items.
    Complete,
    /// A page request failed; the records are whatever came before it.
    Aborted,
}

/// Collects up to `target_count` admissible records, one page at a time.
///
/// A failed page fetch ends the run with whatever was collected so far. A
/// listing item that fails extraction is logged and skipped. A page without
/// listing items means the source is exhausted.
pub async fn scrape<S>(source: &S, target_count: usize, delay: Duration) -> Vec<RawRecord>
where
    S: ListingSource + ?Sized,
{
    scrape_with_outcome(source, target_count, delay).await.0
}

pub async fn scrape_with_outcome<S>(
    source: &S,
    target_count: usize,
    delay: Duration,
) -> (Vec<RawRecord>, ScrapeOutcome)
where
    S: ListingSource + ?Sized,
{
    let mut accumulated: Vec<RawRecord> = Vec::new();
    let mut page: u32 = 1;

    while accumulated.len() < target_count {
        tracing::info!(page, collected = accumulated.len(), "scraping page");
        let html = match source.fetch_page(page).await {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(page, err = %format!("{err:#}"), "page request failed; stopping");
                return (accumulated, ScrapeOutcome::Aborted);
            }
        };

        let items = crate::extract::listing_items(&html);
        if items.is_empty() {
            tracing::info!(page, "no listing items; source exhausted");
            break;
        }

        for item in &items {
            if accumulated.len() >= target_count {
                break;
            }
            match item.extract() {
                Ok(record) if record.is_admissible() => accumulated.push(record),
                Ok(record) => {
                    tracing::debug!(page, title = %record.title, "listing item incomplete; skipped");
                }
                Err(err) => tracing::warn!(page, %err, "error while parsing listing item; skipped"),
            }
        }

        page += 1;
        if accumulated.len() < target_count && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    (accumulated, ScrapeOutcome::Complete)
}

pub async fn scrape_with_cache<S>(
    source: &S,
    config: &ScrapeConfig,
    cache: Option<&CacheConfig>,
) -> anyhow::Result<Vec<RawRecord>>
where
    S: ListingSource + ?Sized,
{
    let Some(cache_config) = cache else {
        return Ok(scrape(source, config.target_count, config.delay).await);
    };

    let cache = LocalFsScrapeCache::new(&cache_config.dir, cache_config.ttl);
    let key = ScrapeKey::new(config.search_url.as_str(), config.target_count);
    scrape_through(source, config, &cache, &key, cache_config.refresh).await
}

pub async fn scrape_through<S>(
    source: &S,
    config: &ScrapeConfig,
    cache: &dyn ScrapeCache,
    key: &ScrapeKey,
    refresh: bool,
) -> anyhow::Result<Vec<RawRecord>>
where
    S: ListingSource + ?Sized,
{
    if refresh {
        cache.invalidate(key).await.context("invalidate scrape cache")?;
    } else if let Some(records) = cache.get(key).await.context("read scrape cache")? {
        tracing::info!(records = records.len(), "using cached scrape result");
        return Ok(records);
    }

    let (records, outcome) = scrape_with_outcome(source, config.target_count, config.delay).await;
    match outcome {
        ScrapeOutcome::Complete => cache
            .put(key, &records)
            .await
            .context("write scrape cache")?,
        ScrapeOutcome::Aborted => {
            tracing::warn!(records = records.len(), "scrape aborted; result not cached");
        }
    }
    Ok(records)
}
