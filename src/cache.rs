use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use tokio::fs;

use crate::formats::RawRecord;

/// Identity of one scrape: the same URL and target count yield the same
/// cached records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeKey {
    pub url: String,
    pub target_count: usize,
}

impl ScrapeKey {
    pub fn new(url: impl Into<String>, target_count: usize) -> Self {
        Self {
            url: url.into(),
            target_count,
        }
    }

    pub fn digest(&self) -> String {
        let mut hasher = sha2::Sha256::new();
        hasher.update(self.url.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.target_count.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: ScrapeKey,
    pub fetched_at: DateTime<Utc>,
    pub records: Vec<RawRecord>,
}

#[async_trait]
pub trait ScrapeCache: Send + Sync {
    async fn get(&self, key: &ScrapeKey) -> anyhow::Result<Option<Vec<RawRecord>>>;
    async fn put(&self, key: &ScrapeKey, records: &[RawRecord]) -> anyhow::Result<()>;
    async fn invalidate(&self, key: &ScrapeKey) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalFsScrapeCache {
    base_dir: PathBuf,
    ttl: Option<Duration>,
}

impl LocalFsScrapeCache {
    pub fn new(base_dir: impl Into<PathBuf>, ttl: Option<Duration>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ttl,
        }
    }

    fn entry_path(&self, key: &ScrapeKey) -> PathBuf {
        self.base_dir
            .join("scrape")
            .join(format!("{}.json", key.digest()))
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        let age = (Utc::now() - entry.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age >= ttl
    }

    pub async fn put_entry(&self, entry: &CacheEntry) -> anyhow::Result<()> {
        write_json_atomic(&self.entry_path(&entry.key), entry)
            .await
            .context("write scrape cache entry")
    }
}

#[async_trait]
impl ScrapeCache for LocalFsScrapeCache {
    async fn get(&self, key: &ScrapeKey) -> anyhow::Result<Option<Vec<RawRecord>>> {
        let path = self.entry_path(key);
        let Some(entry) = read_json::<CacheEntry>(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?
        else {
            return Ok(None);
        };

        if entry.key != *key {
            tracing::debug!(path = %path.display(), "scrape cache key mismatch; ignoring");
            return Ok(None);
        }
        if self.is_expired(&entry) {
            tracing::debug!(fetched_at = %entry.fetched_at, "scrape cache entry expired");
            return Ok(None);
        }
        Ok(Some(entry.records))
    }

    async fn put(&self, key: &ScrapeKey, records: &[RawRecord]) -> anyhow::Result<()> {
        self.put_entry(&CacheEntry {
            key: key.clone(),
            fetched_at: Utc::now(),
            records: records.to_vec(),
        })
        .await
    }

    async fn invalidate(&self, key: &ScrapeKey) -> anyhow::Result<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove: {}", path.display())),
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
