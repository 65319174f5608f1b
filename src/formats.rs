use std::fs::OpenOptions;
use std::io::{BufRead as _, BufReader, BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// One listing entry as scraped, before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Publish Year")]
    pub publish_year: i64,
    #[serde(rename = "Rating")]
    pub rating: f64,
    #[serde(rename = "want to read")]
    pub want_to_read: Option<i64>,
    #[serde(rename = "# of Editions")]
    pub edition_count: Option<i64>,
}

impl RawRecord {
    /// Title, Author, PublishYear and Rating must all be present. Extraction
    /// already guarantees a four-digit year; a rating of zero is the listing's
    /// placeholder for an unrated book and counts as absent.
    pub fn is_admissible(&self) -> bool {
        !self.title.trim().is_empty() && !self.author.trim().is_empty() && self.rating != 0.0
    }
}

pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("output already exists: {}", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create jsonl: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut out, record).context("serialize jsonl record")?;
        out.write_all(b"\n").context("write jsonl newline")?;
    }
    out.flush().context("flush jsonl")?;
    Ok(())
}

pub fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("open jsonl: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("read jsonl line")?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("parse jsonl line {}: {}", idx + 1, path.display()))?;
        records.push(record);
    }
    Ok(records)
}
