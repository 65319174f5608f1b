use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context as _;
use serde::Serialize;

use crate::cli::AnalyzeArgs;
use crate::formats::RawRecord;
use crate::table::{Cell, Column, Table};

const TOP_N: usize = 10;
const HISTOGRAM_BINS: usize = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Analysis {
    pub rows: usize,
    pub describe: Vec<ColumnSummary>,
    pub longest_titles: Vec<TitleLength>,
    pub shortest_titles: Vec<TitleLength>,
    pub title_length_histogram: Vec<HistogramBin>,
    pub top_authors: Vec<AuthorCount>,
    pub publish_year: Option<YearSummary>,
    pub publish_year_histogram: Vec<HistogramBin>,
    pub year_rating_correlation: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TitleLength {
    pub title: String,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthorCount {
    pub author: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YearSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let raw_path = PathBuf::from(&args.raw);
    let records: Vec<RawRecord> =
        crate::formats::read_jsonl(&raw_path).context("read raw snapshot")?;
    let table = crate::clean::clean(&records)?;
    let analysis = analyze(&table);

    if args.json {
        let json = serde_json::to_string_pretty(&analysis).context("serialize analysis")?;
        println!("{json}");
    } else {
        print!("{}", crate::report::render(&analysis));
    }
    Ok(())
}

pub fn analyze(table: &Table) -> Analysis {
    let titles = title_lengths(table);
    let lengths: Vec<f64> = titles.iter().map(|t| t.length as f64).collect();
    let years = table.floats(Column::PublishYear);

    Analysis {
        rows: table.len(),
        describe: describe(table),
        longest_titles: longest(&titles),
        shortest_titles: shortest(&titles),
        title_length_histogram: histogram(&lengths, HISTOGRAM_BINS),
        top_authors: top_authors(table, TOP_N),
        publish_year: year_summary(&years),
        publish_year_histogram: histogram(&years, HISTOGRAM_BINS),
        year_rating_correlation: year_rating_correlation(table),
    }
}

/// Appends `Title_Length` and `Primary Author`, the columns the analysis
/// derives, so they are persisted alongside the clean columns.
pub fn with_derived_columns(table: Table) -> anyhow::Result<Table> {
    let mut table = table;

    let lengths: Option<Vec<Cell>> = table.cells(Column::Title).map(|cells| {
        cells
            .map(|cell| match cell {
                Cell::Text(title) => Cell::Int(title.chars().count() as i64),
                _ => Cell::Null,
            })
            .collect()
    });
    if let Some(lengths) = lengths {
        table = table.with_column(Column::TitleLength, lengths)?;
    }

    let authors: Option<Vec<Cell>> = table.cells(Column::Author).map(|cells| {
        cells
            .map(|cell| match cell {
                Cell::Text(author) => Cell::Text(primary_author(author).to_owned()),
                _ => Cell::Null,
            })
            .collect()
    });
    if let Some(authors) = authors {
        table = table.with_column(Column::PrimaryAuthor, authors)?;
    }

    Ok(table)
}

pub fn primary_author(author: &str) -> &str {
    author.split(',').next().unwrap_or(author).trim()
}

fn describe(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .filter(|column| column.is_numeric())
        .map(|column| {
            let values = table.floats(*column);
            let mut sorted = values.clone();
            sorted.sort_by(f64::total_cmp);
            ColumnSummary {
                column: column.name().to_owned(),
                count: values.len(),
                mean: mean(&values),
                std: sample_std(&values),
                min: sorted.first().copied(),
                p25: quantile(&sorted, 0.25),
                p50: quantile(&sorted, 0.5),
                p75: quantile(&sorted, 0.75),
                max: sorted.last().copied(),
            }
        })
        .collect()
}

fn title_lengths(table: &Table) -> Vec<TitleLength> {
    table
        .texts(Column::Title)
        .into_iter()
        .map(|title| TitleLength {
            title: title.to_owned(),
            length: title.chars().count(),
        })
        .collect()
}

fn longest(titles: &[TitleLength]) -> Vec<TitleLength> {
    let mut sorted = titles.to_vec();
    sorted.sort_by(|a, b| b.length.cmp(&a.length));
    sorted.truncate(TOP_N);
    sorted
}

fn shortest(titles: &[TitleLength]) -> Vec<TitleLength> {
    let mut sorted = titles.to_vec();
    sorted.sort_by_key(|t| t.length);
    sorted.truncate(TOP_N);
    sorted
}

fn top_authors(table: &Table, n: usize) -> Vec<AuthorCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for author in table.texts(Column::Author) {
        let primary = primary_author(author);
        let count = counts.entry(primary).or_insert(0);
        if *count == 0 {
            order.push(primary);
        }
        *count += 1;
    }

    let mut ranked: Vec<AuthorCount> = order
        .into_iter()
        .map(|author| AuthorCount {
            author: author.to_owned(),
            count: counts[author],
        })
        .collect();
    // Stable: ties keep first-seen order.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    ranked
}

fn year_summary(years: &[f64]) -> Option<YearSummary> {
    let mut sorted = years.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(YearSummary {
        mean: mean(years)?,
        median: quantile(&sorted, 0.5)?,
        min: *sorted.first()?,
        max: *sorted.last()?,
    })
}

fn year_rating_correlation(table: &Table) -> Option<f64> {
    let year_idx = table.column_index(Column::PublishYear)?;
    let rating_idx = table.column_index(Column::Rating)?;
    let (years, ratings): (Vec<f64>, Vec<f64>) = table
        .rows()
        .iter()
        .filter_map(|row| Some((row[year_idx].as_f64()?, row[rating_idx].as_f64()?)))
        .unzip();
    pearson(&years, &ratings)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    Some(var.sqrt())
}

/// Linear-interpolated quantile of already sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Equal-width bins over `[min, max]`; the last bin includes `max`. A
/// single distinct value is widened to `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0_usize; bins];
    for value in values {
        let idx = (((value - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            start: lo + width * idx as f64,
            end: lo + width * (idx + 1) as f64,
            count,
        })
        .collect()
}
