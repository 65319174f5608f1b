use std::fmt::Write as _;

use crate::analyze::{Analysis, HistogramBin, TitleLength};
use crate::pipeline::{PipelineEvent, PipelineObserver};

const BAR_WIDTH: usize = 40;

/// Terminal presentation: progress on stderr, the report on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    json: bool,
}

impl ConsoleReporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl PipelineObserver for ConsoleReporter {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        match event {
            PipelineEvent::Scraping { url, target_count } => {
                eprintln!("Scraping up to {target_count} books from {url} ...");
            }
            PipelineEvent::Scraped { records } => {
                eprintln!("Data scraping completed: {records} records.");
            }
            PipelineEvent::Cleaned { before, after } => {
                eprintln!("Data cleaned: {after} of {before} rows kept.");
            }
            PipelineEvent::Analyzed { analysis } => {
                if self.json {
                    match serde_json::to_string_pretty(analysis) {
                        Ok(json) => println!("{json}"),
                        Err(err) => tracing::error!(?err, "serialize analysis"),
                    }
                } else {
                    print!("{}", render(analysis));
                }
                eprintln!("Analysis completed.");
            }
            PipelineEvent::Stored { table, rows } => {
                eprintln!("Stored {rows} rows in table {table}.");
            }
        }
    }
}

pub fn render(analysis: &Analysis) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, analysis);
    out
}

fn write_report(out: &mut String, analysis: &Analysis) -> std::fmt::Result {
    writeln!(out, "Top novels data analysis report ({} books)", analysis.rows)?;
    writeln!(out)?;

    writeln!(out, "== Basic statistics")?;
    writeln!(
        out,
        "{:<16} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    )?;
    for s in &analysis.describe {
        writeln!(
            out,
            "{:<16} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            s.column,
            s.count,
            num(s.mean),
            num(s.std),
            num(s.min),
            num(s.p25),
            num(s.p50),
            num(s.p75),
            num(s.max)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "== Title length")?;
    write_titles(out, "Longest 10 titles", &analysis.longest_titles)?;
    write_titles(out, "Shortest 10 titles", &analysis.shortest_titles)?;
    write_histogram(out, "Title length distribution", &analysis.title_length_histogram)?;
    writeln!(out)?;

    writeln!(out, "== Authors")?;
    if let Some(top) = analysis.top_authors.first() {
        writeln!(out, "Most frequent author: {} ({} books)", top.author, top.count)?;
        let widest = analysis.top_authors.iter().map(|a| a.count).max().unwrap_or(1);
        for author in &analysis.top_authors {
            writeln!(
                out,
                "  {:<32} {:>4} {}",
                author.author,
                author.count,
                bar(author.count, widest)
            )?;
        }
    } else {
        writeln!(out, "  (no authors)")?;
    }
    writeln!(out)?;

    writeln!(out, "== Publication year")?;
    match &analysis.publish_year {
        Some(years) => writeln!(
            out,
            "Mean {:.0}  Median {:.0}  Range {} - {}",
            years.mean, years.median, years.min as i64, years.max as i64
        )?,
        None => writeln!(out, "  (no years)")?,
    }
    write_histogram(out, "Publication year distribution", &analysis.publish_year_histogram)?;
    writeln!(out)?;

    writeln!(out, "== Publication year vs rating")?;
    match analysis.year_rating_correlation {
        Some(r) => writeln!(out, "Correlation coefficient: {r:.2}")?,
        None => writeln!(out, "Correlation coefficient: n/a")?,
    }
    Ok(())
}

fn write_titles(out: &mut String, heading: &str, titles: &[TitleLength]) -> std::fmt::Result {
    writeln!(out, "{heading}:")?;
    for t in titles {
        writeln!(out, "  {:>4}  {}", t.length, t.title)?;
    }
    Ok(())
}

fn write_histogram(out: &mut String, heading: &str, bins: &[HistogramBin]) -> std::fmt::Result {
    writeln!(out, "{heading}:")?;
    let widest = bins.iter().map(|b| b.count).max().unwrap_or(0);
    for b in bins.iter().filter(|b| b.count > 0) {
        writeln!(
            out,
            "  {:>8.1} - {:<8.1} {:>4} {}",
            b.start,
            b.end,
            b.count,
            bar(b.count, widest)
        )?;
    }
    Ok(())
}

fn bar(count: usize, widest: usize) -> String {
    if widest == 0 {
        return String::new();
    }
    "#".repeat((count * BAR_WIDTH).div_ceil(widest))
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| format!("{v:.2}"))
}
