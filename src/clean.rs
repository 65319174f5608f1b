use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::CleanArgs;
use crate::formats::RawRecord;
use crate::table::{Cell, Column, Table};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CleanError {
    #[error("column {column:?} row {row}: cannot coerce {value} to integer")]
    NotInteger {
        column: &'static str,
        row: usize,
        value: String,
    },
}

pub fn run(args: CleanArgs) -> anyhow::Result<()> {
    let raw_path = PathBuf::from(&args.raw);
    let out_path = PathBuf::from(&args.out);

    let records: Vec<RawRecord> =
        crate::formats::read_jsonl(&raw_path).context("read raw snapshot")?;
    let table = clean(&records)?;
    tracing::info!(raw = records.len(), clean = table.len(), "cleaned");

    crate::formats::write_jsonl(&out_path, &table.to_json_rows()).context("write clean table")?;
    Ok(())
}

pub fn clean(records: &[RawRecord]) -> Result<Table, CleanError> {
    clean_table(Table::from_records(records))
}

/// Deduplicate, drop incomplete rows and columns, then coerce the edition
/// count to integers. Each step sees the output of the previous one.
pub fn clean_table(table: Table) -> Result<Table, CleanError> {
    let table = drop_duplicate_rows(table);
    let table = drop_null_rows(table);
    let table = drop_null_columns(table);
    coerce_integer_column(table, Column::Editions)
}

fn drop_duplicate_rows(table: Table) -> Table {
    let mut seen: HashSet<Vec<Cell>> = HashSet::new();
    table.retain_rows(|row| seen.insert(row.to_vec()))
}

fn drop_null_rows(table: Table) -> Table {
    table.retain_rows(|row| !row.iter().any(Cell::is_null))
}

fn drop_null_columns(mut table: Table) -> Table {
    let mut idx = table.columns().len();
    while idx > 0 {
        idx -= 1;
        let rows = table.rows();
        if !rows.is_empty() && rows.iter().all(|row| row[idx].is_null()) {
            tracing::debug!(column = table.columns()[idx].name(), "dropping all-null column");
            table = table.drop_column(idx);
        }
    }
    table
}

fn coerce_integer_column(table: Table, column: Column) -> Result<Table, CleanError> {
    let Some(idx) = table.column_index(column) else {
        return Ok(table);
    };

    table.map_column(idx, |row, cell| {
        let not_integer = || CleanError::NotInteger {
            column: column.name(),
            row,
            value: format!("{cell:?}"),
        };
        match cell {
            Cell::Int(v) => Ok(Cell::Int(*v)),
            Cell::Float(v) if v.is_finite() && v.fract() == 0.0 => Ok(Cell::Int(*v as i64)),
            Cell::Text(v) => v.trim().parse().map(Cell::Int).map_err(|_| not_integer()),
            Cell::Float(_) | Cell::Null => Err(not_integer()),
        }
    })
}
