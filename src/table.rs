//! Rectangular table of typed cells shared by the cleaner, the analyzer and
//! the SQLite sink.

use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::formats::RawRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Title,
    Author,
    PublishYear,
    Rating,
    WantToRead,
    Editions,
    TitleLength,
    PrimaryAuthor,
}

impl Column {
    pub const RAW: [Column; 6] = [
        Column::Title,
        Column::Author,
        Column::PublishYear,
        Column::Rating,
        Column::WantToRead,
        Column::Editions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Title => "Title",
            Column::Author => "Author",
            Column::PublishYear => "Publish Year",
            Column::Rating => "Rating",
            Column::WantToRead => "want to read",
            Column::Editions => "# of Editions",
            Column::TitleLength => "Title_Length",
            Column::PrimaryAuthor => "Primary Author",
        }
    }

    pub fn sql_type(self) -> &'static str {
        match self {
            Column::Title | Column::Author | Column::PrimaryAuthor => "TEXT",
            Column::Rating => "REAL",
            Column::PublishYear | Column::WantToRead | Column::Editions | Column::TitleLength => {
                "INTEGER"
            }
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self.sql_type(), "INTEGER" | "REAL")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Null | Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Option<i64>> for Cell {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Cell::Null, Cell::Int)
    }
}

// Floats compare by normalized bit pattern so rows can be hashed for
// duplicate detection; NaN equals NaN and -0.0 equals 0.0.
fn float_key(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0.0_f64.to_bits()
    } else {
        v.to_bits()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Int(a), Cell::Int(b)) => a == b,
            (Cell::Float(a), Cell::Float(b)) => float_key(*a) == float_key(*b),
            (Cell::Text(a), Cell::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Null => {}
            Cell::Int(v) => v.hash(state),
            Cell::Float(v) => float_key(*v).hash(state),
            Cell::Text(v) => v.hash(state),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> anyhow::Result<Self> {
        if let Some(idx) = rows.iter().position(|row| row.len() != columns.len()) {
            anyhow::bail!(
                "row {idx} has {} cells, expected {}",
                rows[idx].len(),
                columns.len()
            );
        }
        Ok(Self { columns, rows })
    }

    pub fn from_records(records: &[RawRecord]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                vec![
                    Cell::Text(record.title.clone()),
                    Cell::Text(record.author.clone()),
                    Cell::Int(record.publish_year),
                    Cell::Float(record.rating),
                    Cell::from(record.want_to_read),
                    Cell::from(record.edition_count),
                ]
            })
            .collect();

        Self {
            columns: Column::RAW.to_vec(),
            rows,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: Column) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    pub fn cells(&self, column: Column) -> Option<impl Iterator<Item = &Cell>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Numeric cells of `column` as `f64`, skipping nulls and text.
    pub fn floats(&self, column: Column) -> Vec<f64> {
        self.cells(column)
            .map(|cells| cells.filter_map(Cell::as_f64).collect())
            .unwrap_or_default()
    }

    pub fn texts(&self, column: Column) -> Vec<&str> {
        self.cells(column)
            .map(|cells| cells.filter_map(Cell::as_text).collect())
            .unwrap_or_default()
    }

    /// Keeps rows for which `keep` returns true, preserving order.
    pub fn retain_rows(mut self, mut keep: impl FnMut(&[Cell]) -> bool) -> Self {
        self.rows.retain(|row| keep(row));
        self
    }

    pub fn drop_column(mut self, idx: usize) -> Self {
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        self
    }

    pub fn map_column<E>(
        mut self,
        idx: usize,
        mut f: impl FnMut(usize, &Cell) -> Result<Cell, E>,
    ) -> Result<Self, E> {
        for (row_idx, row) in self.rows.iter_mut().enumerate() {
            row[idx] = f(row_idx, &row[idx])?;
        }
        Ok(self)
    }

    pub fn with_column(mut self, column: Column, cells: Vec<Cell>) -> anyhow::Result<Self> {
        if cells.len() != self.rows.len() {
            anyhow::bail!(
                "column {} has {} cells, table has {} rows",
                column.name(),
                cells.len(),
                self.rows.len()
            );
        }
        if self.column_index(column).is_some() {
            anyhow::bail!("column {} already exists", column.name());
        }
        self.columns.push(column);
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
        Ok(self)
    }

    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| {
                        let value = serde_json::to_value(cell).unwrap_or(Value::Null);
                        (column.name().to_owned(), value)
                    })
                    .collect()
            })
            .collect()
    }
}
