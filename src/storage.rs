//! Table persistence: a minimal sink interface plus the truncate-and-reload
//! loading policy used for every output table.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemorySink;
pub use sqlite::SqliteSink;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::error::{EtlError, Result};

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Date,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Cell::Null, Cell::Text)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Null, Cell::Float)
    }
}

impl From<Option<NaiveDate>> for Cell {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(Cell::Null, Cell::Date)
    }
}

impl From<Option<DateTime<Utc>>> for Cell {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Cell::Null, Cell::Timestamp)
    }
}

/// A batch of rows sharing one column layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Where output tables end up. Loading never drops a table definition.
pub trait TableSink {
    fn table_exists(&self, name: &str) -> Result<bool>;

    /// Column names of an existing table, in declaration order.
    fn column_names(&self, name: &str) -> Result<Vec<String>>;

    /// Removes every row, keeping the table.
    fn truncate(&self, name: &str) -> Result<()>;

    fn append(&self, name: &str, batch: &Table) -> Result<()>;

    /// Creates `name` with the batch's columns and inserts its rows.
    fn create(&self, name: &str, batch: &Table) -> Result<()>;
}

/// Truncates and refills `name` if it exists, creates it otherwise. An existing
/// table with a different column layout is left untouched and reported as
/// `SchemaMismatch`.
#[instrument(skip(sink, table), fields(rows = table.len()))]
pub fn load_table(sink: &dyn TableSink, name: &str, table: &Table) -> Result<()> {
    if sink.table_exists(name)? {
        let existing = sink.column_names(name)?;
        if existing != table.column_names() {
            return Err(EtlError::SchemaMismatch {
                table: name.to_string(),
                expected: existing,
                found: table.column_names(),
            });
        }
        info!("'{}' table exists, truncating before import", name);
        sink.truncate(name)?;
        sink.append(name, table)?;
    } else {
        debug!("'{}' table does not exist, creating it", name);
        sink.create(name, table)?;
    }
    counter!("movie_etl_rows_loaded_total", "table" => name.to_string()).increment(table.len() as u64);
    info!("Imported {} rows into '{}'", table.len(), name);
    Ok(())
}

/// Loads a large table one chunk at a time. The first chunk goes through
/// `load_table` (truncate or create), every later chunk is appended; each chunk
/// is written before the next is pulled. Returns the total row count.
#[instrument(skip(sink, chunks))]
pub fn load_chunked<I>(sink: &dyn TableSink, name: &str, chunks: I) -> Result<usize>
where
    I: IntoIterator<Item = Result<Table>>,
{
    let started = Instant::now();
    let mut rows_imported = 0usize;
    for (i, chunk) in chunks.into_iter().enumerate() {
        let chunk = chunk?;
        info!(
            "importing rows {} to {}...",
            rows_imported,
            rows_imported + chunk.len()
        );
        if i == 0 {
            load_table(sink, name, &chunk)?;
        } else {
            sink.append(name, &chunk)?;
            counter!("movie_etl_rows_loaded_total", "table" => name.to_string())
                .increment(chunk.len() as u64);
        }
        rows_imported += chunk.len();
        info!(
            "Done. {:.2} total seconds elapsed",
            started.elapsed().as_secs_f64()
        );
    }
    Ok(rows_imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", ColumnKind::Integer),
            Column::new("name", ColumnKind::Text),
        ]
    }

    fn batch(ids: &[i64]) -> Table {
        Table::with_rows(
            columns(),
            ids.iter()
                .map(|id| vec![Cell::Int(*id), Cell::Text(format!("n{id}"))])
                .collect(),
        )
    }

    #[test]
    fn test_load_creates_then_replaces() {
        let sink = InMemorySink::new();

        load_table(&sink, "movies", &batch(&[1, 2, 3])).unwrap();
        assert_eq!(sink.snapshot("movies").unwrap().len(), 3);

        load_table(&sink, "movies", &batch(&[4])).unwrap();
        let table = sink.snapshot("movies").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][0], Cell::Int(4));
        assert_eq!(sink.created_count("movies"), 1);
    }

    #[test]
    fn test_chunked_load_truncates_once() {
        let sink = InMemorySink::new();
        load_table(&sink, "ratings", &batch(&[100, 101])).unwrap();

        let chunks = vec![Ok(batch(&[1, 2])), Ok(batch(&[3, 4])), Ok(batch(&[5]))];
        let total = load_chunked(&sink, "ratings", chunks).unwrap();

        assert_eq!(total, 5);
        let table = sink.snapshot("ratings").unwrap();
        let ids: Vec<Cell> = table.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, (1..=5).map(Cell::Int).collect::<Vec<_>>());
    }

    #[test]
    fn test_chunked_load_stops_on_error() {
        let sink = InMemorySink::new();
        let chunks = vec![
            Ok(batch(&[1])),
            Err(EtlError::Config("bad chunk".to_string())),
            Ok(batch(&[2])),
        ];
        assert!(load_chunked(&sink, "ratings", chunks).is_err());
        assert_eq!(sink.snapshot("ratings").unwrap().len(), 1);
    }

    #[test]
    fn test_reload_with_new_columns_keeps_old_rows() {
        let sink = InMemorySink::new();
        load_table(&sink, "movies", &batch(&[1, 2])).unwrap();

        let mut wider = batch(&[3]);
        wider.columns.push(Column::new("rating_5.0", ColumnKind::Integer));
        wider.rows[0].push(Cell::Int(1));

        assert!(matches!(
            load_table(&sink, "movies", &wider),
            Err(EtlError::SchemaMismatch { .. })
        ));
        assert_eq!(sink.snapshot("movies").unwrap().len(), 2);
    }

    #[test]
    fn test_cell_conversions() {
        assert_eq!(Cell::from(None::<String>), Cell::Null);
        assert_eq!(Cell::from(Some(1.5)), Cell::Float(1.5));
        assert_eq!(
            Cell::from(NaiveDate::from_ymd_opt(2001, 2, 3)),
            Cell::Date(NaiveDate::from_ymd_opt(2001, 2, 3).unwrap())
        );
    }
}
