use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use tracing::debug;

use super::{Cell, ColumnKind, Table, TableSink};
use crate::error::{EtlError, Result};

/// SQLite-backed sink. Each batch is written in a single transaction.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn row_count(&self, name: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(name));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert_rows(&self, name: &str, batch: &Table) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let columns = batch
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=batch.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(name),
            columns,
            placeholders
        );

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in &batch.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        debug!("Inserted {} rows into {}", batch.len(), name);
        Ok(())
    }
}

impl TableSink for SqliteSink {
    fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn column_names(&self, name: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
            .query_map(params![name], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn truncate(&self, name: &str) -> Result<()> {
        if !self.table_exists(name)? {
            return Err(EtlError::MissingTable(name.to_string()));
        }
        self.conn
            .execute(&format!("DELETE FROM {}", quote_ident(name)), [])?;
        Ok(())
    }

    fn append(&self, name: &str, batch: &Table) -> Result<()> {
        let existing = self.column_names(name)?;
        if existing.is_empty() {
            return Err(EtlError::MissingTable(name.to_string()));
        }
        if existing != batch.column_names() {
            return Err(EtlError::SchemaMismatch {
                table: name.to_string(),
                expected: existing,
                found: batch.column_names(),
            });
        }
        self.insert_rows(name, batch)
    }

    fn create(&self, name: &str, batch: &Table) -> Result<()> {
        let definitions = batch
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(c.kind)))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute(
            &format!("CREATE TABLE {} ({})", quote_ident(name), definitions),
            [],
        )?;
        self.insert_rows(name, batch)
    }
}

fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Integer => "INTEGER",
        ColumnKind::Real => "REAL",
        ColumnKind::Text | ColumnKind::Date | ColumnKind::Timestamp => "TEXT",
    }
}

// Histogram columns contain dots (`rating_3.5`), so every identifier is quoted.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(SqlValue::Null),
            Cell::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Cell::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Cell::Text(s) => ToSqlOutput::from(s.as_str()),
            Cell::Date(d) => ToSqlOutput::Owned(SqlValue::Text(d.format("%Y-%m-%d").to_string())),
            Cell::Timestamp(t) => ToSqlOutput::Owned(SqlValue::Text(t.to_rfc3339())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load_table, Column};
    use chrono::NaiveDate;

    fn table(ids: &[i64]) -> Table {
        Table::with_rows(
            vec![
                Column::new("kaggle_id", ColumnKind::Integer),
                Column::new("release_date", ColumnKind::Date),
                Column::new("rating_3.5", ColumnKind::Integer),
            ],
            ids.iter()
                .map(|id| {
                    vec![
                        Cell::Int(*id),
                        Cell::Date(NaiveDate::from_ymd_opt(2001, 2, 3).unwrap()),
                        Cell::Int(2),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_create_and_reload() {
        let sink = SqliteSink::open_in_memory().unwrap();
        assert!(!sink.table_exists("movies").unwrap());

        load_table(&sink, "movies", &table(&[1, 2])).unwrap();
        assert!(sink.table_exists("movies").unwrap());
        assert_eq!(sink.row_count("movies").unwrap(), 2);
        assert_eq!(
            sink.column_names("movies").unwrap(),
            vec!["kaggle_id", "release_date", "rating_3.5"]
        );

        load_table(&sink, "movies", &table(&[7])).unwrap();
        assert_eq!(sink.row_count("movies").unwrap(), 1);
    }

    #[test]
    fn test_dates_are_stored_as_iso_text() {
        let sink = SqliteSink::open_in_memory().unwrap();
        sink.create("movies", &table(&[1])).unwrap();
        let stored: String = sink
            .conn
            .query_row("SELECT release_date FROM movies", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, "2001-02-03");
    }

    #[test]
    fn test_append_rejects_different_columns() {
        let sink = SqliteSink::open_in_memory().unwrap();
        sink.create("movies", &table(&[1])).unwrap();
        let other = Table::with_rows(
            vec![Column::new("other", ColumnKind::Text)],
            vec![vec![Cell::Null]],
        );
        assert!(matches!(
            sink.append("movies", &other),
            Err(EtlError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_truncate_missing_table() {
        let sink = SqliteSink::open_in_memory().unwrap();
        assert!(matches!(sink.truncate("ratings"), Err(EtlError::MissingTable(_))));
    }
}
