use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{Table, TableSink};
use crate::error::{EtlError, Result};

/// In-memory sink for development/testing
#[derive(Clone, Default)]
pub struct InMemorySink {
    tables: Arc<Mutex<HashMap<String, Table>>>,
    created: Arc<Mutex<HashMap<String, usize>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current contents of `name`.
    pub fn snapshot(&self, name: &str) -> Option<Table> {
        self.tables.lock().unwrap().get(name).cloned()
    }

    /// How many times `name` was created (should stay at 1 across reloads).
    pub fn created_count(&self, name: &str) -> usize {
        self.created.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

impl std::fmt::Debug for InMemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.lock().unwrap();
        f.debug_struct("InMemorySink")
            .field("tables", &tables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TableSink for InMemorySink {
    fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tables.lock().unwrap().contains_key(name))
    }

    fn column_names(&self, name: &str) -> Result<Vec<String>> {
        self.tables
            .lock()
            .unwrap()
            .get(name)
            .map(Table::column_names)
            .ok_or_else(|| EtlError::MissingTable(name.to_string()))
    }

    fn truncate(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| EtlError::MissingTable(name.to_string()))?;
        table.rows.clear();
        debug!("Truncated table {}", name);
        Ok(())
    }

    fn append(&self, name: &str, batch: &Table) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| EtlError::MissingTable(name.to_string()))?;
        if table.column_names() != batch.column_names() {
            return Err(EtlError::SchemaMismatch {
                table: name.to_string(),
                expected: table.column_names(),
                found: batch.column_names(),
            });
        }
        table.rows.extend(batch.rows.iter().cloned());
        debug!("Appended {} rows to {}", batch.len(), name);
        Ok(())
    }

    fn create(&self, name: &str, batch: &Table) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .insert(name.to_string(), batch.clone());
        *self
            .created
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += 1;
        debug!("Created table {} with {} rows", name, batch.len());
        Ok(())
    }
}
