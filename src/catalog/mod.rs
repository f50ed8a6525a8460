use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{MarlError, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::TupleDesc;

struct TableEntry {
    file: Arc<HeapFile>,
    name: String,
}

/// Directory of the tables known to the engine: table id to heap file and
/// name. Built by the embedding application and injected wherever tables are
/// resolved; there is no persistence, the heap files themselves are the only
/// durable state.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableId, TableEntry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under its file's id. A table re-added under the
    /// same id (same file path) replaces the previous entry.
    pub fn add_table(&self, file: Arc<HeapFile>, name: impl Into<String>) -> TableId {
        let id = file.id();
        self.tables.write().insert(
            id,
            TableEntry {
                file,
                name: name.into(),
            },
        );
        id
    }

    /// Returns the heap file backing `table_id`.
    pub fn file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.tables
            .read()
            .get(&table_id)
            .map(|entry| entry.file.clone())
            .ok_or(MarlError::NoSuchTable(table_id))
    }

    /// Returns the schema of `table_id`.
    pub fn tuple_desc(&self, table_id: TableId) -> Result<Arc<TupleDesc>> {
        Ok(self.file(table_id)?.tuple_desc().clone())
    }

    /// Returns the name `table_id` was registered under.
    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.tables
            .read()
            .get(&table_id)
            .map(|entry| entry.name.clone())
            .ok_or(MarlError::NoSuchTable(table_id))
    }

    /// Returns the ids of every registered table.
    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().keys().copied().collect()
    }
}
