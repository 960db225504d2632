//! Artifact store implementations.

use crate::error::{Result, StoreError};
use crate::table::Table;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Destination for computed result tables and text reports.
///
/// Implementations must be write-once per name within a run; callers
/// never read artifacts back through the store.
pub trait ArtifactStore {
    /// Persist a flat table under `name` (no extension).
    fn write_table(&self, name: &str, table: &Table) -> Result<()>;

    /// Persist a preformatted text report under `name` (no extension).
    fn write_text(&self, name: &str, content: &str) -> Result<()>;
}

/// Filesystem store: CSV tables and text reports under `<root>/tables/`.
pub struct FsStore {
    tables_dir: PathBuf,
}

impl FsStore {
    /// Create the store, ensuring the output directory exists.
    pub fn new(root: &Path) -> Result<FsStore> {
        let tables_dir = root.join("tables");
        std::fs::create_dir_all(&tables_dir)?;
        Ok(FsStore { tables_dir })
    }

    /// Directory the artifacts land in.
    pub fn tables_dir(&self) -> &Path {
        &self.tables_dir
    }

    fn check_shape(name: &str, table: &Table) -> Result<()> {
        for (row_idx, row) in table.rows.iter().enumerate() {
            if row.len() != table.columns.len() {
                return Err(StoreError::RaggedTable {
                    name: name.to_string(),
                    row: row_idx,
                    expected: table.columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(())
    }
}

impl ArtifactStore for FsStore {
    fn write_table(&self, name: &str, table: &Table) -> Result<()> {
        Self::check_shape(name, table)?;
        let path = self.tables_dir.join(format!("{name}.csv"));
        let mut wtr = csv::Writer::from_path(&path)?;
        wtr.write_record(&table.columns)?;
        for row in &table.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        debug!(artifact = name, path = %path.display(), rows = table.rows.len(), "wrote table");
        Ok(())
    }

    fn write_text(&self, name: &str, content: &str) -> Result<()> {
        let path = self.tables_dir.join(format!("{name}.txt"));
        std::fs::write(&path, content)?;
        info!(artifact = name, path = %path.display(), "wrote report");
        Ok(())
    }
}

/// One recorded artifact in a [`MemStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Table(Table),
    Text(String),
}

/// In-memory store for tests: records artifacts instead of writing files.
#[derive(Default)]
pub struct MemStore {
    artifacts: Mutex<BTreeMap<String, Artifact>>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }

    /// Names of every artifact written so far, sorted.
    pub fn names(&self) -> Vec<String> {
        self.artifacts.lock().unwrap().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.lock().unwrap().contains_key(name)
    }

    pub fn table(&self, name: &str) -> Option<Table> {
        match self.artifacts.lock().unwrap().get(name) {
            Some(Artifact::Table(t)) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.artifacts.lock().unwrap().get(name) {
            Some(Artifact::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

impl ArtifactStore for MemStore {
    fn write_table(&self, name: &str, table: &Table) -> Result<()> {
        FsStore::check_shape(name, table)?;
        self.artifacts
            .lock()
            .unwrap()
            .insert(name.to_string(), Artifact::Table(table.clone()));
        Ok(())
    }

    fn write_text(&self, name: &str, content: &str) -> Result<()> {
        self.artifacts
            .lock()
            .unwrap()
            .insert(name.to_string(), Artifact::Text(content.to_string()));
        Ok(())
    }
}
