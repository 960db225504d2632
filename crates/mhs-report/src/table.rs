//! Flat result tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A small flat table: one header row plus string-rendered cells.
///
/// Analysis engines build tables from their result records; NaN-valued
/// fields render as empty cells, matching the clean-snapshot CSV
/// conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Table
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render a statistic for a table cell: NaN becomes an empty cell,
/// everything else uses the shortest round-trip form.
pub fn fmt_stat(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v}")
    }
}

/// Run provenance recorded next to the artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
}

impl RunMetadata {
    pub fn now(tool_version: &str) -> RunMetadata {
        RunMetadata {
            generated_at: Utc::now(),
            tool_version: tool_version.to_string(),
        }
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(["generated_at", "tool_version"]);
        table.push_row([self.generated_at.to_rfc3339(), self.tool_version.clone()]);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_stat_nan_is_empty() {
        assert_eq!(fmt_stat(f64::NAN), "");
        assert_eq!(fmt_stat(1.5), "1.5");
        assert_eq!(fmt_stat(2.0), "2");
    }

    #[test]
    fn push_row_collects_cells() {
        let mut t = Table::new(["a", "b"]);
        t.push_row(["1", "2"]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0], vec!["1", "2"]);
    }

    #[test]
    fn run_metadata_renders_one_row() {
        let meta = RunMetadata::now("0.1.0");
        let table = meta.table();
        assert_eq!(table.columns, vec!["generated_at", "tool_version"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "0.1.0");
    }
}
