//! The observation table.
//!
//! A `Frame` is a column-ordered table of typed cells. It is deliberately
//! small: the pipeline works on one in-memory table of a few thousand
//! rows, so the operations are the handful the cleaning stage and the
//! analysis engines actually need — typed column access, row filtering,
//! column append/replace, and a CSV round-trip.
//!
//! Missing-value convention: an empty cell (or one of the usual NA
//! spellings) parses to `Value::Null` and writes back as an empty cell.
//! Integral floats are written without a fractional part so that a
//! written frame re-reads identically.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

/// One cell of the observation table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    Null,
}

impl Value {
    /// Numeric view of the cell. String and missing cells are `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// String view of the cell. Numeric and missing cells are `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Column-ordered table of per-student rows.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    names: Vec<String>,
    index: HashMap<String, usize>,
    columns: Vec<Vec<Value>>,
}

impl Frame {
    /// Build a frame from (name, column) pairs. All columns must share
    /// one length.
    pub fn from_columns(cols: Vec<(String, Vec<Value>)>) -> Result<Frame> {
        let mut frame = Frame::default();
        let expected = cols.first().map(|(_, c)| c.len()).unwrap_or(0);
        for (name, column) in cols {
            if column.len() != expected {
                return Err(Error::LengthMismatch {
                    column: name,
                    expected,
                    actual: column.len(),
                });
            }
            frame.push_column(name, column);
        }
        Ok(frame)
    }

    fn push_column(&mut self, name: String, column: Vec<Value>) {
        if let Some(&idx) = self.index.get(&name) {
            self.columns[idx] = column;
        } else {
            self.index.insert(name.clone(), self.columns.len());
            self.names.push(name);
            self.columns.push(column);
        }
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Column names in frame order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Borrow a column. A missing column is a schema violation.
    pub fn column(&self, name: &str) -> Result<&[Value]> {
        self.index
            .get(name)
            .map(|&idx| self.columns[idx].as_slice())
            .ok_or_else(|| Error::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Per-row numeric view of a column (string cells become missing).
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.column(name)?.iter().map(Value::as_f64).collect())
    }

    /// Non-missing numeric values of a column, order preserved.
    pub fn numeric_dropna(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.column(name)?.iter().filter_map(Value::as_f64).collect())
    }

    /// Append or replace a column. Length must match the frame.
    pub fn with_column(&mut self, name: &str, column: Vec<Value>) -> Result<()> {
        if self.ncols() > 0 && column.len() != self.nrows() {
            return Err(Error::LengthMismatch {
                column: name.to_string(),
                expected: self.nrows(),
                actual: column.len(),
            });
        }
        self.push_column(name.to_string(), column);
        Ok(())
    }

    /// Keep only rows where `keep` is true. `keep` must cover every row.
    pub fn retain(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.nrows());
        for column in &mut self.columns {
            let mut it = keep.iter();
            column.retain(|_| *it.next().unwrap_or(&false));
        }
    }

    /// Read a frame from a CSV file with a header row.
    pub fn read_csv(path: &Path) -> Result<Frame> {
        let file = std::fs::File::open(path)?;
        Frame::from_csv_reader(file)
    }

    /// Read a frame from any CSV source with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Frame> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (idx, cell) in record.iter().enumerate() {
                if idx < columns.len() {
                    columns[idx].push(parse_cell(cell));
                }
            }
            // Short records pad with missing cells
            for column in columns.iter_mut().skip(record.len()) {
                column.push(Value::Null);
            }
        }
        Frame::from_columns(headers.into_iter().zip(columns).collect())
    }

    /// Write the frame as CSV with a header row.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.to_csv_writer(file)
    }

    /// Write the frame as CSV to any sink.
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);
        wtr.write_record(&self.names)?;
        for row in 0..self.nrows() {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|col| format_cell(&col[row]))
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Parse one CSV cell into a typed value.
fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() || matches!(cell, "NA" | "N/A" | "NaN" | "nan" | "null") {
        return Value::Null;
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_nan() => Value::Null,
        Ok(v) => Value::Num(v),
        Err(_) => Value::Str(cell.to_string()),
    }
}

/// Render one cell for CSV output.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Str(s) => s.clone(),
        Value::Num(v) => format_num(*v),
    }
}

/// Render a float, dropping the fractional part when it is integral so
/// the CSV round-trips byte-identically.
pub fn format_num(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::from_csv_reader(
            "Course,Age,CGPA\nEngineering,20,3.5\nLaw,22,\nMedical,21,2.9\n".as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn parses_typed_cells() {
        let frame = sample();
        assert_eq!(frame.nrows(), 3);
        assert_eq!(frame.ncols(), 3);
        let course = frame.column("Course").unwrap();
        assert_eq!(course[0].as_str(), Some("Engineering"));
        let age = frame.numeric("Age").unwrap();
        assert_eq!(age[1], Some(22.0));
        let cgpa = frame.column("CGPA").unwrap();
        assert!(cgpa[1].is_null());
    }

    #[test]
    fn missing_column_is_schema_violation() {
        let frame = sample();
        let err = frame.column("Stress_Level").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }

    #[test]
    fn retain_filters_every_column() {
        let mut frame = sample();
        frame.retain(&[true, false, true]);
        assert_eq!(frame.nrows(), 2);
        let course = frame.column("Course").unwrap();
        assert_eq!(course[1].as_str(), Some("Medical"));
    }

    #[test]
    fn with_column_replaces_in_place() {
        let mut frame = sample();
        frame
            .with_column("Age", vec![Value::Num(1.0), Value::Num(2.0), Value::Num(3.0)])
            .unwrap();
        assert_eq!(frame.ncols(), 3);
        assert_eq!(frame.numeric("Age").unwrap()[2], Some(3.0));
    }

    #[test]
    fn with_column_length_mismatch_errors() {
        let mut frame = sample();
        let err = frame.with_column("Extra", vec![Value::Num(1.0)]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
    }

    #[test]
    fn csv_round_trip_is_identical() {
        let frame = sample();
        let mut buf = Vec::new();
        frame.to_csv_writer(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Course,Age,CGPA\nEngineering,20,3.5\nLaw,22,\nMedical,21,2.9\n"
        );
        let reread = Frame::from_csv_reader(text.as_bytes()).unwrap();
        assert_eq!(reread.nrows(), 3);
        assert_eq!(reread.numeric("CGPA").unwrap()[0], Some(3.5));
    }

    #[test]
    fn numeric_dropna_skips_missing() {
        let frame = sample();
        assert_eq!(frame.numeric_dropna("CGPA").unwrap(), vec![3.5, 2.9]);
    }
}
