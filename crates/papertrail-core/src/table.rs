//! In-memory CSV table addressed by column name

use std::io;
use std::path::Path;

use crate::sink::CsvSink;

/// Header row plus data rows, every row padded to the header width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a CSV file with a header row.
    ///
    /// Short rows are padded with empty cells; extra cells are dropped.
    pub fn read(path: &Path) -> io::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Self::new(headers);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }

    /// Write the table through an atomic [`CsvSink`]
    pub fn write(&self, path: &Path) -> io::Result<usize> {
        let mut sink = CsvSink::create(path, &self.headers)?;
        for row in &self.rows {
            sink.write_row(row)?;
        }
        sink.finalize()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by exact header name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of `name`, appending an empty column if it does not exist
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Remove a column; returns whether it existed
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column(name) else {
            return false;
        };
        self.headers.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Append a row, fitting it to the header width
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        self.cell(row, self.column(column)?)
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.into();
        }
    }

    /// Project a row onto another header list by name; unknown names map to ""
    pub fn project(&self, row: usize, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|h| self.get(row, h).unwrap_or_default().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn read_pads_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n4\n").unwrap();

        let table = Table::read(&path).unwrap();
        assert_eq!(table.headers(), headers(&["a", "b", "c"]).as_slice());
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "a"), Some("4"));
        assert_eq!(table.get(1, "c"), Some(""));
        assert_eq!(table.get(0, "missing"), None);
    }

    #[test]
    fn ensure_and_drop_column() {
        let mut table = Table::new(headers(&["URL", "Date"]));
        table.push_row(vec!["u1".into(), "2024-01-01".into()]);

        assert_eq!(table.ensure_column("URL"), 0);
        let idx = table.ensure_column("Institution");
        assert_eq!(idx, 2);
        assert_eq!(table.cell(0, idx), Some(""));

        assert!(table.drop_column("Date"));
        assert!(!table.drop_column("Date"));
        assert_eq!(table.headers(), headers(&["URL", "Institution"]).as_slice());
        assert_eq!(table.rows()[0], vec!["u1".to_string(), String::new()]);
    }

    #[test]
    fn write_then_read_preserves_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut table = Table::new(headers(&["Title", "Abstract"]));
        table.push_row(vec!["A, B".into(), "line one\nline two".into()]);
        table.set(0, 1, "replaced \"quoted\"");

        assert_eq!(table.write(&path).unwrap(), 1);
        assert_eq!(Table::read(&path).unwrap(), table);
    }

    #[test]
    fn project_by_name() {
        let mut table = Table::new(headers(&["b", "a"]));
        table.push_row(vec!["B".into(), "A".into()]);
        assert_eq!(
            table.project(0, &headers(&["a", "z", "b"])),
            vec!["A".to_string(), String::new(), "B".to_string()]
        );
    }
}
