//! Row cursors
//!
//! The assembler consumes rows through [`RowCursor`], the seam to whatever
//! database driver fetched them. Every cell arrives as nullable text.
//! [`MemoryCursor`] serves rows from memory for tests, benches and the CLI.

use std::collections::VecDeque;
use std::io::Read;

use crate::frame::{ColumnDescriptor, ScanError};

/// One result row; `None` is SQL NULL
pub type Row = Vec<Option<String>>;

/// Forward-only cursor over a query result
pub trait RowCursor {
    /// Column metadata, fixed when the cursor is opened
    fn columns(&self) -> &[ColumnDescriptor];

    /// Fetch the next row, `Ok(None)` once exhausted
    fn next_row(&mut self) -> Result<Option<Row>, ScanError>;
}

/// Cell `index` of `row` as text, `None` for NULL or a short row
pub(crate) fn cell(row: &Row, index: usize) -> Option<&str> {
    row.get(index).and_then(|c| c.as_deref())
}

/// In-memory cursor
#[derive(Debug, Clone)]
pub struct MemoryCursor {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Row>,
    /// Fail with this message once `served` reaches the count
    failure: Option<(usize, String)>,
    served: usize,
}

impl MemoryCursor {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            rows: VecDeque::new(),
            failure: None,
            served: 0,
        }
    }

    /// Builder: append a row
    pub fn row(mut self, row: Row) -> Self {
        self.rows.push_back(row);
        self
    }

    /// Builder: append a row of non-null text cells
    pub fn text_row(self, cells: &[&str]) -> Self {
        self.row(cells.iter().map(|c| Some(c.to_string())).collect())
    }

    /// Builder: append many rows
    pub fn rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Builder: fail after `rows` rows have been served
    pub fn fail_after(mut self, rows: usize, message: impl Into<String>) -> Self {
        self.failure = Some((rows, message.into()));
        self
    }

    /// Rows not yet fetched
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Load a cursor from CSV.
    ///
    /// Header cells are `NAME:TYPE` (a cell without `:` has an empty declared
    /// type). Empty cells are NULL.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, ScanError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| ScanError::new(format!("CSV header: {}", e)))?;
        let columns = headers.iter().map(parse_header_cell).collect();

        let mut cursor = Self::new(columns);
        for (line, record) in reader.records().enumerate() {
            let record =
                record.map_err(|e| ScanError::new(format!("CSV record {}: {}", line + 1, e)))?;
            let row = record
                .iter()
                .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                .collect();
            cursor.rows.push_back(row);
        }

        Ok(cursor)
    }
}

fn parse_header_cell(cell: &str) -> ColumnDescriptor {
    match cell.split_once(':') {
        Some((name, declared_type)) => ColumnDescriptor::new(name.trim(), declared_type.trim()),
        None => ColumnDescriptor::new(cell.trim(), ""),
    }
}

impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>, ScanError> {
        if let Some((after, message)) = &self.failure {
            if self.served >= *after {
                return Err(ScanError::new(message.clone()));
            }
        }

        let row = self.rows.pop_front();
        if row.is_some() {
            self.served += 1;
        }
        Ok(row)
    }
}
