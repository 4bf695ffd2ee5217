//! Row-to-frame assembly
//!
//! Turns a fetched result into frames. The mode is picked from the request
//! flags and, for time-series requests, from the result's columns:
//!
//! ```text
//! promql                      → range_vector  (JSON document in one cell)
//! !convert                    → tabular       (one frame, one field per column)
//! convert + canonical columns → canonical     (group by name + tags JSON)
//! convert otherwise           → derived       (group by label columns)
//! ```
//!
//! Listing queries bypass the dispatcher and use [`single_column::extract`].
//!
//! Assembly either consumes every row and returns complete frames, or returns
//! an error and no frames.

pub mod canonical;
pub mod cursor;
pub mod derived;
pub mod range_vector;
mod series;
pub mod single_column;
pub mod tabular;

use std::time::Instant;

use crate::frame::{Frame, FrameResult};

pub use canonical::CanonicalColumns;
pub use cursor::{MemoryCursor, Row, RowCursor};
pub use derived::DerivedLayout;
pub use range_vector::{decode_payload, RangeVectorResponse};

/// Scan accounting reported back to the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanStats {
    /// Rows (or range-vector points) consumed by a successful assembly
    pub rows_processed: usize,
    /// When result columns became available; marks the end of query execution
    pub columns_ready_at: Option<Instant>,
}

impl ScanStats {
    pub(crate) fn mark_columns_ready(&mut self) {
        self.columns_ready_at = Some(Instant::now());
    }
}

/// Request-level inputs to assembly
#[derive(Debug, Clone, Default)]
pub struct AssemblyOptions {
    /// Result is a range-vector JSON document
    pub promql: bool,
    /// Group rows into time series instead of passing the table through
    pub convert_to_time_series: bool,
    /// Series-name template; empty for none
    pub legend: String,
    /// Executed query text, used as the frame name where frames are not per-series
    pub query_text: String,
}

impl AssemblyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: result is a range-vector document
    pub fn promql(mut self, promql: bool) -> Self {
        self.promql = promql;
        self
    }

    /// Builder: group rows into time series
    pub fn convert_to_time_series(mut self, convert: bool) -> Self {
        self.convert_to_time_series = convert;
        self
    }

    /// Builder: set the legend template
    pub fn legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = legend.into();
        self
    }

    /// Builder: set the executed query text
    pub fn query_text(mut self, text: impl Into<String>) -> Self {
        self.query_text = text.into();
        self
    }
}

/// Assembly mode chosen for a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    Tabular,
    Canonical(CanonicalColumns),
    Derived,
    RangeVector,
}

impl AssemblyMode {
    /// Choose the mode for `options` and the cursor's columns
    pub fn select(options: &AssemblyOptions, cursor: &dyn RowCursor) -> Self {
        if options.promql {
            AssemblyMode::RangeVector
        } else if !options.convert_to_time_series {
            AssemblyMode::Tabular
        } else if let Some(layout) = CanonicalColumns::locate(cursor.columns()) {
            AssemblyMode::Canonical(layout)
        } else {
            AssemblyMode::Derived
        }
    }
}

/// Assemble frames from `cursor`, filling `stats` along the way
pub fn assemble_frames(
    cursor: &mut dyn RowCursor,
    options: &AssemblyOptions,
    stats: &mut ScanStats,
) -> FrameResult<Vec<Frame>> {
    let mode = AssemblyMode::select(options, cursor);
    tracing::debug!(?mode, columns = cursor.columns().len(), "assembling frames");

    match mode {
        AssemblyMode::RangeVector => range_vector::decode_cursor(cursor, &options.legend, stats),
        AssemblyMode::Tabular => tabular::assemble(cursor, &options.legend, &options.query_text, stats),
        AssemblyMode::Canonical(layout) => {
            canonical::assemble(cursor, layout, &options.legend, &options.query_text, stats)
        }
        AssemblyMode::Derived => derived::assemble(cursor, &options.legend, stats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColumnDescriptor, FrameError};

    fn canonical_cursor() -> MemoryCursor {
        MemoryCursor::new(vec![
            ColumnDescriptor::new("METRIC_TIME_EPOCH", "NUMBER"),
            ColumnDescriptor::new("METRIC_VALUE", "NUMBER"),
            ColumnDescriptor::new("METRIC_NAME", "VARCHAR2"),
            ColumnDescriptor::new("METRIC_TAGS", "VARCHAR2"),
        ])
        .text_row(&["1700000010", "0.5", "cpu_usage", r#"{"node":"node-a"}"#])
        .text_row(&["1704153600", "1.5", "cpu_usage", r#"{"node":"node-a"}"#])
        .text_row(&["1700000010", "7", "mem", r#"{"node":"node-b"}"#])
    }

    #[test]
    fn test_mode_selection() {
        let cursor = canonical_cursor();
        let ts = AssemblyOptions::new().convert_to_time_series(true);

        assert!(matches!(AssemblyMode::select(&ts, &cursor), AssemblyMode::Canonical(_)));
        assert_eq!(AssemblyMode::select(&AssemblyOptions::new(), &cursor), AssemblyMode::Tabular);
        assert_eq!(
            AssemblyMode::select(&ts.clone().promql(true), &cursor),
            AssemblyMode::RangeVector
        );

        let plain = MemoryCursor::new(vec![ColumnDescriptor::new("HOST", "VARCHAR2")]);
        assert_eq!(AssemblyMode::select(&ts, &plain), AssemblyMode::Derived);
    }

    #[test]
    fn test_canonical_dispatch_names_frames_after_query() {
        let options = AssemblyOptions::new()
            .convert_to_time_series(true)
            .legend("{{node}}")
            .query_text("select 1 from dual");
        let mut stats = ScanStats::default();
        let frames = assemble_frames(&mut canonical_cursor(), &options, &mut stats).unwrap();

        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.name == "select 1 from dual"));
        assert_eq!(frames[1].fields[1].name, "node-b");
        assert_eq!(stats.rows_processed, 3);
    }

    #[test]
    fn test_replayed_rows_give_identical_frames() {
        let options = AssemblyOptions::new().convert_to_time_series(true);

        let mut first_stats = ScanStats::default();
        let first = assemble_frames(&mut canonical_cursor(), &options, &mut first_stats).unwrap();
        let mut second_stats = ScanStats::default();
        let second = assemble_frames(&mut canonical_cursor(), &options, &mut second_stats).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first_stats.rows_processed, second_stats.rows_processed);
    }

    #[test]
    fn test_ambiguous_schema_returns_no_frames() {
        let mut cursor = MemoryCursor::new(vec![
            ColumnDescriptor::new("METRIC_TIME", "TIMESTAMP"),
            ColumnDescriptor::new("VALUE", "NUMBER"),
        ])
        .text_row(&["2024-01-01T00:00:00Z", "1.0"]);

        let options = AssemblyOptions::new().convert_to_time_series(true);
        let mut stats = ScanStats::default();
        let result = assemble_frames(&mut cursor, &options, &mut stats);

        assert!(matches!(result, Err(FrameError::AmbiguousSchema)));
        assert_eq!(stats.rows_processed, 0);
    }
}
