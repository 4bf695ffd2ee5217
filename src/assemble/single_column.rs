//! Single-column extraction for label and tag listings

use crate::frame::{Field, Frame, FrameResult};

use super::cursor::{cell, RowCursor};
use super::ScanStats;

const FRAME_NAME: &str = "response";

/// Collect the first column of every row into a one-field frame.
///
/// NULL cells become empty strings; row order is kept.
pub fn extract(cursor: &mut dyn RowCursor, stats: &mut ScanStats) -> FrameResult<Vec<Frame>> {
    stats.mark_columns_ready();

    let Some(column) = cursor.columns().first().map(|c| c.name.clone()) else {
        tracing::warn!("listing query returned no columns");
        return Ok(vec![Frame::new(FRAME_NAME)]);
    };

    let mut values = Vec::new();
    while let Some(row) = cursor.next_row()? {
        values.push(cell(&row, 0).unwrap_or_default().to_string());
    }

    stats.rows_processed = values.len();
    Ok(vec![Frame::new(FRAME_NAME).field(Field::text(column, values))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::MemoryCursor;
    use crate::frame::{ColumnDescriptor, FieldValues, FrameError};

    #[test]
    fn test_extract_values_in_order() {
        let mut cursor = MemoryCursor::new(vec![
            ColumnDescriptor::new("metric_name", "VARCHAR2"),
            ColumnDescriptor::new("ignored", "VARCHAR2"),
        ])
        .text_row(&["cpu", "x"])
        .text_row(&["memory", "y"])
        .row(vec![None, None])
        .text_row(&["disk", "z"]);

        let mut stats = ScanStats::default();
        let frames = extract(&mut cursor, &mut stats).unwrap();

        assert_eq!(stats.rows_processed, 4);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].fields.len(), 1);
        assert_eq!(frames[0].fields[0].name, "metric_name");
        assert_eq!(
            frames[0].fields[0].values,
            FieldValues::Text(vec!["cpu".into(), "memory".into(), String::new(), "disk".into()])
        );
    }

    #[test]
    fn test_extract_scan_error() {
        let mut cursor = MemoryCursor::new(vec![ColumnDescriptor::new("TAG", "VARCHAR2")])
            .text_row(&["a"])
            .fail_after(0, "fetch failed");

        let mut stats = ScanStats::default();
        let err = extract(&mut cursor, &mut stats).unwrap_err();
        assert!(matches!(err, FrameError::Scan(_)));
        assert_eq!(stats.rows_processed, 0);
    }
}
