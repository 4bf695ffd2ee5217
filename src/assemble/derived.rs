//! Derived series grouping
//!
//! When a time-series result lacks the canonical columns, series are derived
//! from column kinds: character columns form the series label, the time
//! column the axis, and numeric columns the values.

use crate::frame::{
    ColumnDescriptor, Field, Frame, FrameError, FrameResult, KindCounts, SemanticKind,
    TimeValuePoint,
};

use super::cursor::{cell, RowCursor};
use super::series::{read_number, read_time, SeriesGroups};
use super::ScanStats;

const FRAME_NAME: &str = "response";

/// How rows map onto series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedLayout {
    /// One numeric column; series keyed by the label concatenation
    SingleMetric,
    /// Several numeric columns; series keyed by label concatenation plus
    /// numeric column name
    MultiMetric,
}

impl DerivedLayout {
    /// Pick a layout from column kind counts.
    ///
    /// Anything other than exactly one time column, at least one numeric
    /// column and at least one character column is ambiguous.
    pub fn select(counts: KindCounts) -> FrameResult<Self> {
        match counts {
            KindCounts { time: 1, number: 1, text, .. } if text >= 1 => Ok(DerivedLayout::SingleMetric),
            KindCounts { time: 1, number, text, .. } if number >= 1 && text >= 1 => {
                Ok(DerivedLayout::MultiMetric)
            }
            _ => Err(FrameError::AmbiguousSchema),
        }
    }
}

/// Group rows into per-series frames using the derived layout
pub fn assemble(cursor: &mut dyn RowCursor, legend: &str, stats: &mut ScanStats) -> FrameResult<Vec<Frame>> {
    let columns = cursor.columns().to_vec();
    let counts = KindCounts::of(&columns);
    tracing::debug!(
        time = counts.time,
        number = counts.number,
        text = counts.text,
        other = counts.other,
        "column kinds counted"
    );

    let layout = DerivedLayout::select(counts)?;
    stats.mark_columns_ready();

    let kinds: Vec<SemanticKind> = columns.iter().map(ColumnDescriptor::kind).collect();
    let mut groups = SeriesGroups::new();
    let mut rows = 0;

    while let Some(row) = cursor.next_row()? {
        let mut label = String::new();
        let mut time_raw = None;
        for (i, kind) in kinds.iter().enumerate() {
            match kind {
                SemanticKind::Time => time_raw = cell(&row, i),
                SemanticKind::Text => label.push_str(cell(&row, i).unwrap_or_default()),
                SemanticKind::Number | SemanticKind::Other => {}
            }
        }
        let timestamp = read_time(time_raw)?;

        for (i, kind) in kinds.iter().enumerate() {
            if *kind != SemanticKind::Number {
                continue;
            }
            let column = &columns[i].name;
            let value = read_number(cell(&row, i), column)?;
            let key = match layout {
                DerivedLayout::SingleMetric => label.clone(),
                DerivedLayout::MultiMetric => format!("{}{}", label, column),
            };
            groups.push(key, TimeValuePoint::new(timestamp, value));
        }
        rows += 1;
    }

    tracing::debug!(rows, series = groups.len(), ?layout, "derived rows grouped");

    let frames = groups
        .into_sorted()
        .into_iter()
        .map(|(key, points)| {
            // No structured tags here, so a legend is used verbatim
            let display = if legend.is_empty() { key } else { legend.to_string() };
            let value_field = Field::number(display.clone(), Vec::new()).display_name(display);
            Frame::time_series(FRAME_NAME, &points, value_field)
        })
        .collect();

    stats.rows_processed = rows;
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::MemoryCursor;
    use crate::frame::FieldValues;

    fn counts(time: usize, number: usize, text: usize) -> KindCounts {
        KindCounts {
            time,
            number,
            text,
            other: 0,
        }
    }

    #[test]
    fn test_layout_selection() {
        assert_eq!(DerivedLayout::select(counts(1, 1, 1)).unwrap(), DerivedLayout::SingleMetric);
        assert_eq!(DerivedLayout::select(counts(1, 1, 3)).unwrap(), DerivedLayout::SingleMetric);
        assert_eq!(DerivedLayout::select(counts(1, 2, 1)).unwrap(), DerivedLayout::MultiMetric);
        assert!(DerivedLayout::select(counts(1, 1, 0)).is_err());
        assert!(DerivedLayout::select(counts(2, 1, 1)).is_err());
        assert!(DerivedLayout::select(counts(1, 0, 1)).is_err());
        assert!(DerivedLayout::select(counts(0, 1, 1)).is_err());
    }

    #[test]
    fn test_missing_label_columns_is_ambiguous() {
        let mut cursor = MemoryCursor::new(vec![
            ColumnDescriptor::new("METRIC_TIME", "TIMESTAMP"),
            ColumnDescriptor::new("VALUE", "NUMBER"),
        ])
        .text_row(&["2024-01-01T00:00:00Z", "1.0"]);

        let mut stats = ScanStats::default();
        let err = assemble(&mut cursor, "", &mut stats).unwrap_err();

        assert_eq!(err, FrameError::AmbiguousSchema);
        assert!(err.to_string().contains("Invalid SQL query"));
        assert_eq!(stats.rows_processed, 0);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_single_metric_mixed_time_formats() {
        let mut cursor = MemoryCursor::new(vec![
            ColumnDescriptor::new("METRIC_TIME", "TIMESTAMP"),
            ColumnDescriptor::new("NODE", "VARCHAR2"),
            ColumnDescriptor::new("VALUE", "NUMBER"),
        ])
        .text_row(&["2024-01-01T00:00:00Z", "node-a", "1"])
        .text_row(&["1700000100", "node-a", "2.5"]);

        let mut stats = ScanStats::default();
        let frames = assemble(&mut cursor, "", &mut stats).unwrap();

        assert_eq!(stats.rows_processed, 2);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.name, "response");
        assert_eq!(frame.fields[1].name, "node-a");
        assert_eq!(frame.fields[1].values, FieldValues::Number(vec![2.5, 1.0]));
    }

    #[test]
    fn test_label_concatenation_and_legend() {
        let mut cursor = MemoryCursor::new(vec![
            ColumnDescriptor::new("HOST", "VARCHAR2"),
            ColumnDescriptor::new("METRIC_TIME_EPOCH", "NUMBER"),
            ColumnDescriptor::new("REGION", "CHAR"),
            ColumnDescriptor::new("VALUE", "NUMBER"),
        ])
        .text_row(&["h1", "10", "eu", "1"])
        .text_row(&["h2", "10", "eu", "2"])
        .row(vec![Some("h1".into()), Some("20".into()), None, Some("3".into())]);

        let mut stats = ScanStats::default();
        let frames = assemble(&mut cursor, "{{HOST}}", &mut stats).unwrap();

        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.fields[1].name == "{{HOST}}"));
    }

    #[test]
    fn test_multi_metric_columns_become_series() {
        let mut cursor = MemoryCursor::new(vec![
            ColumnDescriptor::new("METRIC_TIME", "DATE"),
            ColumnDescriptor::new("HOST", "VARCHAR2"),
            ColumnDescriptor::new("CPU", "NUMBER"),
            ColumnDescriptor::new("MEM", "FLOAT"),
        ])
        .text_row(&["20", "h1", "0.5", "100"])
        .row(vec![Some("10".into()), Some("h1".into()), Some("0.25".into()), None]);

        let mut stats = ScanStats::default();
        let frames = assemble(&mut cursor, "", &mut stats).unwrap();

        assert_eq!(stats.rows_processed, 2);
        let names: Vec<&str> = frames.iter().map(|f| f.fields[1].name.as_str()).collect();
        assert_eq!(names, vec!["h1CPU", "h1MEM"]);
        assert_eq!(frames[0].fields[1].values, FieldValues::Number(vec![0.25, 0.5]));
        assert_eq!(frames[1].fields[1].values, FieldValues::Number(vec![0.0, 100.0]));
    }

    #[test]
    fn test_invalid_numeric_value_names_column() {
        let mut cursor = MemoryCursor::new(vec![
            ColumnDescriptor::new("METRIC_TIME", "TIMESTAMP"),
            ColumnDescriptor::new("HOST", "VARCHAR2"),
            ColumnDescriptor::new("VALUE", "NUMBER"),
        ])
        .text_row(&["2024-01-01T00:00:00Z", "node-a", "bad-number"]);

        let mut stats = ScanStats::default();
        let err = assemble(&mut cursor, "", &mut stats).unwrap_err();

        assert!(err.to_string().contains("invalid numeric value"));
        assert!(matches!(err, FrameError::InvalidNumericValue { ref column, .. } if column == "VALUE"));
        assert_eq!(stats.rows_processed, 0);
    }

    #[test]
    fn test_invalid_time_aborts() {
        let mut cursor = MemoryCursor::new(vec![
            ColumnDescriptor::new("METRIC_TIME", "TIMESTAMP"),
            ColumnDescriptor::new("HOST", "VARCHAR2"),
            ColumnDescriptor::new("VALUE", "NUMBER"),
        ])
        .text_row(&["2024-01-01T00:00:00Z", "node-a", "1"])
        .text_row(&["1.2.3", "node-a", "2"]);

        let mut stats = ScanStats::default();
        let result = assemble(&mut cursor, "", &mut stats);

        assert!(matches!(
            result,
            Err(FrameError::MalformedTimestamp { ref token, .. }) if token == "1.2.3"
        ));
        assert_eq!(stats.rows_processed, 0);
    }
}
