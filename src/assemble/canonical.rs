//! Canonical time-series layout
//!
//! Results projecting `METRIC_TIME_EPOCH`, `METRIC_VALUE`, `METRIC_NAME` and
//! `METRIC_TAGS` are grouped by (name, tags JSON) into one frame per series.

use std::collections::BTreeMap;

use crate::frame::{display_name, ColumnDescriptor, Field, Frame, FrameResult, TimeValuePoint};

use super::cursor::{cell, RowCursor};
use super::series::{read_number, read_time, SeriesGroups};
use super::ScanStats;

pub const TIME_COLUMN: &str = "METRIC_TIME_EPOCH";
pub const VALUE_COLUMN: &str = "METRIC_VALUE";
pub const NAME_COLUMN: &str = "METRIC_NAME";
pub const TAGS_COLUMN: &str = "METRIC_TAGS";

/// Positions of the four canonical columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalColumns {
    time: usize,
    value: usize,
    name: usize,
    tags: usize,
}

impl CanonicalColumns {
    /// Locate the canonical columns, `None` unless all four are present
    pub fn locate(columns: &[ColumnDescriptor]) -> Option<Self> {
        let position = |wanted: &str| columns.iter().position(|c| c.name == wanted);
        Some(Self {
            time: position(TIME_COLUMN)?,
            value: position(VALUE_COLUMN)?,
            name: position(NAME_COLUMN)?,
            tags: position(TAGS_COLUMN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MetricTagKey {
    metric: String,
    tags_json: String,
}

/// Group canonical rows into per-series frames named after the query text
pub fn assemble(
    cursor: &mut dyn RowCursor,
    layout: CanonicalColumns,
    legend: &str,
    query_text: &str,
    stats: &mut ScanStats,
) -> FrameResult<Vec<Frame>> {
    stats.mark_columns_ready();

    let mut groups = SeriesGroups::new();
    let mut rows = 0;

    while let Some(row) = cursor.next_row()? {
        let value = read_number(cell(&row, layout.value), VALUE_COLUMN)?;
        let timestamp = read_time(cell(&row, layout.time))?;
        let key = MetricTagKey {
            metric: cell(&row, layout.name).unwrap_or_default().to_string(),
            tags_json: cell(&row, layout.tags).unwrap_or_default().to_string(),
        };
        groups.push(key, TimeValuePoint::new(timestamp, value));
        rows += 1;
    }

    tracing::debug!(rows, series = groups.len(), "canonical rows grouped");

    let frames = groups
        .into_sorted()
        .into_iter()
        .map(|(key, points)| series_frame(&key, &points, legend, query_text))
        .collect();

    stats.rows_processed = rows;
    Ok(frames)
}

fn series_frame(key: &MetricTagKey, points: &[TimeValuePoint], legend: &str, query_text: &str) -> Frame {
    let tags = decode_tags(&key.tags_json);

    let fallback = format!("{}{}", key.metric, key.tags_json);
    let display = display_name(legend, tags.as_ref().unwrap_or(&BTreeMap::new()), &fallback);

    let mut value_field = Field::number(display.clone(), Vec::new()).display_name(display);
    if let Some(tags) = tags {
        value_field = value_field.tags(tags);
    }

    Frame::time_series(query_text, points, value_field)
}

/// Decode a tags JSON object. Undecodable tags are dropped, not fatal.
fn decode_tags(tags_json: &str) -> Option<BTreeMap<String, String>> {
    if tags_json.is_empty() {
        return None;
    }
    match serde_json::from_str(tags_json) {
        Ok(tags) => Some(tags),
        Err(e) => {
            tracing::debug!(tags_json, error = %e, "metric tags are not a flat JSON object");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::MemoryCursor;
    use crate::frame::{FieldValues, FrameError};

    fn canonical_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new(TIME_COLUMN, "NUMBER"),
            ColumnDescriptor::new(VALUE_COLUMN, "NUMBER"),
            ColumnDescriptor::new(NAME_COLUMN, "VARCHAR2"),
            ColumnDescriptor::new(TAGS_COLUMN, "VARCHAR2"),
        ]
    }

    fn run(cursor: &mut MemoryCursor, legend: &str) -> (FrameResult<Vec<Frame>>, ScanStats) {
        let layout = CanonicalColumns::locate(cursor.columns()).unwrap();
        let mut stats = ScanStats::default();
        let result = assemble(cursor, layout, legend, "query", &mut stats);
        (result, stats)
    }

    #[test]
    fn test_locate_requires_all_columns() {
        assert!(CanonicalColumns::locate(&canonical_columns()).is_some());
        assert!(CanonicalColumns::locate(&canonical_columns()[..3]).is_none());
    }

    #[test]
    fn test_series_sorted_by_time() {
        let mut cursor = MemoryCursor::new(canonical_columns())
            .text_row(&["1704153600", "1.5", "cpu_usage", r#"{"node":"node-a"}"#])
            .text_row(&["1700000010", "0.5", "cpu_usage", r#"{"node":"node-a"}"#]);

        let (result, stats) = run(&mut cursor, "node");
        let frames = result.unwrap();

        assert_eq!(stats.rows_processed, 2);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.fields.len(), 2);
        assert_eq!(frame.fields[0].name, "METRIC_TIME");

        match &frame.fields[0].values {
            FieldValues::Time(times) => {
                let rendered: Vec<String> = times
                    .iter()
                    .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
                    .collect();
                assert_eq!(rendered, vec!["2023-11-14T22:13:30Z", "2024-01-02T00:00:00Z"]);
            }
            other => panic!("expected time field, got {:?}", other),
        }
        assert_eq!(frame.fields[1].values, FieldValues::Number(vec![0.5, 1.5]));
        assert_eq!(frame.fields[1].display_name.as_deref(), Some("node"));
    }

    #[test]
    fn test_groups_by_name_and_tags() {
        let mut cursor = MemoryCursor::new(canonical_columns())
            .text_row(&["10", "1", "cpu", r#"{"node":"a"}"#])
            .text_row(&["10", "2", "cpu", r#"{"node":"b"}"#])
            .text_row(&["20", "3", "cpu", r#"{"node":"a"}"#])
            .text_row(&["10", "4", "mem", r#"{"node":"a"}"#]);

        let (result, _) = run(&mut cursor, "{{node}} {{missing}}x");
        let frames = result.unwrap();

        let names: Vec<&str> = frames
            .iter()
            .map(|f| f.fields[1].display_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["a x", "b x", "a x"]);
        assert_eq!(frames[0].row_count(), 2);
        assert_eq!(frames[0].fields[1].tags.as_ref().unwrap()["node"], "a");
    }

    #[test]
    fn test_default_display_name_and_bad_tags() {
        let mut cursor = MemoryCursor::new(canonical_columns())
            .text_row(&["10", "1", "cpu", "not json"])
            .row(vec![Some("20".into()), None, Some("mem".into()), None]);

        let (result, _) = run(&mut cursor, "");
        let frames = result.unwrap();

        assert_eq!(frames[0].fields[1].name, "cpunot json");
        assert!(frames[0].fields[1].tags.is_none());
        assert_eq!(frames[1].fields[1].name, "mem");
        assert_eq!(frames[1].fields[1].values, FieldValues::Number(vec![0.0]));
    }

    #[test]
    fn test_invalid_value_aborts() {
        let mut cursor = MemoryCursor::new(canonical_columns())
            .text_row(&["10", "1", "cpu", "{}"])
            .text_row(&["20", "oops", "cpu", "{}"]);

        let (result, stats) = run(&mut cursor, "");
        assert!(matches!(
            result,
            Err(FrameError::InvalidNumericValue { ref column, .. }) if column == VALUE_COLUMN
        ));
        assert_eq!(stats.rows_processed, 0);
    }

    #[test]
    fn test_invalid_time_aborts() {
        let mut cursor = MemoryCursor::new(canonical_columns())
            .text_row(&["10", "1", "cpu", "{}"])
            .text_row(&["not-a-time", "2", "cpu", "{}"]);

        let (result, stats) = run(&mut cursor, "");
        assert!(matches!(
            result,
            Err(FrameError::MalformedTimestamp { ref token, .. }) if token == "not-a-time"
        ));
        assert_eq!(stats.rows_processed, 0);
    }

    #[test]
    fn test_scan_failure_aborts() {
        let mut cursor = MemoryCursor::new(canonical_columns())
            .text_row(&["10", "1", "cpu", "{}"])
            .fail_after(1, "cursor closed");

        let (result, _) = run(&mut cursor, "");
        assert!(matches!(result, Err(FrameError::Scan(_))));
    }
}
