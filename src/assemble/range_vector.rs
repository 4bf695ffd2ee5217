//! Range-vector decoding
//!
//! PromQL range queries come back as a single text cell holding a
//! Prometheus-style document:
//!
//! ```text
//! {"status": "success",
//!  "data": {"resultType": "matrix",
//!           "result": [{"metric": {"__name__": "up", "job": "db"},
//!                       "values": [[1700000000, "1"], ...]}]}}
//! ```
//!
//! Each result item becomes one frame. Points keep document order.

use chrono::DateTime;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::frame::{render_legend, Field, Frame, FrameError, FrameResult, ScanError, TimeValuePoint};

use super::cursor::{cell, RowCursor};
use super::ScanStats;

const FRAME_NAME: &str = "response";
const METRIC_NAME_LABEL: &str = "__name__";

#[derive(Debug, Default, Deserialize)]
pub struct RangeVectorResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: RangeVectorData,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeVectorData {
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<RangeVectorSeries>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeVectorSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    /// `[epoch_seconds, "value"]` pairs
    #[serde(default)]
    pub values: Vec<(f64, String)>,
}

/// Read the single payload cell from `cursor` and decode it
pub fn decode_cursor(cursor: &mut dyn RowCursor, legend: &str, stats: &mut ScanStats) -> FrameResult<Vec<Frame>> {
    let row = cursor
        .next_row()?
        .ok_or_else(|| ScanError::new("range-vector query returned no rows"))?;
    stats.mark_columns_ready();

    let payload = cell(&row, 0).unwrap_or_default();
    decode_payload(payload, legend, stats)
}

/// Decode a range-vector document into frames
pub fn decode_payload(payload: &str, legend: &str, stats: &mut ScanStats) -> FrameResult<Vec<Frame>> {
    let response: RangeVectorResponse = serde_json::from_str(payload)?;
    if response.status != "success" {
        tracing::warn!(status = %response.status, "range-vector response is not marked successful");
    }
    tracing::debug!(
        result_type = %response.data.result_type,
        series = response.data.result.len(),
        "range-vector payload decoded"
    );

    let mut frames = Vec::with_capacity(response.data.result.len());
    let mut points_total = 0;

    for series in response.data.result {
        let value_field = if legend.is_empty() {
            let name = series.metric.get(METRIC_NAME_LABEL).cloned().unwrap_or_default();
            Field::number(name, Vec::new())
        } else {
            let display = render_legend(legend, &series.metric);
            Field::number(display.clone(), Vec::new()).display_name(display)
        };

        let points = series
            .values
            .iter()
            .map(|(epoch, raw)| decode_point(*epoch, raw, &value_field.name))
            .collect::<FrameResult<Vec<_>>>()?;
        points_total += points.len();

        let value_field = value_field.tags(series.metric);
        frames.push(Frame::time_series(FRAME_NAME, &points, value_field));
    }

    stats.rows_processed = points_total;
    Ok(frames)
}

fn decode_point(epoch: f64, raw: &str, series: &str) -> FrameResult<TimeValuePoint> {
    // Sub-second precision is dropped
    let timestamp = DateTime::from_timestamp(epoch as i64, 0).ok_or_else(|| FrameError::MalformedTimestamp {
        token: epoch.to_string(),
        reason: "epoch offset out of range".to_string(),
    })?;
    let value = raw.parse::<f64>().map_err(|e| FrameError::InvalidNumericValue {
        value: raw.to_string(),
        column: series.to_string(),
        reason: e.to_string(),
    })?;
    Ok(TimeValuePoint::new(timestamp, value))
}
