//! Tabular passthrough
//!
//! One frame, one field per column. Time columns become instants, numeric
//! columns floats, everything else text.

use crate::frame::{Field, FrameResult, Frame, SemanticKind};

use super::cursor::{cell, RowCursor};
use super::series::{read_number, read_time};
use super::ScanStats;

/// Values being collected for one column
enum ColumnValues {
    Time(Vec<chrono::DateTime<chrono::Utc>>),
    Number(Vec<f64>),
    Text(Vec<String>),
}

struct ColumnBuilder {
    name: String,
    display_name: String,
    values: ColumnValues,
}

impl ColumnBuilder {
    fn push(&mut self, raw: Option<&str>) -> FrameResult<()> {
        match &mut self.values {
            ColumnValues::Time(v) => v.push(read_time(raw)?),
            ColumnValues::Number(v) => v.push(read_number(raw, &self.name)?),
            ColumnValues::Text(v) => v.push(raw.unwrap_or_default().to_string()),
        }
        Ok(())
    }

    fn finish(self) -> Field {
        match self.values {
            ColumnValues::Time(v) => Field::time(self.name, v),
            ColumnValues::Number(v) => Field::number(self.name, v).display_name(self.display_name),
            ColumnValues::Text(v) => Field::text(self.name, v).display_name(self.display_name),
        }
    }
}

/// Assemble every row into a single frame named after the query text
pub fn assemble(
    cursor: &mut dyn RowCursor,
    legend: &str,
    query_text: &str,
    stats: &mut ScanStats,
) -> FrameResult<Vec<Frame>> {
    stats.mark_columns_ready();

    let mut builders: Vec<ColumnBuilder> = cursor
        .columns()
        .iter()
        .map(|col| {
            let values = match col.kind() {
                SemanticKind::Time => ColumnValues::Time(Vec::new()),
                SemanticKind::Number => ColumnValues::Number(Vec::new()),
                SemanticKind::Text | SemanticKind::Other => ColumnValues::Text(Vec::new()),
            };
            let display_name = if legend.is_empty() {
                col.name.clone()
            } else {
                legend.to_string()
            };
            ColumnBuilder {
                name: col.name.clone(),
                display_name,
                values,
            }
        })
        .collect();

    let mut rows = 0;
    while let Some(row) = cursor.next_row()? {
        for (i, builder) in builders.iter_mut().enumerate() {
            builder.push(cell(&row, i))?;
        }
        rows += 1;
    }

    let frame = builders
        .into_iter()
        .fold(Frame::new(query_text), |frame, builder| frame.field(builder.finish()));

    stats.rows_processed = rows;
    tracing::debug!(rows, "tabular frame assembled: {}", frame);
    Ok(vec![frame])
}
