//! Frame data types
//!
//! A [`Frame`] is the unit handed back to the visualization host: a named set
//! of equal-length, typed [`Field`]s. Time-series modes emit one frame per
//! series with a `METRIC_TIME` field followed by a value field.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the time field in every time-series frame
pub const TIME_FIELD_NAME: &str = "METRIC_TIME";

/// A single observation in a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeValuePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TimeValuePoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Typed column values of a field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    Number(Vec<f64>),
    Text(Vec<String>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::Number(v) => v.len(),
            FieldValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldValues::Time(_) => "time",
            FieldValues::Number(_) => "number",
            FieldValues::Text(_) => "text",
        }
    }
}

/// A named, typed column of a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub values: FieldValues,
}

impl Field {
    pub fn time(name: impl Into<String>, values: Vec<DateTime<Utc>>) -> Self {
        Self::with_values(name, FieldValues::Time(values))
    }

    pub fn number(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::with_values(name, FieldValues::Number(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::with_values(name, FieldValues::Text(values))
    }

    fn with_values(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            tags: None,
            values,
        }
    }

    /// Builder: set the display name shown by the host
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Builder: attach series tags
    pub fn tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A named set of equal-length fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder: append a field
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Build a two-field time-series frame from sorted points
    pub fn time_series(name: impl Into<String>, points: &[TimeValuePoint], value_field: Field) -> Self {
        let times = points.iter().map(|p| p.timestamp).collect();
        let values = points.iter().map(|p| p.value).collect();
        let value_field = Field {
            values: FieldValues::Number(values),
            ..value_field
        };

        Self::new(name)
            .field(Field::time(TIME_FIELD_NAME, times))
            .field(value_field)
    }

    /// Number of rows (length of the first field)
    pub fn row_count(&self) -> usize {
        self.fields.first().map(Field::len).unwrap_or(0)
    }

    /// Whether every field has the same length
    pub fn is_consistent(&self) -> bool {
        let rows = self.row_count();
        self.fields.iter().all(|f| f.len() == rows)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame '{}' ({} rows) [", self.name, self.row_count())?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.values.type_name())?;
            if let Some(display) = &field.display_name {
                write!(f, " as '{}'", display)?;
            }
            if let Some(tags) = &field.tags {
                write!(f, " {} tags", tags.len())?;
            }
        }
        write!(f, "]")
    }
}
