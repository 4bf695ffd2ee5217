//! Column classification
//!
//! Maps a column's declared database type (and, for time columns, its name)
//! to the semantic kind used during assembly.

use serde::{Deserialize, Serialize};

const NUMBER_TYPES: &[&str] = &["NUMBER", "DOUBLE", "FLOAT", "LONG"];

const TIME_TYPES: &[&str] = &[
    "DATE",
    "TIMESTAMP",
    "TIMESTAMP WITH TIME ZONE",
    "TIMESTAMP WITH LOCAL TIME ZONE",
];

/// Column names treated as time regardless of declared type, so a numeric
/// epoch column can be aliased into the time axis.
const TIME_COLUMN_NAMES: &[&str] = &["METRIC_TIME", "METRIC_TIME_EPOCH", "TIME"];

const CHAR_TYPES: &[&str] = &["VARCHAR2", "CHAR", "NVARCHAR2", "NCHAR"];

/// Name and declared type of a result column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    /// Semantic kind of this column
    pub fn kind(&self) -> SemanticKind {
        SemanticKind::classify(&self.declared_type, &self.name)
    }
}

/// Semantic kind of a column as seen by the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticKind {
    Time,
    Number,
    Text,
    Other,
}

impl SemanticKind {
    /// Classify a column. Time wins over Number, Number over Text.
    pub fn classify(declared_type: &str, name: &str) -> Self {
        if is_time(declared_type, name) {
            SemanticKind::Time
        } else if is_number(declared_type) {
            SemanticKind::Number
        } else if is_char(declared_type) {
            SemanticKind::Text
        } else {
            SemanticKind::Other
        }
    }
}

impl std::fmt::Display for SemanticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticKind::Time => write!(f, "time"),
            SemanticKind::Number => write!(f, "number"),
            SemanticKind::Text => write!(f, "text"),
            SemanticKind::Other => write!(f, "other"),
        }
    }
}

pub fn is_number(declared_type: &str) -> bool {
    NUMBER_TYPES.contains(&declared_type)
}

pub fn is_time(declared_type: &str, name: &str) -> bool {
    TIME_TYPES.contains(&declared_type) || TIME_COLUMN_NAMES.contains(&name)
}

pub fn is_char(declared_type: &str) -> bool {
    CHAR_TYPES.contains(&declared_type)
}

/// Per-kind column counts for a result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub time: usize,
    pub number: usize,
    pub text: usize,
    pub other: usize,
}

impl KindCounts {
    pub fn of(columns: &[ColumnDescriptor]) -> Self {
        columns.iter().fold(Self::default(), |mut counts, col| {
            match col.kind() {
                SemanticKind::Time => counts.time += 1,
                SemanticKind::Number => counts.number += 1,
                SemanticKind::Text => counts.text += 1,
                SemanticKind::Other => counts.other += 1,
            }
            counts
        })
    }
}
