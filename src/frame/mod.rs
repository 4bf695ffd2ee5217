//! Frame model
//!
//! The output side of the engine and the helpers every assembly mode shares:
//!
//! - **types**: `Frame`, `Field`, `FieldValues`, `TimeValuePoint`
//! - **column**: declared-type classification into semantic kinds
//! - **timestamp**: RFC 3339 / epoch-seconds time parsing
//! - **legend**: `{{tag}}` series-name templates
//! - **error**: assembly errors
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use telemetry_frames::frame::{render_legend, ColumnDescriptor, SemanticKind};
//!
//! let col = ColumnDescriptor::new("METRIC_TIME_EPOCH", "NUMBER");
//! assert_eq!(col.kind(), SemanticKind::Time);
//!
//! let mut tags = BTreeMap::new();
//! tags.insert("node".to_string(), "a".to_string());
//! assert_eq!(render_legend("lv{{node}}", &tags), "lva");
//! ```

pub mod column;
pub mod error;
pub mod legend;
pub mod timestamp;
pub mod types;

pub use column::{is_char, is_number, is_time, ColumnDescriptor, KindCounts, SemanticKind};
pub use error::{FrameError, FrameResult, ScanError, AMBIGUOUS_SCHEMA_MESSAGE};
pub use legend::{display_name, render_legend};
pub use timestamp::{parse_epoch, parse_epoch_or_sentinel, parse_time_token, EpochParts};
pub use types::{Field, FieldValues, Frame, TimeValuePoint, TIME_FIELD_NAME};
