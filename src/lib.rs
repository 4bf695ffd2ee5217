//! # telemetry-frames
//!
//! Query translation and frame assembly for a telemetry database backend.
//! Host requests (PromQL or SQL with time macros) are translated into
//! statements, and their results, relational rows or a range-vector JSON
//! document, are assembled into uniform time-series or tabular frames.
//!
//! ## Modules
//!
//! - [`frame`]: Frames, column classification, timestamps and legends
//! - [`assemble`]: Row-to-frame assembly modes
//! - [`query`]: Request decoding, macro expansion and PromQL range conversion
//! - [`datasource`]: Batch orchestration over a [`QueryRunner`]
//! - [`config`] / [`logging`]: Ambient setup
//!
//! ## Quick Start
//!
//! ```rust
//! use telemetry_frames::assemble::{assemble_frames, AssemblyOptions, MemoryCursor, ScanStats};
//! use telemetry_frames::frame::ColumnDescriptor;
//!
//! let mut cursor = MemoryCursor::new(vec![
//!     ColumnDescriptor::new("METRIC_TIME_EPOCH", "NUMBER"),
//!     ColumnDescriptor::new("METRIC_VALUE", "NUMBER"),
//!     ColumnDescriptor::new("METRIC_NAME", "VARCHAR2"),
//!     ColumnDescriptor::new("METRIC_TAGS", "VARCHAR2"),
//! ])
//! .text_row(&["1700000010", "0.5", "cpu_usage", r#"{"node":"node-a"}"#]);
//!
//! let options = AssemblyOptions::new()
//!     .convert_to_time_series(true)
//!     .legend("cpu {{node}}");
//! let mut stats = ScanStats::default();
//! let frames = assemble_frames(&mut cursor, &options, &mut stats).unwrap();
//!
//! assert_eq!(frames[0].fields[1].name, "cpu node-a");
//! assert_eq!(stats.rows_processed, 1);
//! ```

pub mod assemble;
pub mod config;
pub mod datasource;
pub mod frame;
pub mod logging;
pub mod query;

// Re-export top-level types for convenience
pub use frame::{
    ColumnDescriptor, Field, FieldValues, Frame, FrameError, FrameResult, SemanticKind,
    TimeValuePoint,
};

pub use assemble::{assemble_frames, AssemblyMode, AssemblyOptions, MemoryCursor, RowCursor, ScanStats};

pub use query::{
    expand_macros, range_query, DeploymentVariant, QueryError, QueryKind, QueryLanguage, QueryPlan,
    QueryRequest, QueryResult, QuerySpec, TimeWindow,
};

pub use datasource::{
    DataQuery, DataResponse, Datasource, DatasourceError, ExecutionError, QueryRunner, QueryStats,
};

pub use config::{generate_default_config, Config, ConfigError, EngineConfig, LoggingConfig};
