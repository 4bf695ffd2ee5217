//! Query translation
//!
//! Turns host requests into statements for the telemetry database:
//!
//! - **Spec**: decode host payloads into typed requests
//! - **Templates**: telemetry package statements per deployment
//! - **PromQL**: range conversion with step normalization
//! - **Macros**: SQL time macro expansion
//! - **Planner**: pick the statement and result route per request
//!
//! # Examples
//!
//! ```rust
//! use telemetry_frames::query::{expand_macros, TimeWindow};
//!
//! let window = TimeWindow::from_unix(1_700_000_000, 1_700_003_600).unwrap();
//! let sql = expand_macros("select $__time(ts), v from t where ts > :start_time", &window, 10).unwrap();
//! assert_eq!(sql, "select  ts as time , v from t where ts > 1700000000");
//! ```

mod error;
mod macros;
mod planner;
mod promql;
mod spec;
mod templates;

pub use error::{QueryError, QueryResult};
pub use macros::expand_macros;
pub use planner::{QueryPlan, Route};
pub use promql::{normalize_step, range_bounds, range_query, RangeBounds, MAX_DATA_POINTS};
pub use spec::{
    parse_step, parse_variable_query, QueryKind, QueryLanguage, QueryRequest, QuerySpec, RawQuery,
    TimeWindow, AD_HOC_KEYS, AD_HOC_VALUES, FETCH_LABELS, METRIC_FIND_QUERY,
};
pub use templates::{DeploymentVariant, TemplateKind};
