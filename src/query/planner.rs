//! Query planning
//!
//! Turns a decoded [`QueryRequest`] into the statement to execute and the
//! route its result takes through assembly.

use std::fmt;

use super::error::QueryResult;
use super::macros::expand_macros;
use super::promql::range_query;
use super::spec::{QueryKind, QueryLanguage, QueryRequest};
use super::templates::TemplateKind;
use crate::assemble::AssemblyOptions;
use crate::config::EngineConfig;

/// How an executed statement's result is turned into frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// First column of every row (label and tag listings)
    Listing,
    /// One cell holding a range-vector document
    RangeVector,
    /// Relational rows, tabular or grouped into series
    Rows,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Listing => write!(f, "listing"),
            Route::RangeVector => write!(f, "range-vector"),
            Route::Rows => write!(f, "rows"),
        }
    }
}

/// An executable statement and how to read its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub text: String,
    pub route: Route,
    /// Row prefetch hint for the driver
    pub prefetch_rows: Option<usize>,
    pub legend: String,
    pub convert_to_time_series: bool,
}

impl QueryPlan {
    /// Plan `request` for the configured deployment
    pub fn build(request: &QueryRequest, engine: &EngineConfig) -> QueryResult<Self> {
        let variant = engine.deployment;
        let listing = |template: TemplateKind| Self {
            text: template.render(variant),
            route: Route::Listing,
            prefetch_rows: None,
            legend: String::new(),
            convert_to_time_series: false,
        };

        let plan = match &request.kind {
            QueryKind::LabelNames { window } => listing(TemplateKind::LabelNames {
                from: window.from_secs(),
                to: window.to_secs(),
            }),
            QueryKind::Series { metric, start, end } => listing(TemplateKind::Series {
                metric: metric.clone(),
                start: *start,
                end: *end,
            }),
            QueryKind::LabelKeys => listing(TemplateKind::LabelKeys),
            QueryKind::LabelValues { key } => listing(TemplateKind::LabelValues { key: key.clone() }),
            QueryKind::Expression(spec) => match spec.language {
                QueryLanguage::PromQl => Self {
                    text: range_query(
                        &spec.expression,
                        &request.window,
                        spec.step_secs,
                        engine.max_data_points,
                        spec.deployment,
                    ),
                    route: Route::RangeVector,
                    prefetch_rows: None,
                    legend: spec.legend.clone(),
                    convert_to_time_series: true,
                },
                QueryLanguage::Sql => Self {
                    text: expand_macros(&spec.expression, &request.window, spec.step_secs)?,
                    route: Route::Rows,
                    prefetch_rows: Some(spec.prefetch_rows),
                    legend: spec.legend.clone(),
                    convert_to_time_series: spec.convert_to_time_series,
                },
            },
        };

        tracing::debug!(ref_id = %request.ref_id, kind = request.kind.name(), plan = %plan, "query planned");
        Ok(plan)
    }

    /// Assembly inputs for a rows or range-vector result
    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions::new()
            .promql(self.route == Route::RangeVector)
            .convert_to_time_series(self.convert_to_time_series)
            .legend(self.legend.clone())
            .query_text(self.text.clone())
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.route)?;
        if let Some(rows) = self.prefetch_rows {
            write!(f, ", prefetch {}", rows)?;
        }
        if self.route == Route::Rows && !self.convert_to_time_series {
            write!(f, ", table")?;
        }
        write!(f, "] {}", self.text)
    }
}
