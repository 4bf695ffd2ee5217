//! Query requests
//!
//! The host submits one loosely-typed JSON object per query. It is decoded
//! once, at the boundary, into a [`QueryRequest`] whose [`QueryKind`] says
//! what the query is:
//!
//! - `refId = "fetchLabels"`: metric names in a window
//! - `refId = "metricFindQuery"`: series of one metric (`<metric>&start=<s>&end=<s>`)
//! - `refId = "getKeysForAdHocFilter"`: all label keys
//! - `refId = "getValueforKeyAdHocFilter"`: values of the label in `rawQueryText`
//! - anything else: a PromQL or SQL expression, picked by `queryLang`

use chrono::{DateTime, Utc};
use nom::{
    bytes::complete::{tag, take_until},
    character::complete::digit1,
    combinator::{eof, map_res},
    sequence::{preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::error::{QueryError, QueryResult};
use super::templates::DeploymentVariant;
use crate::config::EngineConfig;

pub const FETCH_LABELS: &str = "fetchLabels";
pub const METRIC_FIND_QUERY: &str = "metricFindQuery";
pub const AD_HOC_KEYS: &str = "getKeysForAdHocFilter";
pub const AD_HOC_VALUES: &str = "getValueforKeyAdHocFilter";

/// Requested time range, closed at both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `from > to`
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> QueryResult<Self> {
        if from > to {
            return Err(QueryError::InvalidTimeRange(format!(
                "start {} is after end {}",
                from.to_rfc3339(),
                to.to_rfc3339()
            )));
        }
        Ok(Self { from, to })
    }

    /// Create a window from Unix seconds
    pub fn from_unix(from: i64, to: i64) -> QueryResult<Self> {
        let instant = |secs: i64| {
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| QueryError::InvalidTimeRange(format!("{} is out of range", secs)))
        };
        Self::new(instant(from)?, instant(to)?)
    }

    /// The `secs` seconds ending at `now`
    pub fn last(secs: i64, now: DateTime<Utc>) -> Self {
        Self {
            from: now - chrono::Duration::seconds(secs.max(0)),
            to: now,
        }
    }

    pub fn from_secs(&self) -> i64 {
        self.from.timestamp()
    }

    pub fn to_secs(&self) -> i64 {
        self.to.timestamp()
    }
}

/// Language of an expression query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    Sql,
    PromQl,
}

impl QueryLanguage {
    /// `"sql"` selects SQL; anything else, including nothing, selects PromQL
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector {
            Some("sql") => QueryLanguage::Sql,
            _ => QueryLanguage::PromQl,
        }
    }
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryLanguage::Sql => write!(f, "sql"),
            QueryLanguage::PromQl => write!(f, "promql"),
        }
    }
}

/// A validated expression query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub language: QueryLanguage,
    pub expression: String,
    pub legend: String,
    pub step_secs: i64,
    pub prefetch_rows: usize,
    pub convert_to_time_series: bool,
    pub deployment: DeploymentVariant,
}

impl QuerySpec {
    pub fn is_promql(&self) -> bool {
        self.language == QueryLanguage::PromQl
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} query, step {}s", self.language, self.step_secs)?;
        if self.language == QueryLanguage::Sql {
            write!(
                f,
                ", prefetch {}, {}",
                self.prefetch_rows,
                if self.convert_to_time_series { "time series" } else { "table" }
            )?;
        }
        if !self.legend.is_empty() {
            write!(f, ", legend '{}'", self.legend)?;
        }
        write!(f, " on {}: {}", self.deployment, self.expression)
    }
}

/// What a request asks for
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    /// Metric names seen in `window`
    LabelNames { window: TimeWindow },
    /// Series of `metric` between `start` and `end` (Unix seconds)
    Series { metric: String, start: i64, end: i64 },
    /// All label keys
    LabelKeys,
    /// Values of label `key`
    LabelValues { key: String },
    /// A PromQL or SQL expression
    Expression(QuerySpec),
}

impl QueryKind {
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::LabelNames { .. } => "label names",
            QueryKind::Series { .. } => "series",
            QueryKind::LabelKeys => "label keys",
            QueryKind::LabelValues { .. } => "label values",
            QueryKind::Expression(spec) if spec.is_promql() => "promql",
            QueryKind::Expression(_) => "sql",
        }
    }
}

/// A decoded host request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub ref_id: String,
    pub kind: QueryKind,
    /// Time range chosen on the host
    pub window: TimeWindow,
}

/// Wire shape of a host query payload
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuery {
    #[serde(default)]
    pub ref_id: String,
    pub query_lang: Option<String>,
    pub expr_sql: Option<String>,
    pub legend_format_sql: Option<String>,
    pub step_text_sql: Option<String>,
    pub prefetch_count_text: Option<String>,
    pub convert_sql_results: Option<Value>,
    pub expr_prom: Option<String>,
    pub legend_format_prom: Option<String>,
    pub step_text_prom: Option<String>,
    pub expr: Option<String>,
    pub raw_query_text: Option<String>,
    /// Milliseconds, as a string or number
    pub time_from: Option<Value>,
    pub time_to: Option<Value>,
}

impl QueryRequest {
    /// Decode a JSON payload for a query over `window`
    pub fn from_json(payload: &str, window: TimeWindow, engine: &EngineConfig) -> QueryResult<Self> {
        let raw: RawQuery = serde_json::from_str(payload)?;
        Self::decode(raw, window, engine, Utc::now())
    }

    /// Decode a JSON value for a query over `window`
    pub fn from_value(payload: Value, window: TimeWindow, engine: &EngineConfig) -> QueryResult<Self> {
        let raw: RawQuery = serde_json::from_value(payload)?;
        Self::decode(raw, window, engine, Utc::now())
    }

    /// Validate a raw payload. `now` anchors label lookups without a window.
    pub fn decode(raw: RawQuery, window: TimeWindow, engine: &EngineConfig, now: DateTime<Utc>) -> QueryResult<Self> {
        let kind = match raw.ref_id.as_str() {
            FETCH_LABELS => QueryKind::LabelNames {
                window: label_window(&raw, engine.label_lookback_secs, now)?,
            },
            METRIC_FIND_QUERY => {
                let text = non_empty(raw.expr.as_deref())
                    .or_else(|| non_empty(raw.raw_query_text.as_deref()))
                    .ok_or(QueryError::MissingField("expr"))?;
                let (metric, start, end) = parse_variable_query(text)?;
                QueryKind::Series { metric, start, end }
            }
            AD_HOC_KEYS => QueryKind::LabelKeys,
            AD_HOC_VALUES => QueryKind::LabelValues {
                key: raw
                    .raw_query_text
                    .clone()
                    .ok_or(QueryError::MissingField("rawQueryText"))?,
            },
            _ => QueryKind::Expression(expression_spec(&raw, engine)?),
        };

        Ok(Self {
            ref_id: raw.ref_id,
            kind,
            window,
        })
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

fn expression_spec(raw: &RawQuery, engine: &EngineConfig) -> QueryResult<QuerySpec> {
    let language = QueryLanguage::from_selector(raw.query_lang.as_deref());

    let spec = match language {
        QueryLanguage::Sql => QuerySpec {
            language,
            expression: non_empty(raw.expr_sql.as_deref())
                .ok_or(QueryError::MissingField("exprSql"))?
                .to_string(),
            legend: raw.legend_format_sql.clone().unwrap_or_default(),
            step_secs: parse_step(raw.step_text_sql.as_deref(), engine.default_step_secs)?,
            prefetch_rows: parse_prefetch(raw.prefetch_count_text.as_deref(), engine.default_prefetch_rows)?,
            convert_to_time_series: !matches!(raw.convert_sql_results, Some(Value::Bool(false))),
            deployment: engine.deployment,
        },
        QueryLanguage::PromQl => QuerySpec {
            language,
            expression: non_empty(raw.expr_prom.as_deref())
                .ok_or(QueryError::MissingField("exprProm"))?
                .to_string(),
            legend: raw.legend_format_prom.clone().unwrap_or_default(),
            step_secs: parse_step(raw.step_text_prom.as_deref(), engine.default_step_secs)?,
            prefetch_rows: engine.default_prefetch_rows,
            convert_to_time_series: true,
            deployment: engine.deployment,
        },
    };
    Ok(spec)
}

/// Parse step text; empty means `default`
pub fn parse_step(text: Option<&str>, default: i64) -> QueryResult<i64> {
    let Some(text) = non_empty(text) else {
        return Ok(default);
    };
    match text.trim().parse::<i64>() {
        Ok(step) if step > 0 => Ok(step),
        _ => Err(QueryError::InvalidStep(text.to_string())),
    }
}

fn parse_prefetch(text: Option<&str>, default: usize) -> QueryResult<usize> {
    let Some(text) = non_empty(text) else {
        return Ok(default);
    };
    match text.trim().parse::<usize>() {
        Ok(rows) if rows > 0 => Ok(rows),
        _ => Err(QueryError::Decode(format!(
            "prefetchCountText '{}' is not a positive row count",
            text
        ))),
    }
}

/// Window for a label-name listing: `timeFrom`/`timeTo` in milliseconds,
/// else the `lookback_secs` ending at `now`
fn label_window(raw: &RawQuery, lookback_secs: i64, now: DateTime<Utc>) -> QueryResult<TimeWindow> {
    match (&raw.time_from, &raw.time_to) {
        (Some(from), Some(to)) if !from.is_null() && !to.is_null() => {
            TimeWindow::from_unix(millis_to_secs(from)?, millis_to_secs(to)?)
        }
        _ => Ok(TimeWindow::last(lookback_secs, now)),
    }
}

fn millis_to_secs(value: &Value) -> QueryResult<i64> {
    let millis = match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    millis
        .map(|ms| ms / 1000)
        .ok_or_else(|| QueryError::InvalidTimeRange(format!("{} is not a millisecond timestamp", value)))
}

fn seconds(input: &str) -> IResult<&str, i64> {
    map_res(digit1, |s: &str| s.parse::<i64>())(input)
}

fn variable_query(input: &str) -> IResult<&str, (&str, i64, i64)> {
    let (rest, (metric, start, end)) = tuple((
        take_until("&start="),
        preceded(tag("&start="), seconds),
        preceded(tag("&end="), seconds),
    ))(input)?;
    let (rest, _) = eof(rest)?;
    Ok((rest, (metric, start, end)))
}

/// Split `<metric>&start=<secs>&end=<secs>`
pub fn parse_variable_query(text: &str) -> QueryResult<(String, i64, i64)> {
    let (_, (metric, start, end)) = variable_query(text.trim())
        .map_err(|_| QueryError::InvalidVariableQuery(text.to_string()))?;
    if metric.is_empty() {
        return Err(QueryError::InvalidVariableQuery(text.to_string()));
    }
    Ok((metric.to_string(), start, end))
}
