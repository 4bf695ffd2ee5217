//! Batch query orchestration
//!
//! A [`Datasource`] answers a batch of host queries. Each query is planned,
//! executed through a [`QueryRunner`] and assembled into frames on its own:
//! a failure only fills that query's error slot.
//!
//! ```text
//! payload ──decode──▶ QueryRequest ──plan──▶ QueryPlan ──run──▶ RowCursor ──assemble──▶ frames
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

use crate::assemble::{assemble_frames, single_column, RowCursor, ScanStats};
use crate::config::EngineConfig;
use crate::frame::{Frame, FrameError};
use crate::query::{QueryError, QueryPlan, QueryRequest, Route, TimeWindow};

/// The statement could not be executed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ExecutionError(pub String);

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors reported in a query's response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasourceError {
    /// Request decoding or translation failed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Result assembly failed
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// The runner failed to execute the statement
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// The database boundary: executes a statement and opens a cursor over its rows
pub trait QueryRunner {
    fn execute(&self, text: &str, prefetch_rows: Option<usize>) -> Result<Box<dyn RowCursor>, ExecutionError>;
}

impl<F> QueryRunner for F
where
    F: Fn(&str, Option<usize>) -> Result<Box<dyn RowCursor>, ExecutionError>,
{
    fn execute(&self, text: &str, prefetch_rows: Option<usize>) -> Result<Box<dyn RowCursor>, ExecutionError> {
        self(text, prefetch_rows)
    }
}

/// Timing and volume of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    /// Rows (or range-vector points) assembled
    pub rows_processed: usize,
    /// Start of execution until result columns were available
    pub round_trip: Duration,
    /// Result columns available until assembly finished
    pub processing: Duration,
    /// Statement that was executed, empty if planning failed
    pub query_text: String,
}

impl QueryStats {
    fn measure(started: Instant, scan: &ScanStats, query_text: String) -> Self {
        let (round_trip, processing) = match scan.columns_ready_at {
            Some(ready) => (ready.saturating_duration_since(started), ready.elapsed()),
            None => (started.elapsed(), Duration::ZERO),
        };
        Self {
            rows_processed: scan.rows_processed,
            round_trip,
            processing,
            query_text,
        }
    }
}

/// Result of one query. `frames` is empty whenever `error` is set.
#[derive(Debug, Clone, Default)]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    pub error: Option<DatasourceError>,
    pub stats: QueryStats,
}

impl DataResponse {
    fn failed(error: DatasourceError, stats: QueryStats) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(error),
            stats,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A raw host query: its id, JSON payload and selected time range
#[derive(Debug, Clone)]
pub struct DataQuery {
    pub ref_id: String,
    pub payload: serde_json::Value,
    pub window: TimeWindow,
}

/// Answers query batches against one telemetry database
#[derive(Debug, Clone, Default)]
pub struct Datasource {
    config: EngineConfig,
}

impl Datasource {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decode and run raw host queries; decode failures land in their own response
    pub fn handle_payloads(&self, queries: Vec<DataQuery>, runner: &dyn QueryRunner) -> BTreeMap<String, DataResponse> {
        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!("query_data", %batch_id, queries = queries.len());
        let _enter = span.enter();

        queries
            .into_iter()
            .map(|query| {
                let response = match QueryRequest::from_value(query.payload, query.window, &self.config) {
                    Ok(request) => self.query(&request, runner),
                    Err(e) => {
                        tracing::warn!(ref_id = %query.ref_id, error = %e, "query payload rejected");
                        DataResponse::failed(e.into(), QueryStats::default())
                    }
                };
                (query.ref_id, response)
            })
            .collect()
    }

    /// Run decoded requests, keyed by ref id
    pub fn query_data(&self, requests: &[QueryRequest], runner: &dyn QueryRunner) -> BTreeMap<String, DataResponse> {
        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!("query_data", %batch_id, queries = requests.len());
        let _enter = span.enter();

        requests
            .iter()
            .map(|request| (request.ref_id.clone(), self.query(request, runner)))
            .collect()
    }

    /// Plan, execute and assemble one request
    pub fn query(&self, request: &QueryRequest, runner: &dyn QueryRunner) -> DataResponse {
        let span = tracing::info_span!("query", ref_id = %request.ref_id, kind = request.kind.name());
        let _enter = span.enter();

        let started = Instant::now();
        let plan = match QueryPlan::build(request, &self.config) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(error = %e, "query translation failed");
                return DataResponse::failed(e.into(), QueryStats::measure(started, &ScanStats::default(), String::new()));
            }
        };

        let mut scan = ScanStats::default();
        let result = run_plan(&plan, runner, &mut scan);
        let stats = QueryStats::measure(started, &scan, plan.text);

        match result {
            Ok(frames) => {
                tracing::info!(
                    rows = stats.rows_processed,
                    frames = frames.len(),
                    round_trip_ms = stats.round_trip.as_millis() as u64,
                    processing_ms = stats.processing.as_millis() as u64,
                    query = %stats.query_text,
                    "query completed"
                );
                for frame in &frames {
                    tracing::trace!(%frame, "frame assembled");
                }
                DataResponse {
                    frames,
                    error: None,
                    stats,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, query = %stats.query_text, "query failed");
                DataResponse::failed(e, stats)
            }
        }
    }
}

fn run_plan(plan: &QueryPlan, runner: &dyn QueryRunner, scan: &mut ScanStats) -> Result<Vec<Frame>, DatasourceError> {
    let mut cursor = runner.execute(&plan.text, plan.prefetch_rows)?;

    let frames = match plan.route {
        Route::Listing => single_column::extract(cursor.as_mut(), scan)?,
        Route::RangeVector | Route::Rows => assemble_frames(cursor.as_mut(), &plan.assembly_options(), scan)?,
    };
    Ok(frames)
}
