//! telemetry-frames CLI
//!
//! Command-line access to the translation and assembly engine:
//! - Translate a host query payload into the executable statement
//! - Assemble frames from rows exported to CSV
//! - Decode a range-vector document
//! - Generate a default config file

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use telemetry_frames::assemble::{decode_payload, MemoryCursor, RowCursor, ScanStats};
use telemetry_frames::config::{generate_default_config, Config};
use telemetry_frames::datasource::{Datasource, ExecutionError};
use telemetry_frames::frame::{parse_time_token, Frame};
use telemetry_frames::logging::init_logging;
use telemetry_frames::query::{QueryPlan, QueryRequest, TimeWindow};

#[derive(Parser)]
#[command(name = "tframes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translate telemetry queries and assemble their results into frames")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (json, table)
    #[arg(short, long, default_value = "json", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the statement a query payload translates to
    Translate {
        /// Query payload (JSON object)
        #[arg(short, long)]
        query: String,
        /// Range start: RFC 3339 or epoch seconds (default: one hour ago)
        #[arg(long)]
        from: Option<String>,
        /// Range end: RFC 3339 or epoch seconds (default: now)
        #[arg(long)]
        to: Option<String>,
    },

    /// Assemble frames for a query from rows in a CSV file
    Assemble {
        /// Query payload (JSON object)
        #[arg(short, long)]
        query: String,
        /// CSV file; header cells are NAME:TYPE, empty cells are NULL
        #[arg(short, long)]
        rows: PathBuf,
        /// Range start: RFC 3339 or epoch seconds (default: one hour ago)
        #[arg(long)]
        from: Option<String>,
        /// Range end: RFC 3339 or epoch seconds (default: now)
        #[arg(long)]
        to: Option<String>,
    },

    /// Decode a range-vector JSON document into frames
    Decode {
        /// Document path, or "-" for stdin
        #[arg(short, long)]
        payload: PathBuf,
        /// Legend template, e.g. "{{job}} on {{instance}}"
        #[arg(short, long, default_value = "")]
        legend: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Logging disabled: {}", e);
    }

    match cli.command {
        Commands::Translate { query, from, to } => {
            let window = parse_window(from.as_deref(), to.as_deref())?;
            let request = QueryRequest::from_json(&query, window, &config.engine)?;
            let plan = QueryPlan::build(&request, &config.engine)?;

            match cli.format.as_str() {
                "table" => println!("{}", plan),
                _ => println!("{}", plan.text),
            }
        }

        Commands::Assemble { query, rows, from, to } => {
            let window = parse_window(from.as_deref(), to.as_deref())?;
            let request = QueryRequest::from_json(&query, window, &config.engine)?;

            let runner = |_: &str, _: Option<usize>| -> Result<Box<dyn RowCursor>, ExecutionError> {
                let file = File::open(&rows)
                    .map_err(|e| ExecutionError::new(format!("cannot open {}: {}", rows.display(), e)))?;
                let cursor = MemoryCursor::from_csv(file).map_err(|e| ExecutionError::new(e.to_string()))?;
                Ok(Box::new(cursor))
            };

            let datasource = Datasource::new(config.engine.clone());
            let response = datasource.query(&request, &runner);
            if let Some(error) = response.error {
                bail!(error);
            }

            eprintln!(
                "{} rows, round trip {:?}, processing {:?}",
                response.stats.rows_processed, response.stats.round_trip, response.stats.processing
            );
            print_frames(&response.frames, &cli.format)?;
        }

        Commands::Decode { payload, legend } => {
            let document = read_input(&payload)?;
            let mut stats = ScanStats::default();
            let frames = decode_payload(&document, &legend, &mut stats)?;

            eprintln!("{} points", stats.rows_processed);
            print_frames(&frames, &cli.format)?;
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", content);
                }
            }
        }
    }

    Ok(())
}

/// Parse the query window; defaults to the last hour
fn parse_window(from: Option<&str>, to: Option<&str>) -> Result<TimeWindow> {
    let to = match to {
        Some(t) => parse_instant(t)?,
        None => Utc::now(),
    };
    let from = match from {
        Some(f) => parse_instant(f)?,
        None => to - Duration::hours(1),
    };
    Ok(TimeWindow::new(from, to)?)
}

fn parse_instant(token: &str) -> Result<DateTime<Utc>> {
    parse_time_token(token).with_context(|| format!("invalid time '{}'", token))
}

fn read_input(path: &Path) -> Result<String> {
    let mut content = String::new();
    if path == Path::new("-") {
        std::io::stdin().read_to_string(&mut content)?;
    } else {
        content = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    }
    Ok(content)
}

fn print_frames(frames: &[Frame], format: &str) -> Result<()> {
    match format {
        "table" => {
            if frames.is_empty() {
                println!("No frames.");
            }
            for frame in frames {
                println!("{}", frame);
            }
        }
        "json" => println!("{}", serde_json::to_string_pretty(frames)?),
        other => bail!("unknown output format '{}' (expected json or table)", other),
    }
    Ok(())
}
