//! tempo-worker - Subprocess host for timeline analysis requests.
//!
//! Spawned by a frontend so heavy analysis runs outside its UI thread and
//! memory space. One request per process: the worker reads a JSON
//! `AnalysisRequest`, streams progress lines, then writes a single result (or
//! error) line and exits. Abandoning a request means killing the process.
//!
//! Usage: tempo-worker [--input <file>] [--config <file>] [--definitions <file>]
//!
//! Output: newline-delimited JSON `WorkerMessage`s on stdout. Logs go to stderr.

mod logging;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tempo_core::{
    AnalysisRequest, AnalysisResponse, ConfigError, DefinitionError, DefinitionSet, EngineConfig,
    EngineError, run_request,
};
use thiserror::Error;

/// Smallest progress step worth a line on stdout.
const PROGRESS_STEP: f32 = 0.01;

#[derive(Parser)]
#[command(version, about = "Combat timeline analysis worker")]
struct Args {
    /// Read the request from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Engine config file (defaults to the stored tempo config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stack family and metric definitions (TOML)
    #[arg(short, long)]
    definitions: Option<PathBuf>,
}

/// One line of output to the host process.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WorkerMessage {
    Progress {
        value: f32,
    },
    Result {
        response: AnalysisResponse,
        /// Wall time spent in the engine
        elapsed_ms: u64,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Error)]
enum WorkerError {
    #[error("failed to read request from {path}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read request from stdin")]
    ReadStdin(#[source] io::Error),

    #[error("malformed request")]
    ParseRequest(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Definitions(#[from] DefinitionError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl WorkerError {
    /// Error text including every source in the chain.
    fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match run(&args, &mut out) {
        Ok((response, elapsed_ms)) => {
            emit(&mut out, &WorkerMessage::Result {
                response,
                elapsed_ms,
            });
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e.report(), "Request failed");
            emit(&mut out, &WorkerMessage::Error {
                message: e.report(),
            });
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, out: &mut impl Write) -> Result<(AnalysisResponse, u64), WorkerError> {
    let config = match &args.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load(),
    };

    let definitions_path = args
        .definitions
        .clone()
        .or_else(|| config.definitions_path.clone());
    let definitions = definitions_path
        .as_deref()
        .map(DefinitionSet::load)
        .transpose()?;

    let raw = read_request(args.input.as_deref())?;
    let timer = Instant::now();
    let response = execute(&raw, &config, definitions.as_ref(), out)?;
    Ok((response, timer.elapsed().as_millis() as u64))
}

fn read_request(input: Option<&Path>) -> Result<String, WorkerError> {
    match input {
        Some(path) => fs::read_to_string(path).map_err(|source| WorkerError::ReadInput {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .map_err(WorkerError::ReadStdin)?;
            Ok(raw)
        }
    }
}

/// Parse and run one request, writing throttled progress lines to `out`.
fn execute(
    raw: &str,
    config: &EngineConfig,
    definitions: Option<&DefinitionSet>,
    out: &mut impl Write,
) -> Result<AnalysisResponse, WorkerError> {
    let request: AnalysisRequest = serde_json::from_str(raw)?;
    tracing::debug!(
        effect_events = request.batch.effect_events.len(),
        damage_events = request.batch.damage_events.len(),
        "Request received"
    );

    let mut last_emitted: Option<f32> = None;
    let mut on_progress = |value: f32| {
        let due = value >= 1.0 || last_emitted.is_none_or(|last| value - last >= PROGRESS_STEP);
        if due {
            last_emitted = Some(value);
            emit(&mut *out, &WorkerMessage::Progress { value });
        }
    };

    Ok(run_request(&request, config, definitions, Some(&mut on_progress))?)
}

/// Write one message as a JSON line. A closed stdout means the host is gone,
/// so write failures are only logged.
fn emit(out: &mut impl Write, message: &WorkerMessage) {
    let written = serde_json::to_string(message)
        .map_err(io::Error::other)
        .and_then(|json| writeln!(out, "{json}"))
        .and_then(|()| out.flush());
    if let Err(e) = written {
        tracing::warn!(error = %e, "Failed to write worker message");
    }
}
