//! Whole-job orchestration: validate, resolve, plan, execute, aggregate.
//!
//! Failures local to one format never abort siblings; callers always get a
//! `JobResult` unless the input itself is structurally invalid before any
//! task starts.

use crate::capability::{CapabilityCheck, CapabilityProbe};
use crate::config::{self, Overrides};
use crate::exec::{CancelFlag, EncodeBackend, EncodeExecutor, ExecOptions};
use crate::format::OutputFormat;
use crate::plan;
use crate::report::{aggregate, JobResult, TaskOutcome};
use crate::signals::{ContentSignals, SignalsError};
use chrono::Utc;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Errors that fail the whole job before any task executes. Everything
/// after this point is reported inside the `JobResult` instead.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("no output formats requested")]
    NoFormats,

    #[error("input file not readable: {path} ({source})")]
    InputNotReadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Signals(#[from] SignalsError),
}

/// One requested output format with its optional per-format knobs.
#[derive(Debug, Clone)]
pub struct FormatRequest {
    pub format: OutputFormat,
    /// Preset override for this format; falls back to the job preset.
    pub preset: Option<String>,
    pub overrides: Overrides,
}

impl FormatRequest {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            preset: None,
            overrides: Overrides::default(),
        }
    }
}

/// A full processing request: one input, several delivery formats.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    /// Short identifier for this job; generated when absent.
    pub job_id: Option<String>,
    /// Default quality preset name for all formats.
    pub preset: String,
    pub formats: Vec<FormatRequest>,
    pub signals: Option<ContentSignals>,
}

fn generate_job_id() -> String {
    // short ids keep output filenames readable
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Runs a job end to end and always returns a `JobResult` once execution
/// begins; a `partial` result is a normal outcome, not an error.
pub fn run_job<C: CapabilityCheck, B: EncodeBackend>(
    request: &JobRequest,
    probe: &CapabilityProbe<C>,
    backend: B,
    options: ExecOptions,
    cancel: CancelFlag,
) -> Result<JobResult, JobError> {
    if request.formats.is_empty() {
        return Err(JobError::NoFormats);
    }
    std::fs::metadata(&request.input_path).map_err(|e| JobError::InputNotReadable {
        path: request.input_path.clone(),
        source: e,
    })?;
    if let Some(signals) = &request.signals {
        signals.validate()?;
    }

    let job_id = request
        .job_id
        .clone()
        .unwrap_or_else(generate_job_id);
    let output_dir = request.output_dir.join(&job_id);
    std::fs::create_dir_all(&output_dir).map_err(|e| JobError::OutputDir {
        path: output_dir.clone(),
        source: e,
    })?;

    let started_at = Utc::now();
    info!(
        job_id = %job_id,
        input = %request.input_path.display(),
        formats = request.formats.len(),
        "starting encode job"
    );

    // Per-format resolution. A ConfigError is fatal only to that format's
    // planning; it becomes a failed outcome in place and siblings proceed.
    enum Slot {
        Planned(usize),
        ConfigFailed(TaskOutcome),
    }

    let mut slots = Vec::with_capacity(request.formats.len());
    let mut configs = Vec::new();
    for format_request in &request.formats {
        let preset_name = format_request
            .preset
            .as_deref()
            .unwrap_or(&request.preset);
        match config::resolve(
            format_request.format,
            preset_name,
            &format_request.overrides,
            request.signals.as_ref(),
        ) {
            Ok(resolved) => {
                slots.push(Slot::Planned(configs.len()));
                configs.push(resolved);
            }
            Err(e) => {
                warn!(
                    format = %format_request.format,
                    error = %e,
                    "configuration resolution failed, format skipped"
                );
                slots.push(Slot::ConfigFailed(TaskOutcome::failed(
                    format_request.format,
                    e.to_string(),
                )));
            }
        }
    }

    let capabilities = probe.probe();
    let tasks = plan::plan(
        &request.input_path,
        &output_dir,
        &job_id,
        configs,
        &capabilities,
    );

    let executor = EncodeExecutor::with_cancel_flag(backend, options, cancel);
    let executed = executor.execute_all(tasks);

    // Re-interleave executed outcomes with the resolution failures so the
    // report follows the caller's requested format order.
    let outcomes: Vec<TaskOutcome> = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Planned(index) => executed[index].clone(),
            Slot::ConfigFailed(outcome) => outcome,
        })
        .collect();

    let status = aggregate(&outcomes);
    let result = JobResult {
        job_id,
        input_path: request.input_path.clone(),
        status,
        started_at,
        finished_at: Utc::now(),
        outcomes,
    };
    info!(job_id = %result.job_id, status = ?result.status, "job finished");
    Ok(result)
}
