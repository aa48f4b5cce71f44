//! Per-task outcomes and whole-job result aggregation.
//!
//! A `partial` job is a first-class reportable state, not an error: per-task
//! detail is preserved regardless of the overall classification.

use crate::format::{AccelMode, OutputFormat};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Which chain entry actually produced the output. Callers need this to
/// know whether the hardware or software path was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChosenStrategy {
    pub encoder: String,
    pub accel: AccelMode,
    pub pass_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

/// Final report for one requested output format.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub format: OutputFormat,
    pub status: TaskStatus,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ChosenStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Last chain entry's diagnostic, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
}

impl TaskOutcome {
    pub fn succeeded(
        format: OutputFormat,
        strategy: ChosenStrategy,
        output_path: PathBuf,
    ) -> Self {
        Self {
            format,
            status: TaskStatus::Succeeded,
            strategy: Some(strategy),
            output_path: Some(output_path),
            failure_detail: None,
        }
    }

    pub fn failed(format: OutputFormat, detail: impl Into<String>) -> Self {
        Self {
            format,
            status: TaskStatus::Failed,
            strategy: None,
            output_path: None,
            failure_detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }
}

/// Overall job classification derived from task outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Complete,
    Partial,
    Failed,
}

/// Derives the overall status: all succeeded → complete, a mix → partial,
/// none succeeded → failed.
pub fn aggregate(outcomes: &[TaskOutcome]) -> JobStatus {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    if succeeded == outcomes.len() {
        JobStatus::Complete
    } else if succeeded > 0 {
        JobStatus::Partial
    } else {
        JobStatus::Failed
    }
}

/// One processing job's full report: ordered per-format outcomes plus the
/// aggregate status.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job_id: String,
    pub input_path: PathBuf,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<TaskOutcome>,
}
