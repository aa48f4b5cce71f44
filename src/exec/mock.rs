//! Scriptable in-process stand-in for the external encoder.
//!
//! Tests queue responses per encoder name; unscripted calls succeed. Every
//! call is recorded so tests can assert on pass ordering, fallback
//! advancement, and artifact lifetimes without spawning a real process.

use super::{CancelFlag, EncodeBackend, EncodeInvocation, EncodeStatus};
use crate::format::AccelMode;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted response for one invocation.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Succeed,
    /// Succeed without producing the output file (simulates an encoder that
    /// exits zero but never wrote the target).
    SucceedWithoutOutput,
    Fail(String),
    TimeOut,
    /// Sets the job-level cancel flag and reports the process as killed.
    Cancel,
}

/// Recorded invocation.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub encoder: String,
    pub accel: AccelMode,
    pub pass: Option<u32>,
    pub pass_log_prefix: Option<PathBuf>,
    /// Whether the pass-1 statistics artifact existed when this call ran.
    pub artifact_present: bool,
    pub output_path: PathBuf,
}

#[derive(Default)]
pub struct MockBackend {
    responses: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next invocation of `encoder`. Responses
    /// are consumed in order; once the queue is empty, calls succeed.
    pub fn script(&self, encoder: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry(encoder.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn artifact_file(prefix: &std::path::Path) -> PathBuf {
    // ffmpeg writes "<prefix>-0.log"
    let mut name = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "passlog".to_string());
    name.push_str("-0.log");
    prefix.with_file_name(name)
}

impl EncodeBackend for MockBackend {
    fn run(
        &self,
        invocation: &EncodeInvocation<'_>,
        _timeout: Duration,
        cancel: &CancelFlag,
    ) -> EncodeStatus {
        let artifact_present = invocation
            .pass_log_prefix
            .map(|prefix| artifact_file(prefix).exists())
            .unwrap_or(false);

        self.calls.lock().unwrap().push(MockCall {
            encoder: invocation.strategy.encoder.to_string(),
            accel: invocation.strategy.accel,
            pass: invocation.pass,
            pass_log_prefix: invocation.pass_log_prefix.map(PathBuf::from),
            artifact_present,
            output_path: invocation.output_path.to_path_buf(),
        });

        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(invocation.strategy.encoder)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(MockResponse::Succeed);

        match response {
            MockResponse::Succeed => {
                let write_result = if invocation.pass == Some(1) {
                    match invocation.pass_log_prefix {
                        Some(prefix) => std::fs::write(artifact_file(prefix), b"mock stats"),
                        None => Ok(()),
                    }
                } else {
                    std::fs::write(invocation.output_path, b"mock output")
                };
                match write_result {
                    Ok(()) => EncodeStatus::Success,
                    Err(e) => EncodeStatus::Failure {
                        diagnostic: format!("mock backend write failed: {e}"),
                    },
                }
            }
            MockResponse::SucceedWithoutOutput => EncodeStatus::Success,
            MockResponse::Fail(diagnostic) => EncodeStatus::Failure { diagnostic },
            MockResponse::TimeOut => EncodeStatus::TimedOut,
            MockResponse::Cancel => {
                cancel.cancel();
                EncodeStatus::Cancelled
            }
        }
    }
}
