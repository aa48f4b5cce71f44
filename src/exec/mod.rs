//! Task execution: chain walking, two-pass sequencing, timeouts, and
//! cancellation.
//!
//! The executor is generic over an [`EncodeBackend`], the single boundary to
//! the external codec engine. Production uses [`ffmpeg::FfmpegBackend`];
//! tests script [`mock::MockBackend`] so every orchestration path is
//! exercised without spawning a real encoder.

pub mod ffmpeg;
pub mod mock;

use crate::config::ResolvedConfig;
use crate::plan::{EncodeTask, PassMode, Strategy, TaskState};
use crate::report::{ChosenStrategy, TaskOutcome};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Job-level cancellation signal, shared across all running tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One concrete external encode operation.
#[derive(Debug)]
pub struct EncodeInvocation<'a> {
    pub input_path: &'a Path,
    pub output_path: &'a Path,
    pub config: &'a ResolvedConfig,
    pub strategy: &'a Strategy,
    /// `Some(1)` / `Some(2)` for two-pass entries, `None` for single-pass.
    pub pass: Option<u32>,
    /// Statistics artifact prefix, set for both passes of a two-pass entry.
    pub pass_log_prefix: Option<&'a Path>,
}

/// Completion classification of one external operation. Timeouts and
/// cancellation are separated from plain failure so the executor can stop
/// the chain on cancel but advance it on everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeStatus {
    Success,
    Failure { diagnostic: String },
    TimedOut,
    Cancelled,
}

/// Boundary to the external codec engine. Implementations must terminate
/// the underlying process when the deadline passes or the flag is set.
pub trait EncodeBackend: Send + Sync {
    fn run(
        &self,
        invocation: &EncodeInvocation<'_>,
        timeout: Duration,
        cancel: &CancelFlag,
    ) -> EncodeStatus;
}

/// Executor tuning.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Upper bound for a single external operation (one encode pass).
    pub timeout: Duration,
    /// Worker thread cap for `execute_all`.
    pub workers: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2 * 60 * 60),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(4),
        }
    }
}

/// Owns the two-pass statistics artifact directory for exactly one task.
/// Dropping it removes the artifact on every exit path, including
/// cancellation and unwind.
struct PassLog {
    dir: PathBuf,
}

impl PassLog {
    fn create(task: &EncodeTask) -> std::io::Result<Self> {
        let parent = task
            .output_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let dir = parent.join(format!(".vpress-pass-{}", task.id.simple()));
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn prefix(&self) -> PathBuf {
        self.dir.join("passlog")
    }
}

impl Drop for PassLog {
    fn drop(&mut self) {
        // Best effort: cleanup failure must never mask an encode result.
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), error = %e, "pass statistics cleanup failed");
            }
        }
    }
}

enum AttemptError {
    /// The entry failed; advance to the next chain entry.
    Failed(String),
    /// The job was cancelled; stop the chain entirely.
    Cancelled,
}

/// Runs encode tasks against a backend, advancing each task's fallback
/// chain on failure. A failed chain entry is never retried: the chain
/// exists for strategy fallback, not transient-fault retry.
pub struct EncodeExecutor<B: EncodeBackend> {
    backend: B,
    options: ExecOptions,
    cancel: CancelFlag,
}

impl<B: EncodeBackend> EncodeExecutor<B> {
    pub fn new(backend: B, options: ExecOptions) -> Self {
        Self {
            backend,
            options,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(backend: B, options: ExecOptions, cancel: CancelFlag) -> Self {
        Self {
            backend,
            options,
            cancel,
        }
    }

    /// Handle for signalling job-level cancellation from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Executes one task to completion, walking its fallback chain.
    pub fn execute(&self, mut task: EncodeTask) -> TaskOutcome {
        task.state = TaskState::Running;
        let mut last_failure = String::from("cancelled before any strategy was attempted");

        for strategy in &task.chain {
            if self.cancel.is_cancelled() {
                break;
            }

            debug!(
                format = %task.format,
                encoder = strategy.encoder,
                accel = %strategy.accel,
                "attempting chain entry"
            );

            match self.try_strategy(&task, strategy) {
                Ok(()) => {
                    task.state = TaskState::Succeeded;
                    info!(
                        format = %task.format,
                        encoder = strategy.encoder,
                        accel = %strategy.accel,
                        output = %task.output_path.display(),
                        "encode succeeded"
                    );
                    return TaskOutcome::succeeded(
                        task.format,
                        ChosenStrategy {
                            encoder: strategy.encoder.to_string(),
                            accel: strategy.accel,
                            pass_count: strategy.pass_mode.pass_count(),
                        },
                        task.output_path.clone(),
                    );
                }
                Err(AttemptError::Cancelled) => {
                    last_failure = "cancelled".to_string();
                    self.remove_partial_output(&task);
                    break;
                }
                Err(AttemptError::Failed(detail)) => {
                    warn!(
                        format = %task.format,
                        encoder = strategy.encoder,
                        detail = %detail,
                        "chain entry failed, advancing"
                    );
                    self.remove_partial_output(&task);
                    last_failure = detail;
                }
            }
        }

        task.state = TaskState::Failed;
        TaskOutcome::failed(task.format, last_failure)
    }

    /// Executes tasks on a bounded worker pool, preserving input order in
    /// the returned outcomes. Tasks are independent; no ordering holds
    /// between different tasks' external operations.
    pub fn execute_all(&self, tasks: Vec<EncodeTask>) -> Vec<TaskOutcome> {
        let count = tasks.len();
        if count == 0 {
            return Vec::new();
        }

        let slots: Vec<Mutex<Option<EncodeTask>>> =
            tasks.into_iter().map(|t| Mutex::new(Some(t))).collect();
        let outcomes: Vec<Mutex<Option<TaskOutcome>>> =
            (0..count).map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);
        let workers = self.options.workers.clamp(1, count);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        if index >= count {
                            break;
                        }
                        let task = slots[index].lock().unwrap().take();
                        if let Some(task) = task {
                            let outcome = self.execute(task);
                            *outcomes[index].lock().unwrap() = Some(outcome);
                        }
                    }
                });
            }
        });

        outcomes
            .into_iter()
            .map(|slot| {
                slot.into_inner()
                    .unwrap()
                    .expect("executor fills every outcome slot")
            })
            .collect()
    }

    fn try_strategy(&self, task: &EncodeTask, strategy: &Strategy) -> Result<(), AttemptError> {
        match strategy.pass_mode {
            PassMode::Single => self.run_pass(task, strategy, None, None),
            PassMode::TwoPass => {
                let pass_log = PassLog::create(task).map_err(|e| {
                    AttemptError::Failed(format!("failed to create pass statistics dir: {e}"))
                })?;
                let prefix = pass_log.prefix();
                self.run_pass(task, strategy, Some(1), Some(&prefix))?;
                self.run_pass(task, strategy, Some(2), Some(&prefix))?;
                Ok(())
                // pass_log drops here: artifact removed after completion;
                // the ? paths above drop it on failure too
            }
        }
    }

    fn run_pass(
        &self,
        task: &EncodeTask,
        strategy: &Strategy,
        pass: Option<u32>,
        pass_log_prefix: Option<&Path>,
    ) -> Result<(), AttemptError> {
        let invocation = EncodeInvocation {
            input_path: &task.input_path,
            output_path: &task.output_path,
            config: &task.config,
            strategy,
            pass,
            pass_log_prefix,
        };

        match self.backend.run(&invocation, self.options.timeout, &self.cancel) {
            EncodeStatus::Success => {
                // Pass 1 writes to the null sink; every other success must
                // have produced the output file.
                if pass != Some(1) && !task.output_path.exists() {
                    Err(AttemptError::Failed("output file not created".to_string()))
                } else {
                    Ok(())
                }
            }
            EncodeStatus::Failure { diagnostic } => Err(AttemptError::Failed(diagnostic)),
            EncodeStatus::TimedOut => Err(AttemptError::Failed(format!(
                "timed out after {}s",
                self.options.timeout.as_secs()
            ))),
            EncodeStatus::Cancelled => Err(AttemptError::Cancelled),
        }
    }

    fn remove_partial_output(&self, task: &EncodeTask) {
        if task.output_path.exists() {
            if let Err(e) = std::fs::remove_file(&task.output_path) {
                warn!(
                    output = %task.output_path.display(),
                    error = %e,
                    "failed to remove partial output"
                );
            }
        }
    }
}
