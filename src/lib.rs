//! Adaptive multi-format video encoding orchestration.
//!
//! `vpress` turns a requested set of delivery formats plus externally
//! computed content signals into concrete encode tasks, executes them
//! against ffmpeg with hardware-capability fallback, and reports one
//! structured per-format job result.
//!
//! ## Usage example
//!
//! ```rust,no_run
//! use vpress::{
//!     CancelFlag, CapabilityProbe, ExecOptions, FfmpegBackend,
//!     FfmpegCapabilityCheck, FormatRequest, JobRequest, OutputFormat, run_job,
//! };
//! use std::path::PathBuf;
//!
//! let request = JobRequest {
//!     input_path: PathBuf::from("input.mkv"),
//!     output_dir: PathBuf::from("out"),
//!     job_id: None,
//!     preset: "high".to_string(),
//!     formats: vec![
//!         FormatRequest::new(OutputFormat::HevcMp4),
//!         FormatRequest::new(OutputFormat::Av1Webm),
//!     ],
//!     signals: None,
//! };
//!
//! let probe = CapabilityProbe::new(FfmpegCapabilityCheck::new("ffmpeg"));
//! let result = run_job(
//!     &request,
//!     &probe,
//!     FfmpegBackend::default(),
//!     ExecOptions::default(),
//!     CancelFlag::new(),
//! )
//! .unwrap();
//! println!("{:?}", result.status);
//! ```

pub mod capability;
pub mod config;
pub mod exec;
pub mod format;
pub mod job;
pub mod plan;
pub mod report;
pub mod signals;

// Re-exports for the public API surface
pub use capability::{
    Availability, CapabilityCheck, CapabilityProbe, CapabilitySet, FfmpegCapabilityCheck,
};
pub use config::{resolve, ConfigError, Overrides, PresetTier, QualityPreset, ResolvedConfig};
pub use exec::ffmpeg::FfmpegBackend;
pub use exec::{CancelFlag, EncodeBackend, EncodeExecutor, EncodeInvocation, EncodeStatus, ExecOptions};
pub use format::{AccelMode, Codec, Container, OutputFormat};
pub use job::{run_job, FormatRequest, JobError, JobRequest};
pub use plan::{plan, EncodeTask, PassMode, Strategy, TaskState};
pub use report::{aggregate, ChosenStrategy, JobResult, JobStatus, TaskOutcome, TaskStatus};
pub use signals::{ContentSignals, SignalsError};
