mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use vpress::{
    run_job, CancelFlag, CapabilityProbe, ContentSignals, EncodeInvocation, ExecOptions,
    FfmpegBackend, FfmpegCapabilityCheck, FormatRequest, JobStatus, OutputFormat, Overrides,
};

use cli::{Cli, Commands};

/// Overrides file layout: global knobs at the top level plus optional
/// per-format tables keyed by format name.
#[derive(Debug, Default, Deserialize)]
struct OverridesFile {
    #[serde(flatten)]
    global: Overrides,
    #[serde(default)]
    per_format: HashMap<String, Overrides>,
}

impl OverridesFile {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read overrides file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse overrides file {}", path.display()))
    }

    /// Per-format overrides where present, otherwise the global table.
    fn for_format(&self, format: OutputFormat) -> Overrides {
        self.per_format
            .get(format.name())
            .cloned()
            .unwrap_or_else(|| self.global.clone())
    }
}

fn load_signals(path: Option<&PathBuf>) -> Result<Option<ContentSignals>> {
    match path {
        Some(path) => {
            let signals = ContentSignals::from_json_file(path)
                .with_context(|| format!("failed to load signals from {}", path.display()))?;
            Ok(Some(signals))
        }
        None => Ok(None),
    }
}

fn build_requests(
    formats: &[OutputFormat],
    overrides: Option<&PathBuf>,
) -> Result<Vec<FormatRequest>> {
    let overrides_file = match overrides {
        Some(path) => OverridesFile::load(path)?,
        None => OverridesFile::default(),
    };
    Ok(formats
        .iter()
        .map(|&format| FormatRequest {
            format,
            preset: None,
            overrides: overrides_file.for_format(format),
        })
        .collect())
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let probe = CapabilityProbe::new(FfmpegCapabilityCheck::new("ffmpeg"));

    match cli.command {
        Commands::Encode {
            input,
            formats,
            preset,
            overrides,
            signals,
            output_dir,
            job_id,
            workers,
            timeout_secs,
            json,
        } => {
            let request = vpress::JobRequest {
                input_path: input,
                output_dir,
                job_id,
                preset,
                formats: build_requests(&formats, overrides.as_ref())?,
                signals: load_signals(signals.as_ref())?,
            };

            let mut options = ExecOptions::default();
            if let Some(workers) = workers {
                options.workers = workers.max(1);
            }
            if let Some(secs) = timeout_secs {
                options.timeout = Duration::from_secs(secs);
            }

            let result = run_job(
                &request,
                &probe,
                FfmpegBackend::default(),
                options,
                CancelFlag::new(),
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Job {} [{:?}]", result.job_id, result.status);
                for outcome in &result.outcomes {
                    match (&outcome.strategy, &outcome.output_path) {
                        (Some(strategy), Some(path)) => println!(
                            "  ✓ {:10} {} ({} pass{}) -> {}",
                            outcome.format.name(),
                            strategy.accel,
                            strategy.pass_count,
                            if strategy.pass_count == 1 { "" } else { "es" },
                            path.display()
                        ),
                        _ => println!(
                            "  ✗ {:10} {}",
                            outcome.format.name(),
                            outcome.failure_detail.as_deref().unwrap_or("unknown failure")
                        ),
                    }
                }
            }

            Ok(match result.status {
                JobStatus::Complete => ExitCode::SUCCESS,
                JobStatus::Partial => ExitCode::from(2),
                JobStatus::Failed => ExitCode::FAILURE,
            })
        }

        Commands::Plan {
            input,
            formats,
            preset,
            overrides,
            signals,
        } => {
            let signals = load_signals(signals.as_ref())?;
            let requests = build_requests(&formats, overrides.as_ref())?;
            let capabilities = probe.probe();
            let backend = FfmpegBackend::default();

            let mut configs = Vec::new();
            for request in &requests {
                match vpress::resolve(
                    request.format,
                    &preset,
                    &request.overrides,
                    signals.as_ref(),
                ) {
                    Ok(config) => configs.push(config),
                    Err(e) => println!("✗ {:10} {e}", request.format.name()),
                }
            }

            let tasks = vpress::plan(&input, Path::new("out"), "preview1", configs, &capabilities);
            for task in &tasks {
                println!("{} ({} chain entries):", task.format.name(), task.chain.len());
                for strategy in &task.chain {
                    let invocation = EncodeInvocation {
                        input_path: &task.input_path,
                        output_path: &task.output_path,
                        config: &task.config,
                        strategy,
                        pass: None,
                        pass_log_prefix: None,
                    };
                    println!(
                        "  [{} {:?}] ffmpeg {}",
                        strategy.accel,
                        strategy.pass_mode,
                        backend.build_args(&invocation).join(" ")
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Capabilities { json } => {
            let capabilities = probe.probe();
            if json {
                println!("{}", serde_json::to_string_pretty(&capabilities)?);
            } else if capabilities.is_empty() {
                println!("No encoder capabilities detected (is ffmpeg installed?)");
            } else {
                for (codec, mode) in capabilities.iter() {
                    println!("{codec:5} {mode}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
