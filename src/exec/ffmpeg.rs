//! Production encode backend driving the ffmpeg binary.
//!
//! Builds one argv per chain entry and pass, then runs it under a poll loop
//! that enforces the operation timeout and the job cancellation flag by
//! killing the child process.

use super::{CancelFlag, EncodeBackend, EncodeInvocation, EncodeStatus};
use crate::format::{AccelMode, Container};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// How many trailing stderr lines to keep for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// x264/x265 preset names indexed by speed effort (0 = slowest).
const X26X_PRESETS: [&str; 9] = [
    "veryslow", "slower", "slow", "medium", "fast", "faster", "veryfast", "superfast", "ultrafast",
];

fn null_output_target() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}

pub struct FfmpegBackend {
    ffmpeg_path: String,
    vaapi_device: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegBackend {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            vaapi_device: "/dev/dri/renderD128".to_string(),
        }
    }

    pub fn with_vaapi_device(mut self, device: impl Into<String>) -> Self {
        self.vaapi_device = device.into();
        self
    }

    /// Builds the full ffmpeg argv for one invocation. Public so the `plan`
    /// dry-run can preview commands without executing them.
    pub fn build_args(&self, invocation: &EncodeInvocation<'_>) -> Vec<String> {
        let config = invocation.config;
        let strategy = invocation.strategy;
        let codec = config.format.codec();
        let hardware = strategy.accel == AccelMode::Hardware;
        let analysis_pass = invocation.pass == Some(1);

        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
        ];

        // Device setup must precede the input for hwaccel flags to apply.
        if hardware {
            args.push("-init_hw_device".into());
            args.push(format!("vaapi=dev:{}", self.vaapi_device));
            args.push("-filter_hw_device".into());
            args.push("dev".into());
        }

        args.push("-i".into());
        args.push(invocation.input_path.display().to_string());

        let mut filters: Vec<String> = Vec::new();
        if config.spherical {
            // 360°-aware path: run frames through v360 so projection
            // metadata survives the transcode untouched.
            filters.push("v360=input=equirect:output=equirect".into());
        }
        if hardware {
            filters.push("format=nv12".into());
            filters.push("hwupload".into());
        }
        if !filters.is_empty() {
            args.push("-vf".into());
            args.push(filters.join(","));
        }

        args.push("-c:v".into());
        args.push(strategy.encoder.to_string());

        if hardware {
            args.push("-qp".into());
            args.push(config.crf.to_string());
        } else {
            match strategy.encoder {
                "libx264" | "libx265" => {
                    args.push("-crf".into());
                    args.push(config.crf.to_string());
                    args.push("-preset".into());
                    args.push(X26X_PRESETS[config.speed_effort as usize].into());
                }
                "libvpx-vp9" => {
                    args.push("-crf".into());
                    args.push(config.crf.to_string());
                    args.push("-b:v".into());
                    args.push("0".into());
                    args.push("-cpu-used".into());
                    args.push(config.speed_effort.to_string());
                    args.push("-row-mt".into());
                    args.push("1".into());
                }
                "libsvtav1" => {
                    args.push("-crf".into());
                    args.push(config.crf.to_string());
                    args.push("-preset".into());
                    args.push(config.speed_effort.to_string());
                }
                other => {
                    // Unknown software encoder: CRF is the safest common knob
                    debug!(encoder = other, "no dedicated arg mapping, using -crf only");
                    args.push("-crf".into());
                    args.push(config.crf.to_string());
                }
            }
        }

        let maxrate = (codec.base_maxrate_kbps() as f64 * config.bitrate_multiplier).round() as u32;
        args.push("-maxrate".into());
        args.push(format!("{maxrate}k"));
        args.push("-bufsize".into());
        args.push(format!("{}k", maxrate * 2));

        args.push("-force_key_frames".into());
        args.push(format!(
            "expr:gte(t,n_forced*{})",
            config.keyframe_interval_s
        ));

        if let Some(pass) = invocation.pass {
            args.push("-pass".into());
            args.push(pass.to_string());
            if let Some(prefix) = invocation.pass_log_prefix {
                args.push("-passlogfile".into());
                args.push(prefix.display().to_string());
            }
        }

        if analysis_pass {
            args.push("-an".into());
        } else {
            match config.format.container() {
                Container::Mp4 => {
                    args.push("-c:a".into());
                    args.push("aac".into());
                }
                Container::Webm => {
                    args.push("-c:a".into());
                    args.push("libopus".into());
                }
            }
            args.push("-b:a".into());
            args.push("128k".into());
        }

        args.extend(config.extra_args.iter().cloned());

        if analysis_pass {
            args.push("-f".into());
            args.push("null".into());
            args.push(null_output_target().into());
        } else {
            args.push("-f".into());
            args.push(config.format.container().muxer().to_string());
            args.push(invocation.output_path.display().to_string());
        }

        args
    }
}

impl EncodeBackend for FfmpegBackend {
    fn run(
        &self,
        invocation: &EncodeInvocation<'_>,
        timeout: Duration,
        cancel: &CancelFlag,
    ) -> EncodeStatus {
        let args = self.build_args(invocation);
        debug!(command = %format!("{} {}", self.ffmpeg_path, args.join(" ")), "spawning encoder");

        let mut child = match Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return EncodeStatus::Failure {
                    diagnostic: format!("failed to start {}: {e}", self.ffmpeg_path),
                };
            }
        };

        // Drain stderr on a separate thread, keeping only the tail: the
        // last lines carry the actual error when ffmpeg dies.
        let tail: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let mut reader_handle = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&tail);
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    let mut tail = tail.lock().unwrap();
                    if tail.len() >= STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            })
        });

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if let Some(handle) = reader_handle.take() {
                        let _ = handle.join();
                    }
                    if status.success() {
                        return EncodeStatus::Success;
                    }
                    let tail_text: Vec<String> =
                        tail.lock().unwrap().iter().cloned().collect();
                    return EncodeStatus::Failure {
                        diagnostic: format!(
                            "ffmpeg exited with {status}:\n{}",
                            tail_text.join("\n")
                        ),
                    };
                }
                Ok(None) => {
                    if cancel.is_cancelled() {
                        let _ = child.kill();
                        let _ = child.wait();
                        if let Some(handle) = reader_handle.take() {
                            let _ = handle.join();
                        }
                        return EncodeStatus::Cancelled;
                    }
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        if let Some(handle) = reader_handle.take() {
                            let _ = handle.join();
                        }
                        return EncodeStatus::TimedOut;
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return EncodeStatus::Failure {
                        diagnostic: format!("failed to wait on ffmpeg: {e}"),
                    };
                }
            }
        }
    }
}
