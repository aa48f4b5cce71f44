//! Encoder capability probing.
//!
//! Probes which (codec, acceleration mode) pairs the local ffmpeg install
//! can actually drive, and memoizes the answer for the life of the process.
//! Probe results deliberately fail closed: an inconclusive check counts as
//! unavailable so the planner never assumes hardware acceleration silently.

use crate::format::{AccelMode, Codec};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Classification of a single capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
    /// The check could not produce a definitive answer (ffmpeg missing,
    /// check crashed, output unparseable). Treated as unavailable.
    Unknown,
}

/// External confirmation operation for one (codec, acceleration mode) pair.
///
/// Implemented by [`FfmpegCapabilityCheck`] in production and by scripted
/// fakes in tests, so probe/planner behavior is testable without ffmpeg.
pub trait CapabilityCheck: Send + Sync {
    fn check(&self, codec: Codec, mode: AccelMode) -> Availability;
}

/// Set of (codec, acceleration mode) pairs confirmed available.
/// Read-only once handed out; the probe hands out clones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    entries: BTreeSet<(Codec, AccelMode)>,
}

impl CapabilitySet {
    pub fn insert(&mut self, codec: Codec, mode: AccelMode) {
        self.entries.insert((codec, mode));
    }

    pub fn supports(&self, codec: Codec, mode: AccelMode) -> bool {
        self.entries.contains(&(codec, mode))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Codec, AccelMode)> + '_ {
        self.entries.iter().copied()
    }
}

/// Process-lifetime capability cache with single-flight probing.
///
/// The cache lock is held for the whole first probe, so concurrent first
/// callers block on the same probe instead of racing their own; later calls
/// are a clone of the memo. `invalidate` clears the memo (tests, or after
/// an external environment change such as a driver install).
pub struct CapabilityProbe<C: CapabilityCheck> {
    check: C,
    cache: Mutex<Option<CapabilitySet>>,
}

impl<C: CapabilityCheck> CapabilityProbe<C> {
    pub fn new(check: C) -> Self {
        Self {
            check,
            cache: Mutex::new(None),
        }
    }

    /// Returns the memoized capability set, probing on first use.
    pub fn probe(&self) -> CapabilitySet {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(set) = cache.as_ref() {
            return set.clone();
        }

        let mut set = CapabilitySet::default();
        for codec in Codec::ALL {
            for mode in [AccelMode::Hardware, AccelMode::Software] {
                match self.check.check(codec, mode) {
                    Availability::Available => {
                        debug!(%codec, %mode, "capability confirmed");
                        set.insert(codec, mode);
                    }
                    Availability::Unavailable => {
                        debug!(%codec, %mode, "capability unavailable");
                    }
                    Availability::Unknown => {
                        warn!(%codec, %mode, "capability check inconclusive, treating as unavailable");
                    }
                }
            }
        }

        *cache = Some(set.clone());
        set
    }

    /// Clears the memo so the next `probe` re-runs the external checks.
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = None;
    }
}

/// Production capability check driving the local ffmpeg binary.
///
/// Software encoders are confirmed by their presence in `ffmpeg -encoders`
/// output (cached across checks). Hardware encoders must additionally pass
/// a one-frame test encode from a generated source to the null muxer, since
/// a listed hardware encoder still fails without a usable device.
pub struct FfmpegCapabilityCheck {
    ffmpeg_path: PathBuf,
    encoders_output: Mutex<Option<Option<String>>>,
}

impl FfmpegCapabilityCheck {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            encoders_output: Mutex::new(None),
        }
    }

    /// `ffmpeg -encoders` output, fetched once. `None` if ffmpeg itself is
    /// missing or failed to run.
    fn encoders_output(&self) -> Option<String> {
        let mut cached = self
            .encoders_output
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(output) = cached.as_ref() {
            return output.clone();
        }

        let result = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        let output = match result {
            Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            Ok(out) => {
                warn!(status = %out.status, "ffmpeg -encoders exited non-zero");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to run ffmpeg -encoders");
                None
            }
        };

        *cached = Some(output.clone());
        output
    }

    fn encoder_listed(&self, encoder: &str) -> Availability {
        match self.encoders_output() {
            Some(listing) => {
                // Each listing line is " V....D <name>  <description>"
                let listed = listing
                    .lines()
                    .any(|line| line.split_whitespace().nth(1) == Some(encoder));
                if listed {
                    Availability::Available
                } else {
                    Availability::Unavailable
                }
            }
            None => Availability::Unknown,
        }
    }

    /// One-frame encode from a synthetic source to the null muxer. Fast and
    /// side-effect free; exercises device setup for hardware encoders.
    fn test_encode(&self, codec: Codec) -> Availability {
        let encoder = codec.hardware_encoder();
        let result = Command::new(&self.ffmpeg_path)
            .args([
                "-hide_banner",
                "-nostdin",
                "-init_hw_device",
                "vaapi=dev:/dev/dri/renderD128",
                "-filter_hw_device",
                "dev",
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=0.1:size=320x240:rate=10",
                "-vf",
                "format=nv12,hwupload",
                "-c:v",
                encoder,
                "-frames:v",
                "1",
                "-f",
                "null",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            Ok(status) if status.success() => Availability::Available,
            Ok(_) => Availability::Unavailable,
            Err(e) => {
                warn!(encoder, error = %e, "hardware test encode failed to start");
                Availability::Unknown
            }
        }
    }
}

impl CapabilityCheck for FfmpegCapabilityCheck {
    fn check(&self, codec: Codec, mode: AccelMode) -> Availability {
        match mode {
            AccelMode::Software => self.encoder_listed(codec.software_encoder()),
            AccelMode::Hardware => match self.encoder_listed(codec.hardware_encoder()) {
                Availability::Available => self.test_encode(codec),
                not_listed => not_listed,
            },
        }
    }
}
