//! Codec, container, and output-format vocabulary shared by the whole crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Codec families the orchestrator can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    H264,
    Hevc,
    Vp9,
    Av1,
}

impl Codec {
    pub const ALL: [Codec; 4] = [Codec::H264, Codec::Hevc, Codec::Vp9, Codec::Av1];

    /// FFmpeg encoder name for the software path.
    pub fn software_encoder(&self) -> &'static str {
        match self {
            Codec::H264 => "libx264",
            Codec::Hevc => "libx265",
            Codec::Vp9 => "libvpx-vp9",
            Codec::Av1 => "libsvtav1",
        }
    }

    /// FFmpeg encoder name for the hardware-accelerated (VAAPI) path.
    pub fn hardware_encoder(&self) -> &'static str {
        match self {
            Codec::H264 => "h264_vaapi",
            Codec::Hevc => "hevc_vaapi",
            Codec::Vp9 => "vp9_vaapi",
            Codec::Av1 => "av1_vaapi",
        }
    }

    /// Valid CRF/quantizer range for this codec family.
    pub fn crf_range(&self) -> RangeInclusive<u32> {
        match self {
            Codec::H264 | Codec::Hevc => 0..=51,
            Codec::Vp9 | Codec::Av1 => 0..=63,
        }
    }

    /// Whether the software encoder for this codec supports two-pass encoding.
    /// Hardware paths are always single-pass regardless of this flag.
    pub fn supports_two_pass(&self) -> bool {
        // x264, x265, libvpx-vp9 and SVT-AV1 all accept -pass 1/2
        true
    }

    /// Baseline constrained-quality ceiling in kbit/s, scaled by the
    /// resolved bitrate multiplier when building commands.
    pub fn base_maxrate_kbps(&self) -> u32 {
        match self {
            Codec::H264 => 8000,
            Codec::Hevc => 5000,
            Codec::Vp9 => 4500,
            Codec::Av1 => 4000,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::H264 => write!(f, "h264"),
            Codec::Hevc => write!(f, "hevc"),
            Codec::Vp9 => write!(f, "vp9"),
            Codec::Av1 => write!(f, "av1"),
        }
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
        }
    }

    /// FFmpeg muxer name.
    pub fn muxer(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
        }
    }
}

/// One requested delivery format: a (codec, container) pairing.
///
/// `Av1Webm` and `Av1Mp4` exist separately so that the same codec wrapped in
/// two containers always yields two fully independent encode tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    H264Mp4,
    HevcMp4,
    Vp9Webm,
    Av1Webm,
    Av1Mp4,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::H264Mp4,
        OutputFormat::HevcMp4,
        OutputFormat::Vp9Webm,
        OutputFormat::Av1Webm,
        OutputFormat::Av1Mp4,
    ];

    pub fn codec(&self) -> Codec {
        match self {
            OutputFormat::H264Mp4 => Codec::H264,
            OutputFormat::HevcMp4 => Codec::Hevc,
            OutputFormat::Vp9Webm => Codec::Vp9,
            OutputFormat::Av1Webm | OutputFormat::Av1Mp4 => Codec::Av1,
        }
    }

    pub fn container(&self) -> Container {
        match self {
            OutputFormat::H264Mp4 | OutputFormat::HevcMp4 | OutputFormat::Av1Mp4 => Container::Mp4,
            OutputFormat::Vp9Webm | OutputFormat::Av1Webm => Container::Webm,
        }
    }

    /// Stable name used in CLI arguments, reports, and output filenames.
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::H264Mp4 => "h264",
            OutputFormat::HevcMp4 => "hevc",
            OutputFormat::Vp9Webm => "vp9",
            OutputFormat::Av1Webm => "av1_webm",
            OutputFormat::Av1Mp4 => "av1_mp4",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h264" | "h264_mp4" => Ok(OutputFormat::H264Mp4),
            "hevc" | "hevc_mp4" | "h265" => Ok(OutputFormat::HevcMp4),
            "vp9" | "vp9_webm" => Ok(OutputFormat::Vp9Webm),
            "av1" | "av1_webm" => Ok(OutputFormat::Av1Webm),
            "av1_mp4" => Ok(OutputFormat::Av1Mp4),
            other => Err(format!(
                "unknown output format '{other}' (expected one of: h264, hevc, vp9, av1_webm, av1_mp4)"
            )),
        }
    }
}

/// Hardware-assisted vs software-only execution of a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccelMode {
    Hardware,
    Software,
}

impl fmt::Display for AccelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccelMode::Hardware => write!(f, "hardware"),
            AccelMode::Software => write!(f, "software"),
        }
    }
}
