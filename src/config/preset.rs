//! Built-in quality preset tiers.
//!
//! These are the first (lowest-precedence) layer of configuration
//! resolution. The CRF values here are baselines; resolution clamps them
//! into the target codec's valid range.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetTier {
    Low,
    Medium,
    High,
    Ultra,
}

impl PresetTier {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "low" => Some(PresetTier::Low),
            "medium" => Some(PresetTier::Medium),
            "high" => Some(PresetTier::High),
            "ultra" => Some(PresetTier::Ultra),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PresetTier::Low => "low",
            PresetTier::Medium => "medium",
            PresetTier::High => "high",
            PresetTier::Ultra => "ultra",
        }
    }
}

impl fmt::Display for PresetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Immutable knob table for one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityPreset {
    pub tier: PresetTier,
    /// Baseline CRF/quantizer; lower is higher quality.
    pub crf: u32,
    /// Speed-vs-quality effort, 0 (slowest, best) to 8 (fastest).
    pub speed_effort: u8,
    /// Multiplier applied to the codec's base constrained-quality ceiling.
    pub bitrate_multiplier: f64,
}

impl QualityPreset {
    /// Looks up a built-in preset by tier name. `None` for unknown names;
    /// the resolver turns that into a `ConfigError`.
    pub fn lookup(name: &str) -> Option<QualityPreset> {
        PresetTier::parse(name).map(Self::for_tier)
    }

    pub fn for_tier(tier: PresetTier) -> QualityPreset {
        match tier {
            PresetTier::Low => QualityPreset {
                tier,
                crf: 35,
                speed_effort: 7,
                bitrate_multiplier: 0.5,
            },
            PresetTier::Medium => QualityPreset {
                tier,
                crf: 28,
                speed_effort: 5,
                bitrate_multiplier: 1.0,
            },
            PresetTier::High => QualityPreset {
                tier,
                crf: 23,
                speed_effort: 3,
                bitrate_multiplier: 1.5,
            },
            PresetTier::Ultra => QualityPreset {
                tier,
                crf: 18,
                speed_effort: 1,
                bitrate_multiplier: 2.0,
            },
        }
    }
}
