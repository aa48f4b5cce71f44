//! Layered configuration resolution.
//!
//! `resolve` is a pure function with a fixed precedence order:
//! built-in preset defaults, then caller overrides (validated and rejected
//! when out-of-domain, never coerced), then content-signal adjustments
//! (clamped, and never touching a knob the caller set explicitly).

use crate::config::preset::{PresetTier, QualityPreset};
use crate::format::OutputFormat;
use crate::signals::ContentSignals;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Motion score at or above which the source is treated as high-motion.
const HIGH_MOTION_THRESHOLD: f64 = 0.7;

/// Quality score below which auto-upgrades past "high" are skipped.
const LOW_QUALITY_THRESHOLD: f64 = 0.4;

pub const SPEED_EFFORT_MAX: u8 = 8;
pub const KEYFRAME_INTERVAL_RANGE: std::ops::RangeInclusive<f64> = 1.0..=30.0;
pub const BITRATE_MULTIPLIER_RANGE: std::ops::RangeInclusive<f64> = 0.1..=4.0;

/// Default spacing between forced keyframes, in seconds.
const DEFAULT_KEYFRAME_INTERVAL_S: f64 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown quality preset '{0}'")]
    UnknownPreset(String),

    #[error("override {knob} = {value} outside valid range {min}..={max}")]
    OutOfRange {
        knob: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("failed to parse extra encoder args '{0}'")]
    BadExtraArgs(String),
}

/// Caller-supplied partial configuration for one output format. Every field
/// is optional; a set field overrides the preset and is exempt from signal
/// adjustments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub crf: Option<u32>,
    #[serde(default)]
    pub speed_effort: Option<u8>,
    #[serde(default)]
    pub two_pass: Option<bool>,
    #[serde(default)]
    pub keyframe_interval_s: Option<f64>,
    #[serde(default)]
    pub bitrate_multiplier: Option<f64>,
    /// Raw extra encoder arguments, shell-style quoted; split with shlex.
    #[serde(default)]
    pub extra_args: Option<String>,
}

/// Fully-merged settings for one output format. Every numeric knob is
/// within its valid range once resolution returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub format: OutputFormat,
    pub preset_tier: PresetTier,
    pub crf: u32,
    pub speed_effort: u8,
    pub bitrate_multiplier: f64,
    pub keyframe_interval_s: f64,
    pub two_pass: bool,
    /// Forces the 360°-aware processing path downstream.
    pub spherical: bool,
    pub extra_args: Vec<String>,
}

/// Tracks which knobs the caller set explicitly, so signal-driven
/// adjustments never override an explicit choice.
#[derive(Debug, Clone, Copy, Default)]
struct OverriddenMask {
    crf: bool,
    speed_effort: bool,
    keyframe_interval: bool,
}

fn check_range_u(
    knob: &'static str,
    value: u32,
    range: &std::ops::RangeInclusive<u32>,
) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            knob,
            value: value as f64,
            min: *range.start() as f64,
            max: *range.end() as f64,
        })
    }
}

fn check_range_f(
    knob: &'static str,
    value: f64,
    range: &std::ops::RangeInclusive<f64>,
) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            knob,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Resolves the configuration for one output format.
///
/// Deterministic: the same inputs always produce the same output.
pub fn resolve(
    format: OutputFormat,
    preset_name: &str,
    overrides: &Overrides,
    signals: Option<&ContentSignals>,
) -> Result<ResolvedConfig, ConfigError> {
    let preset = QualityPreset::lookup(preset_name)
        .ok_or_else(|| ConfigError::UnknownPreset(preset_name.to_string()))?;
    let codec = format.codec();
    let crf_range = codec.crf_range();

    // Layer (a): preset defaults, CRF clamped into the codec's range.
    let mut crf = preset.crf.clamp(*crf_range.start(), *crf_range.end());
    let mut speed_effort = preset.speed_effort.min(SPEED_EFFORT_MAX);
    let mut bitrate_multiplier = preset.bitrate_multiplier;
    let mut keyframe_interval_s = DEFAULT_KEYFRAME_INTERVAL_S;
    let mut two_pass = false;
    let mut mask = OverriddenMask::default();

    // Layer (b): caller overrides. Explicit values win, but explicit
    // invalid values are rejected, never silently replaced.
    if let Some(value) = overrides.crf {
        check_range_u("crf", value, &crf_range)?;
        crf = value;
        mask.crf = true;
    }
    if let Some(value) = overrides.speed_effort {
        check_range_u("speed_effort", value as u32, &(0..=SPEED_EFFORT_MAX as u32))?;
        speed_effort = value;
        mask.speed_effort = true;
    }
    if let Some(value) = overrides.keyframe_interval_s {
        check_range_f("keyframe_interval_s", value, &KEYFRAME_INTERVAL_RANGE)?;
        keyframe_interval_s = value;
        mask.keyframe_interval = true;
    }
    if let Some(value) = overrides.bitrate_multiplier {
        check_range_f("bitrate_multiplier", value, &BITRATE_MULTIPLIER_RANGE)?;
        bitrate_multiplier = value;
    }
    if let Some(value) = overrides.two_pass {
        two_pass = value;
    }

    let extra_args = match &overrides.extra_args {
        Some(raw) => shlex::split(raw).ok_or_else(|| ConfigError::BadExtraArgs(raw.clone()))?,
        None => Vec::new(),
    };

    // Layer (c): signal-driven adjustments, clamped, skipping any knob the
    // caller set explicitly.
    let mut spherical = false;
    if let Some(signals) = signals {
        if signals.spherical() {
            spherical = true;
        }

        if signals.motion_score.unwrap_or(0.0) >= HIGH_MOTION_THRESHOLD {
            // High motion: bias toward a faster effort level and tighter
            // keyframe spacing. Visual-quality knobs are left alone.
            if !mask.speed_effort {
                speed_effort = (speed_effort + 2).min(SPEED_EFFORT_MAX);
            }
            if !mask.keyframe_interval {
                keyframe_interval_s =
                    (keyframe_interval_s / 2.0).max(*KEYFRAME_INTERVAL_RANGE.start());
            }
        }

        if signals.quality_score.is_some_and(|q| q < LOW_QUALITY_THRESHOLD)
            && preset.tier == PresetTier::Ultra
        {
            // The source cannot support an ultra-tier upgrade; hold the
            // non-overridden knobs at the "high" tier's values.
            let ceiling = QualityPreset::for_tier(PresetTier::High);
            if !mask.crf {
                crf = ceiling.crf.clamp(*crf_range.start(), *crf_range.end());
            }
            if !mask.speed_effort {
                speed_effort = ceiling.speed_effort.min(SPEED_EFFORT_MAX);
            }
        }
    }

    Ok(ResolvedConfig {
        format,
        preset_tier: preset.tier,
        crf,
        speed_effort,
        bitrate_multiplier,
        keyframe_interval_s,
        two_pass,
        spherical,
        extra_args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Codec;

    fn motion(score: f64) -> ContentSignals {
        ContentSignals {
            motion_score: Some(score),
            ..Default::default()
        }
    }

    #[test]
    fn test_preset_defaults_applied() {
        let config = resolve(
            OutputFormat::HevcMp4,
            "medium",
            &Overrides::default(),
            None,
        )
        .unwrap();
        assert_eq!(config.crf, 28);
        assert_eq!(config.speed_effort, 5);
        assert!(!config.two_pass);
        assert_eq!(config.keyframe_interval_s, 10.0);
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let err = resolve(
            OutputFormat::HevcMp4,
            "extreme",
            &Overrides::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownPreset("extreme".to_string()));
    }

    #[test]
    fn test_override_wins_over_preset() {
        let overrides = Overrides {
            crf: Some(20),
            two_pass: Some(true),
            ..Default::default()
        };
        let config = resolve(OutputFormat::Vp9Webm, "low", &overrides, None).unwrap();
        assert_eq!(config.crf, 20);
        assert!(config.two_pass);
    }

    #[test]
    fn test_invalid_override_rejected_not_coerced() {
        let overrides = Overrides {
            crf: Some(99), // HEVC CRF tops out at 51
            ..Default::default()
        };
        let err = resolve(OutputFormat::HevcMp4, "medium", &overrides, None).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { knob: "crf", .. }));

        // The same value is in-domain for VP9 (0..=63)
        assert!(resolve(OutputFormat::Vp9Webm, "medium", &overrides, None).is_err());
        let ok = Overrides {
            crf: Some(60),
            ..Default::default()
        };
        assert!(resolve(OutputFormat::Vp9Webm, "medium", &ok, None).is_ok());
    }

    #[test]
    fn test_high_motion_biases_speed_not_quality() {
        let base = resolve(OutputFormat::HevcMp4, "high", &Overrides::default(), None).unwrap();
        let adjusted = resolve(
            OutputFormat::HevcMp4,
            "high",
            &Overrides::default(),
            Some(&motion(0.9)),
        )
        .unwrap();
        assert!(adjusted.speed_effort > base.speed_effort);
        assert_eq!(adjusted.crf, base.crf, "motion must not alter the quality knob");
        assert!(adjusted.keyframe_interval_s < base.keyframe_interval_s);
    }

    #[test]
    fn test_motion_never_touches_overridden_knobs() {
        let overrides = Overrides {
            speed_effort: Some(2),
            keyframe_interval_s: Some(4.0),
            ..Default::default()
        };
        let config = resolve(
            OutputFormat::HevcMp4,
            "high",
            &overrides,
            Some(&motion(0.95)),
        )
        .unwrap();
        assert_eq!(config.speed_effort, 2);
        assert_eq!(config.keyframe_interval_s, 4.0);
    }

    #[test]
    fn test_low_quality_source_demotes_ultra() {
        let signals = ContentSignals {
            quality_score: Some(0.2),
            ..Default::default()
        };
        let config = resolve(
            OutputFormat::H264Mp4,
            "ultra",
            &Overrides::default(),
            Some(&signals),
        )
        .unwrap();
        let high = QualityPreset::for_tier(PresetTier::High);
        assert_eq!(config.crf, high.crf);
        assert_eq!(config.speed_effort, high.speed_effort);

        // lower tiers are already at or below the ceiling
        let medium = resolve(
            OutputFormat::H264Mp4,
            "medium",
            &Overrides::default(),
            Some(&signals),
        )
        .unwrap();
        assert_eq!(medium.crf, QualityPreset::for_tier(PresetTier::Medium).crf);
    }

    #[test]
    fn test_spherical_forced_regardless_of_preset() {
        let signals = ContentSignals {
            is_spherical: Some(true),
            ..Default::default()
        };
        for preset in ["low", "ultra"] {
            let config = resolve(
                OutputFormat::H264Mp4,
                preset,
                &Overrides::default(),
                Some(&signals),
            )
            .unwrap();
            assert!(config.spherical);
        }
    }

    #[test]
    fn test_extra_args_split() {
        let overrides = Overrides {
            extra_args: Some("-tune film -profile:v main".to_string()),
            ..Default::default()
        };
        let config = resolve(OutputFormat::HevcMp4, "medium", &overrides, None).unwrap();
        assert_eq!(
            config.extra_args,
            vec!["-tune", "film", "-profile:v", "main"]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let signals = ContentSignals {
            motion_score: Some(0.8),
            quality_score: Some(0.3),
            is_spherical: Some(true),
            ..Default::default()
        };
        let overrides = Overrides {
            crf: Some(30),
            ..Default::default()
        };
        let a = resolve(OutputFormat::Av1Webm, "ultra", &overrides, Some(&signals)).unwrap();
        let b = resolve(OutputFormat::Av1Webm, "ultra", &overrides, Some(&signals)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_crf_always_in_codec_range() {
        for format in OutputFormat::ALL {
            for preset in ["low", "medium", "high", "ultra"] {
                let config =
                    resolve(format, preset, &Overrides::default(), Some(&motion(1.0))).unwrap();
                let range = Codec::crf_range(&format.codec());
                assert!(range.contains(&config.crf));
                assert!(config.speed_effort <= SPEED_EFFORT_MAX);
            }
        }
    }
}
