//! Property-based tests for configuration resolution.
//!
//! Generates random format/preset/override/signal combinations and checks
//! that resolution is deterministic, keeps every knob inside its published
//! range, and never lets a signal adjustment clobber an explicit override.

use proptest::prelude::*;
use vpress::config::{BITRATE_MULTIPLIER_RANGE, KEYFRAME_INTERVAL_RANGE, SPEED_EFFORT_MAX};
use vpress::{resolve, ConfigError, ContentSignals, OutputFormat, Overrides};

fn any_format() -> impl Strategy<Value = OutputFormat> {
    prop::sample::select(OutputFormat::ALL.to_vec())
}

fn any_preset() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["low", "medium", "high", "ultra"])
}

fn any_signals() -> impl Strategy<Value = ContentSignals> {
    (
        prop::option::of(0.0..=1.0f64),
        prop::option::of(0.0..=1.0f64),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(motion_score, quality_score, is_spherical)| ContentSignals {
            scene_cuts: Vec::new(),
            motion_score,
            quality_score,
            is_spherical,
        })
}

/// Overrides drawn entirely from each knob's valid domain. CRF stays within
/// 0..=51 so the same value is accepted by every codec.
fn valid_overrides() -> impl Strategy<Value = Overrides> {
    (
        prop::option::of(0u32..=51),
        prop::option::of(0u8..=SPEED_EFFORT_MAX),
        prop::option::of(any::<bool>()),
        prop::option::of(KEYFRAME_INTERVAL_RANGE),
        prop::option::of(BITRATE_MULTIPLIER_RANGE),
    )
        .prop_map(
            |(crf, speed_effort, two_pass, keyframe_interval_s, bitrate_multiplier)| Overrides {
                crf,
                speed_effort,
                two_pass,
                keyframe_interval_s,
                bitrate_multiplier,
                extra_args: None,
            },
        )
}

proptest! {
    #[test]
    fn resolved_knobs_stay_in_range(
        format in any_format(),
        preset in any_preset(),
        overrides in valid_overrides(),
        signals in prop::option::of(any_signals()),
    ) {
        let config = resolve(format, preset, &overrides, signals.as_ref()).unwrap();
        prop_assert!(format.codec().crf_range().contains(&config.crf));
        prop_assert!(config.speed_effort <= SPEED_EFFORT_MAX);
        prop_assert!(KEYFRAME_INTERVAL_RANGE.contains(&config.keyframe_interval_s));
        prop_assert!(BITRATE_MULTIPLIER_RANGE.contains(&config.bitrate_multiplier));
    }

    #[test]
    fn resolution_is_deterministic(
        format in any_format(),
        preset in any_preset(),
        overrides in valid_overrides(),
        signals in prop::option::of(any_signals()),
    ) {
        let first = resolve(format, preset, &overrides, signals.as_ref()).unwrap();
        let second = resolve(format, preset, &overrides, signals.as_ref()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn signals_never_clobber_explicit_overrides(
        format in any_format(),
        preset in any_preset(),
        crf in 0u32..=51,
        effort in 0u8..=SPEED_EFFORT_MAX,
        keyframe in KEYFRAME_INTERVAL_RANGE,
        signals in any_signals(),
    ) {
        let overrides = Overrides {
            crf: Some(crf),
            speed_effort: Some(effort),
            keyframe_interval_s: Some(keyframe),
            ..Default::default()
        };
        let config = resolve(format, preset, &overrides, Some(&signals)).unwrap();
        prop_assert_eq!(config.crf, crf);
        prop_assert_eq!(config.speed_effort, effort);
        prop_assert_eq!(config.keyframe_interval_s, keyframe);
    }

    #[test]
    fn out_of_range_crf_is_rejected(
        format in any_format(),
        preset in any_preset(),
        excess in 64u32..=10_000,
    ) {
        let overrides = Overrides {
            crf: Some(excess),
            ..Default::default()
        };
        let err = resolve(format, preset, &overrides, None).unwrap_err();
        let is_out_of_range_crf = matches!(err, ConfigError::OutOfRange { knob: "crf", .. });
        prop_assert!(is_out_of_range_crf);
    }
}
