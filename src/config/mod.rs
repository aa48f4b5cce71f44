// Configuration layer: built-in presets and the layered resolver

mod preset;
mod resolver;

pub use preset::{PresetTier, QualityPreset};
pub use resolver::{
    resolve, ConfigError, Overrides, ResolvedConfig, BITRATE_MULTIPLIER_RANGE,
    KEYFRAME_INTERVAL_RANGE, SPEED_EFFORT_MAX,
};
