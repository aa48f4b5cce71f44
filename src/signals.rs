//! Externally-produced content analysis signals.
//!
//! The orchestrator never computes these: scene detection, motion scoring
//! and quality scoring happen upstream. This module only ingests the record
//! and validates that scores are in-domain before resolution uses them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalsError {
    #[error("failed to read signals file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse signals JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("signal '{field}' value {value} outside [0, 1]")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("scene_cuts must be an ordered, non-negative sequence")]
    UnorderedSceneCuts,
}

/// Read-only per-input content summary. Every field is optional; a missing
/// field disables only the configuration adjustments keyed on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSignals {
    /// Scene cut timestamps in seconds, ascending.
    #[serde(default)]
    pub scene_cuts: Vec<f64>,

    /// Motion intensity in [0, 1]; higher means more motion.
    #[serde(default)]
    pub motion_score: Option<f64>,

    /// Composite source quality in [0, 1]; higher is cleaner.
    #[serde(default)]
    pub quality_score: Option<f64>,

    /// Whether the source is spherical (360°) content.
    #[serde(default)]
    pub is_spherical: Option<bool>,
}

impl ContentSignals {
    /// Loads and validates a signals record from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, SignalsError> {
        let raw = std::fs::read_to_string(path)?;
        let signals: ContentSignals = serde_json::from_str(&raw)?;
        signals.validate()?;
        Ok(signals)
    }

    /// Checks score domains and scene-cut ordering. Out-of-domain signal
    /// values are rejected up front rather than clamped: they indicate a
    /// broken producer, not a caller preference.
    pub fn validate(&self) -> Result<(), SignalsError> {
        if let Some(motion) = self.motion_score {
            if !(0.0..=1.0).contains(&motion) {
                return Err(SignalsError::OutOfRange {
                    field: "motion_score",
                    value: motion,
                });
            }
        }
        if let Some(quality) = self.quality_score {
            if !(0.0..=1.0).contains(&quality) {
                return Err(SignalsError::OutOfRange {
                    field: "quality_score",
                    value: quality,
                });
            }
        }
        let ordered = self
            .scene_cuts
            .windows(2)
            .all(|pair| pair[0] <= pair[1]);
        if !ordered || self.scene_cuts.iter().any(|t| *t < 0.0) {
            return Err(SignalsError::UnorderedSceneCuts);
        }
        Ok(())
    }

    pub fn spherical(&self) -> bool {
        self.is_spherical.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_valid() {
        let signals: ContentSignals = serde_json::from_str("{}").unwrap();
        assert!(signals.validate().is_ok());
        assert_eq!(signals.motion_score, None);
        assert!(!signals.spherical());
    }

    #[test]
    fn test_score_domain_checked() {
        let signals = ContentSignals {
            motion_score: Some(1.5),
            ..Default::default()
        };
        match signals.validate() {
            Err(SignalsError::OutOfRange { field, .. }) => assert_eq!(field, "motion_score"),
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_scene_cuts_must_be_ordered() {
        let signals = ContentSignals {
            scene_cuts: vec![9.0, 3.0],
            ..Default::default()
        };
        assert!(matches!(
            signals.validate(),
            Err(SignalsError::UnorderedSceneCuts)
        ));
    }

    #[test]
    fn test_parse_full_record() {
        let json = r#"{
            "scene_cuts": [1.2, 8.7, 30.0],
            "motion_score": 0.82,
            "quality_score": 0.55,
            "is_spherical": true
        }"#;
        let signals: ContentSignals = serde_json::from_str(json).unwrap();
        signals.validate().unwrap();
        assert!(signals.spherical());
        assert_eq!(signals.scene_cuts.len(), 3);
    }
}
