// src/config.rs - Analysis settings, loadable from TOML
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pose::LandmarkIndices;

/// Landmark whose vertical position drives gait-event detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSignal {
    Ankle,
    Heel,
    FootIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum landmark visibility (inclusive).
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f64,
    #[serde(default)]
    pub landmarks: LandmarkIndices,
    /// Report forward trunk lean as a positive angle.
    #[serde(default = "default_trunk_forward_positive")]
    pub trunk_forward_positive: bool,
    #[serde(default = "default_event_signal")]
    pub event_signal: EventSignal,
    #[serde(default = "default_detect_toe_off")]
    pub detect_toe_off: bool,
    #[serde(default = "default_min_strikes_for_cadence")]
    pub min_strikes_for_cadence: usize,
    /// Frames with a computable skeletal height needed for the oscillation ratio.
    #[serde(default = "default_min_skeletal_frames")]
    pub min_skeletal_frames: usize,
}

fn default_visibility_threshold() -> f64 { 0.5 }
fn default_trunk_forward_positive() -> bool { true }
fn default_event_signal() -> EventSignal { EventSignal::Ankle }
fn default_detect_toe_off() -> bool { true }
fn default_min_strikes_for_cadence() -> usize { 2 }
fn default_min_skeletal_frames() -> usize { 3 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            landmarks: LandmarkIndices::default(),
            trunk_forward_positive: default_trunk_forward_positive(),
            event_signal: default_event_signal(),
            detect_toe_off: default_detect_toe_off(),
            min_strikes_for_cadence: default_min_strikes_for_cadence(),
            min_skeletal_frames: default_min_skeletal_frames(),
        }
    }
}

impl AnalysisConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = AnalysisConfig::from_toml("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.visibility_threshold, 0.5);
        assert_eq!(config.landmarks.left_hip, 23);
    }

    #[test]
    fn test_partial_overrides() {
        let config = AnalysisConfig::from_toml(
            r#"
            visibility_threshold = 0.7
            trunk_forward_positive = false
            event_signal = "heel"

            [landmarks]
            left_ankle = 29
            "#,
        )
        .unwrap();

        assert_eq!(config.visibility_threshold, 0.7);
        assert!(!config.trunk_forward_positive);
        assert_eq!(config.event_signal, EventSignal::Heel);
        assert_eq!(config.landmarks.left_ankle, 29);
        assert_eq!(config.landmarks.right_ankle, 28);
        assert!(config.detect_toe_off);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gait.toml");
        fs::write(&path, "min_skeletal_frames = 5\n").unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.min_skeletal_frames, 5);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AnalysisConfig::load(dir.path().join("nope.toml")).is_err());
    }
}
