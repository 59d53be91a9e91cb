// src/pose.rs - Landmark frames as delivered by the upstream pose detector
use anyhow::{Context, Result};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of keypoints in a MediaPipe pose skeleton.
pub const POSE_LANDMARK_COUNT: usize = 33;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, z: 0.0, visibility }
    }

    /// Inclusive: a landmark exactly at the threshold is usable.
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility >= threshold
    }

    pub fn has_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Position scaled into pixel space.
    pub fn to_pixel(&self, scale: &PixelScale) -> Vector2<f64> {
        Vector2::new(self.x * scale.width, self.y * scale.height)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, visibility: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub frame_number: u32,
    pub timestamp: f64,
    #[serde(default)]
    pub keypoints: Vec<Landmark>,
    #[serde(default = "default_detected")]
    pub landmarks_detected: bool,
    #[serde(default)]
    pub confidence_score: f64,
}

fn default_detected() -> bool { true }

impl Frame {
    /// Frames without a full skeleton take no part in any computation.
    pub fn is_usable(&self) -> bool {
        self.landmarks_detected && self.keypoints.len() >= POSE_LANDMARK_COUNT
    }

    /// Landmark at `index` if it exists, has finite coordinates and passes
    /// the visibility threshold.
    pub fn visible(&self, index: usize, threshold: f64) -> Option<&Landmark> {
        self.keypoints
            .get(index)
            .filter(|lm| lm.has_finite_position() && lm.is_visible(threshold))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub fps: f64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl VideoMetadata {
    pub fn pixel_scale(&self) -> PixelScale {
        PixelScale {
            width: if self.width > 0 { self.width as f64 } else { 1.0 },
            height: if self.height > 0 { self.height as f64 } else { 1.0 },
        }
    }
}

/// Multipliers taking normalized coordinates to pixels. Unknown
/// dimensions leave the axis normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScale {
    pub width: f64,
    pub height: f64,
}

/// One video's worth of detector output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkRecording {
    pub metadata: VideoMetadata,
    pub frames: Vec<Frame>,
}

impl LandmarkRecording {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read landmark recording {}", path.display()))?;
        let recording: LandmarkRecording = serde_json::from_str(&content)
            .with_context(|| format!("Invalid landmark recording {}", path.display()))?;
        Ok(recording)
    }
}

/// Indices into the 33-point skeleton used by the gait pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkIndices {
    pub nose: usize,
    pub left_shoulder: usize,
    pub right_shoulder: usize,
    pub left_hip: usize,
    pub right_hip: usize,
    pub left_knee: usize,
    pub right_knee: usize,
    pub left_ankle: usize,
    pub right_ankle: usize,
    pub left_heel: usize,
    pub right_heel: usize,
    pub left_foot_index: usize,
    pub right_foot_index: usize,
}

impl Default for LandmarkIndices {
    // MediaPipe pose layout
    fn default() -> Self {
        Self {
            nose: 0,
            left_shoulder: 11,
            right_shoulder: 12,
            left_hip: 23,
            right_hip: 24,
            left_knee: 25,
            right_knee: 26,
            left_ankle: 27,
            right_ankle: 28,
            left_heel: 29,
            right_heel: 30,
            left_foot_index: 31,
            right_foot_index: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl LandmarkIndices {
    pub fn shoulder(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_shoulder,
            Side::Right => self.right_shoulder,
        }
    }

    pub fn hip(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_hip,
            Side::Right => self.right_hip,
        }
    }

    pub fn knee(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_knee,
            Side::Right => self.right_knee,
        }
    }

    pub fn ankle(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_ankle,
            Side::Right => self.right_ankle,
        }
    }

    pub fn heel(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_heel,
            Side::Right => self.right_heel,
        }
    }

    pub fn foot_index(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_foot_index,
            Side::Right => self.right_foot_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_frame(visibility: f64) -> Frame {
        Frame {
            frame_number: 0,
            timestamp: 0.0,
            keypoints: vec![Landmark::new(0.5, 0.5, visibility); POSE_LANDMARK_COUNT],
            landmarks_detected: true,
            confidence_score: 0.9,
        }
    }

    #[test]
    fn test_visibility_threshold_is_inclusive() {
        assert!(Landmark::new(0.0, 0.0, 0.5).is_visible(0.5));
        assert!(!Landmark::new(0.0, 0.0, 0.49).is_visible(0.5));
    }

    #[test]
    fn test_frame_usable_requires_full_skeleton() {
        let mut frame = full_frame(1.0);
        assert!(frame.is_usable());

        frame.keypoints.truncate(32);
        assert!(!frame.is_usable());

        let mut frame = full_frame(1.0);
        frame.landmarks_detected = false;
        assert!(!frame.is_usable());
    }

    #[test]
    fn test_visible_filters_missing_and_hidden() {
        let frame = full_frame(0.3);
        assert!(frame.visible(11, 0.5).is_none());
        assert!(frame.visible(11, 0.3).is_some());
        assert!(frame.visible(40, 0.0).is_none());
    }

    #[test]
    fn test_non_finite_coordinates_are_not_visible() {
        let mut frame = full_frame(0.9);
        frame.keypoints[23].x = f64::NAN;
        frame.keypoints[24].y = f64::INFINITY;
        assert!(frame.visible(23, 0.5).is_none());
        assert!(frame.visible(24, 0.5).is_none());
        assert!(frame.visible(25, 0.5).is_some());
    }

    #[test]
    fn test_pixel_scale_falls_back_to_normalized() {
        let meta = VideoMetadata { fps: 30.0, width: 0, height: 720 };
        let scale = meta.pixel_scale();
        assert_eq!(scale.width, 1.0);
        assert_eq!(scale.height, 720.0);

        let lm = Landmark::new(0.5, 0.5, 1.0);
        let px = lm.to_pixel(&scale);
        assert_eq!(px.x, 0.5);
        assert_eq!(px.y, 360.0);
    }

    #[test]
    fn test_frame_deserializes_with_defaults() {
        let json = r#"{"frame_number": 4, "timestamp": 0.13, "keypoints": [{"x": 0.1, "y": 0.2}]}"#;
        let frame: Frame = serde_json::from_str(json).unwrap();
        assert!(frame.landmarks_detected);
        assert_eq!(frame.keypoints[0].visibility, 0.0);
        assert!(!frame.is_usable());
    }

    #[test]
    fn test_default_indices_follow_mediapipe() {
        let idx = LandmarkIndices::default();
        assert_eq!(idx.hip(Side::Left), 23);
        assert_eq!(idx.knee(Side::Right), 26);
        assert_eq!(idx.ankle(Side::Left), 27);
        assert_eq!(idx.shoulder(Side::Right), 12);
    }
}
