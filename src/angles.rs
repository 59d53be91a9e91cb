// src/angles.rs - Trunk, thigh and shank angles relative to vertical
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::AnalysisConfig;
use crate::geometry::{angle_to_vertical, midpoint, vector, SignConvention};
use crate::pose::{Frame, LandmarkIndices, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleName {
    Trunk,
    LeftThigh,
    RightThigh,
    LeftShank,
    RightShank,
}

impl AngleName {
    pub const ALL: [AngleName; 5] = [
        AngleName::Trunk,
        AngleName::LeftThigh,
        AngleName::RightThigh,
        AngleName::LeftShank,
        AngleName::RightShank,
    ];

    pub fn thigh(side: Side) -> Self {
        match side {
            Side::Left => AngleName::LeftThigh,
            Side::Right => AngleName::RightThigh,
        }
    }

    pub fn shank(side: Side) -> Self {
        match side {
            Side::Left => AngleName::LeftShank,
            Side::Right => AngleName::RightShank,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AngleName::Trunk => "trunk",
            AngleName::LeftThigh => "left_thigh",
            AngleName::RightThigh => "right_thigh",
            AngleName::LeftShank => "left_shank",
            AngleName::RightShank => "right_shank",
        }
    }
}

impl fmt::Display for AngleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Angles of one frame. Every name is present; unavailable ones are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleSample {
    pub frame_number: u32,
    pub timestamp: f64,
    pub angles: BTreeMap<AngleName, Option<f64>>,
}

impl AngleSample {
    pub fn get(&self, name: AngleName) -> Option<f64> {
        self.angles.get(&name).copied().flatten()
    }

    /// Names with a value in this frame.
    pub fn available(&self) -> impl Iterator<Item = (AngleName, f64)> + '_ {
        self.angles
            .iter()
            .filter_map(|(name, value)| value.map(|v| (*name, v)))
    }
}

/// Fixed sign convention per angle name.
#[derive(Debug, Clone, PartialEq)]
pub struct SignTable {
    conventions: BTreeMap<AngleName, SignConvention>,
}

impl SignTable {
    pub fn new(trunk: SignConvention) -> Self {
        let mut conventions = BTreeMap::new();
        conventions.insert(AngleName::Trunk, trunk);
        // Distal point trailing the proximal one reads positive.
        for side in Side::BOTH {
            conventions.insert(AngleName::thigh(side), SignConvention::ForwardPositive);
            conventions.insert(AngleName::shank(side), SignConvention::ForwardPositive);
        }
        Self { conventions }
    }

    pub fn convention(&self, name: AngleName) -> SignConvention {
        self.conventions
            .get(&name)
            .copied()
            .unwrap_or(SignConvention::ForwardPositive)
    }
}

impl Default for SignTable {
    fn default() -> Self {
        Self::new(SignConvention::ForwardPositive)
    }
}

pub struct SegmentAngleCalculator {
    indices: LandmarkIndices,
    visibility_threshold: f64,
    signs: SignTable,
}

impl SegmentAngleCalculator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            indices: config.landmarks,
            visibility_threshold: config.visibility_threshold,
            signs: SignTable::new(SignConvention::from_forward_positive(
                config.trunk_forward_positive,
            )),
        }
    }

    /// Lean of the hip-to-shoulder line. Needs both shoulders and both hips.
    pub fn trunk(&self, frame: &Frame) -> Option<f64> {
        let t = self.visibility_threshold;
        let ls = frame.visible(self.indices.left_shoulder, t)?;
        let rs = frame.visible(self.indices.right_shoulder, t)?;
        let lh = frame.visible(self.indices.left_hip, t)?;
        let rh = frame.visible(self.indices.right_hip, t)?;

        let v = midpoint(ls, rs) - midpoint(lh, rh);
        angle_to_vertical(&v, self.signs.convention(AngleName::Trunk))
    }

    /// Knee-to-hip segment angle.
    pub fn thigh(&self, frame: &Frame, side: Side) -> Option<f64> {
        let t = self.visibility_threshold;
        let knee = frame.visible(self.indices.knee(side), t)?;
        let hip = frame.visible(self.indices.hip(side), t)?;

        angle_to_vertical(&vector(knee, hip), self.signs.convention(AngleName::thigh(side)))
    }

    /// Ankle-to-knee segment angle.
    pub fn shank(&self, frame: &Frame, side: Side) -> Option<f64> {
        let t = self.visibility_threshold;
        let ankle = frame.visible(self.indices.ankle(side), t)?;
        let knee = frame.visible(self.indices.knee(side), t)?;

        angle_to_vertical(&vector(ankle, knee), self.signs.convention(AngleName::shank(side)))
    }

    pub fn angle(&self, frame: &Frame, name: AngleName) -> Option<f64> {
        match name {
            AngleName::Trunk => self.trunk(frame),
            AngleName::LeftThigh => self.thigh(frame, Side::Left),
            AngleName::RightThigh => self.thigh(frame, Side::Right),
            AngleName::LeftShank => self.shank(frame, Side::Left),
            AngleName::RightShank => self.shank(frame, Side::Right),
        }
    }

    /// All angles of a frame, or `None` for frames without a full skeleton.
    pub fn sample(&self, frame: &Frame) -> Option<AngleSample> {
        if !frame.is_usable() {
            return None;
        }

        let angles = AngleName::ALL
            .iter()
            .map(|name| (*name, self.angle(frame, *name)))
            .collect();

        Some(AngleSample {
            frame_number: frame.frame_number,
            timestamp: frame.timestamp,
            angles,
        })
    }

    pub fn compute_all(&self, frames: &[Frame]) -> Vec<AngleSample> {
        frames.iter().filter_map(|frame| self.sample(frame)).collect()
    }
}
