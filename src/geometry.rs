// src/geometry.rs - Shared vector helpers for segment angles
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::pose::Landmark;

/// Which way a vector leaning toward +x (the direction of travel) reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    ForwardPositive,
    ForwardNegative,
}

impl SignConvention {
    pub fn from_forward_positive(forward_positive: bool) -> Self {
        if forward_positive {
            SignConvention::ForwardPositive
        } else {
            SignConvention::ForwardNegative
        }
    }
}

/// Vector pointing from `from` to `to` in normalized image coordinates.
pub fn vector(from: &Landmark, to: &Landmark) -> Vector2<f64> {
    Vector2::new(to.x - from.x, to.y - from.y)
}

pub fn midpoint(a: &Landmark, b: &Landmark) -> Vector2<f64> {
    (a.position() + b.position()) / 2.0
}

/// Angle between `v` and the upward vertical, in degrees.
///
/// The image y axis grows downward, so "up" is `(0, -1)` and the base angle
/// is `atan2(x, -y)` in (-180, 180]. The convention is a final negation,
/// which keeps the two conventions exact mirrors of each other.
pub fn angle_to_vertical(v: &Vector2<f64>, convention: SignConvention) -> Option<f64> {
    if !v.x.is_finite() || !v.y.is_finite() || v.norm() == 0.0 {
        return None;
    }

    let mut base = v.x.atan2(-v.y).to_degrees();
    // atan2 reports -180 for a negative-zero x; keep the half-open range.
    if base <= -180.0 {
        base = 180.0;
    }

    Some(match convention {
        SignConvention::ForwardPositive => base,
        SignConvention::ForwardNegative => -base,
    })
}
