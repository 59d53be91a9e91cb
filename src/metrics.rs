// src/metrics.rs - Run-level gait metrics from frames, angles and events
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::angles::{AngleName, AngleSample};
use crate::config::AnalysisConfig;
use crate::events::{count_of, EventType, GaitEvent};
use crate::pose::{Frame, LandmarkIndices, PixelScale, Side, VideoMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Ok,
    /// Primary value unavailable; a secondary value in another unit is reported.
    Fallback,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    StepsPerMinute,
    Ratio,
    #[serde(rename = "px")]
    Pixels,
    Degrees,
    Milliseconds,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub status: MetricStatus,
    pub value: Option<f64>,
    pub unit: MetricUnit,
}

impl MetricValue {
    pub fn ok(value: f64, unit: MetricUnit) -> Self {
        Self { status: MetricStatus::Ok, value: Some(value), unit }
    }

    pub fn no_data(unit: MetricUnit) -> Self {
        Self { status: MetricStatus::NoData, value: None, unit }
    }

    pub fn is_ok(&self) -> bool {
        self.status == MetricStatus::Ok
    }
}

/// Mean and extreme of a per-frame or per-event angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleStats {
    pub mean: MetricValue,
    pub max: MetricValue,
    pub samples: usize,
}

impl AngleStats {
    fn no_data() -> Self {
        Self {
            mean: MetricValue::no_data(MetricUnit::Degrees),
            max: MetricValue::no_data(MetricUnit::Degrees),
            samples: 0,
        }
    }

    /// `max` is the value of largest magnitude, sign kept.
    fn from_signed(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::no_data();
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let max = values
            .iter()
            .copied()
            .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        Self {
            mean: MetricValue::ok(mean, MetricUnit::Degrees),
            max: MetricValue::ok(max, MetricUnit::Degrees),
            samples: values.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

/// An event together with the angles of its frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    #[serde(flatten)]
    pub event: GaitEvent,
    pub timestamp: Option<f64>,
    pub angles: BTreeMap<AngleName, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitMetrics {
    pub cadence: MetricValue,
    pub vertical_oscillation: MetricValue,
    pub hip_drop: AngleStats,
    pub crossover: AngleStats,
    pub ground_contact_time: MetricValue,
    pub step_counts: BTreeMap<Side, usize>,
    pub angle_summaries: BTreeMap<AngleName, AngleSummary>,
}

pub struct CycleAggregator {
    indices: LandmarkIndices,
    visibility_threshold: f64,
    min_strikes_for_cadence: usize,
    min_skeletal_frames: usize,
}

impl CycleAggregator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            indices: config.landmarks,
            visibility_threshold: config.visibility_threshold,
            min_strikes_for_cadence: config.min_strikes_for_cadence.max(1),
            min_skeletal_frames: config.min_skeletal_frames.max(1),
        }
    }

    pub fn aggregate(
        &self,
        frames: &[Frame],
        samples: &[AngleSample],
        events: &[GaitEvent],
        metadata: &VideoMetadata,
    ) -> GaitMetrics {
        let usable: Vec<&Frame> = frames.iter().filter(|f| f.is_usable()).collect();
        let by_number: HashMap<u32, &Frame> =
            usable.iter().map(|f| (f.frame_number, *f)).collect();
        let scale = metadata.pixel_scale();

        let metrics = GaitMetrics {
            cadence: self.cadence(&usable, events, metadata.fps),
            vertical_oscillation: self.vertical_oscillation(&usable, &scale),
            hip_drop: self.hip_drop(&usable, &scale),
            crossover: self.crossover(&by_number, events, &scale),
            ground_contact_time: ground_contact_time(&by_number, events),
            step_counts: step_counts(events),
            angle_summaries: angle_summaries(samples),
        };

        info!(
            cadence = ?metrics.cadence.value,
            oscillation = ?metrics.vertical_oscillation.value,
            oscillation_status = ?metrics.vertical_oscillation.status,
            hip_drop_samples = metrics.hip_drop.samples,
            crossover_samples = metrics.crossover.samples,
            "Aggregated gait metrics"
        );
        metrics
    }

    /// Strikes per minute over the span of usable frames, one decimal.
    /// Too few strikes or no measurable duration gives 0.0 / no_data.
    pub fn cadence(&self, usable: &[&Frame], events: &[GaitEvent], fps: f64) -> MetricValue {
        let strikes = count_of(events, EventType::Strike);
        let no_data = MetricValue {
            status: MetricStatus::NoData,
            value: Some(0.0),
            unit: MetricUnit::StepsPerMinute,
        };

        if strikes < self.min_strikes_for_cadence {
            debug!(strikes, "Not enough strikes for cadence");
            return no_data;
        }

        let duration = match (usable.first(), usable.last()) {
            (Some(first), Some(last)) if last.timestamp > first.timestamp => {
                last.timestamp - first.timestamp
            }
            _ if fps > 0.0 && usable.len() > 1 => (usable.len() - 1) as f64 / fps,
            _ => return no_data,
        };

        let cadence = strikes as f64 / duration * 60.0;
        MetricValue::ok(round_to_tenth(cadence), MetricUnit::StepsPerMinute)
    }

    /// Hip-center travel normalized by mean skeletal height. Falls back to
    /// the raw pixel range when too few frames have a full skeleton.
    pub fn vertical_oscillation(&self, usable: &[&Frame], scale: &PixelScale) -> MetricValue {
        let hip_ys: Vec<f64> = usable
            .iter()
            .filter_map(|f| self.hip_center(f, scale))
            .map(|c| c.y)
            .collect();

        if hip_ys.is_empty() {
            return MetricValue::no_data(MetricUnit::Ratio);
        }

        let max = hip_ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = hip_ys.iter().copied().fold(f64::INFINITY, f64::min);
        let range = max - min;

        let heights: Vec<f64> = usable
            .iter()
            .filter_map(|f| self.skeletal_height(f, scale))
            .collect();

        if heights.len() >= self.min_skeletal_frames {
            let mean_height = heights.iter().sum::<f64>() / heights.len() as f64;
            if mean_height > 0.0 {
                return MetricValue::ok(range / mean_height, MetricUnit::Ratio);
            }
        }

        debug!(
            skeletal_frames = heights.len(),
            "Skeletal height unavailable, reporting pixel range"
        );
        MetricValue {
            status: MetricStatus::Fallback,
            value: Some(range),
            unit: MetricUnit::Pixels,
        }
    }

    /// Pixel-space body height proxy: shank + thigh (both averaged across
    /// sides) + trunk + head. Needs every contributing landmark.
    pub fn skeletal_height(&self, frame: &Frame, scale: &PixelScale) -> Option<f64> {
        let idx = &self.indices;
        let p = |i: usize| self.pixel(frame, i, scale);

        let nose = p(idx.nose)?;
        let shoulders = (p(idx.left_shoulder)?, p(idx.right_shoulder)?);
        let hips = (p(idx.left_hip)?, p(idx.right_hip)?);
        let knees = (p(idx.left_knee)?, p(idx.right_knee)?);
        let ankles = (p(idx.left_ankle)?, p(idx.right_ankle)?);

        let shank = ((knees.0 - ankles.0).norm() + (knees.1 - ankles.1).norm()) / 2.0;
        let thigh = ((hips.0 - knees.0).norm() + (hips.1 - knees.1).norm()) / 2.0;
        let shoulder_mid = (shoulders.0 + shoulders.1) / 2.0;
        let hip_mid = (hips.0 + hips.1) / 2.0;
        let trunk = (shoulder_mid - hip_mid).norm();
        let head = (nose - shoulder_mid).norm();

        Some(shank + thigh + trunk + head)
    }

    /// Lateral pelvic tilt per frame, `asin(|dy| / hip_distance)`.
    pub fn hip_drop(&self, usable: &[&Frame], scale: &PixelScale) -> AngleStats {
        let drops: Vec<f64> = usable
            .iter()
            .filter_map(|frame| {
                let left = self.pixel(frame, self.indices.left_hip, scale)?;
                let right = self.pixel(frame, self.indices.right_hip, scale)?;
                let distance = (left - right).norm();
                if distance == 0.0 {
                    return None;
                }
                let ratio = ((left.y - right.y).abs() / distance).min(1.0);
                Some(ratio.asin().to_degrees())
            })
            .collect();

        AngleStats::from_signed(&drops)
    }

    /// Foot placement relative to the body centerline at each strike.
    /// Outward of the striking side's hip is positive, across the line negative.
    pub fn crossover(
        &self,
        by_number: &HashMap<u32, &Frame>,
        events: &[GaitEvent],
        scale: &PixelScale,
    ) -> AngleStats {
        let angles: Vec<f64> = events
            .iter()
            .filter(|e| e.event_type == EventType::Strike)
            .filter_map(|event| {
                let frame = by_number.get(&event.frame_number)?;
                self.crossover_angle(frame, event.side, scale)
            })
            .collect();

        AngleStats::from_signed(&angles)
    }

    pub fn crossover_angle(&self, frame: &Frame, side: Side, scale: &PixelScale) -> Option<f64> {
        let ankle = self.pixel(frame, self.indices.ankle(side), scale)?;
        let own_hip = self.pixel(frame, self.indices.hip(side), scale)?;
        let center = self.hip_center(frame, scale)?;

        let outward = own_hip.x - center.x;
        if outward == 0.0 {
            return None;
        }

        let offset = ankle.x - center.x;
        let vertical = (ankle.y - center.y).abs();
        if offset == 0.0 && vertical == 0.0 {
            return None;
        }

        let magnitude = offset.abs().atan2(vertical).to_degrees();
        if offset == 0.0 || offset.signum() == outward.signum() {
            Some(magnitude)
        } else {
            Some(-magnitude)
        }
    }

    fn hip_center(&self, frame: &Frame, scale: &PixelScale) -> Option<Vector2<f64>> {
        let left = self.pixel(frame, self.indices.left_hip, scale)?;
        let right = self.pixel(frame, self.indices.right_hip, scale)?;
        Some((left + right) / 2.0)
    }

    fn pixel(&self, frame: &Frame, index: usize, scale: &PixelScale) -> Option<Vector2<f64>> {
        frame
            .visible(index, self.visibility_threshold)
            .map(|lm| lm.to_pixel(scale))
    }
}

/// Mean strike-to-toe-off time, pairing each strike with the same side's
/// next event when that event is a toe-off.
pub fn ground_contact_time(by_number: &HashMap<u32, &Frame>, events: &[GaitEvent]) -> MetricValue {
    let mut contacts = Vec::new();

    for side in Side::BOTH {
        let side_events: Vec<&GaitEvent> = events.iter().filter(|e| e.side == side).collect();
        for pair in side_events.windows(2) {
            let (strike, next) = (pair[0], pair[1]);
            if strike.event_type != EventType::Strike || next.event_type != EventType::Off {
                continue;
            }
            let (Some(start), Some(end)) = (
                by_number.get(&strike.frame_number),
                by_number.get(&next.frame_number),
            ) else {
                continue;
            };
            let contact = end.timestamp - start.timestamp;
            if contact > 0.0 {
                contacts.push(contact * 1000.0);
            }
        }
    }

    if contacts.is_empty() {
        return MetricValue::no_data(MetricUnit::Milliseconds);
    }
    let mean = contacts.iter().sum::<f64>() / contacts.len() as f64;
    MetricValue::ok(mean, MetricUnit::Milliseconds)
}

pub fn step_counts(events: &[GaitEvent]) -> BTreeMap<Side, usize> {
    Side::BOTH
        .iter()
        .map(|side| {
            let count = events
                .iter()
                .filter(|e| e.side == *side && e.event_type == EventType::Strike)
                .count();
            (*side, count)
        })
        .collect()
}

pub fn angle_summaries(samples: &[AngleSample]) -> BTreeMap<AngleName, AngleSummary> {
    let mut summaries = BTreeMap::new();

    for name in AngleName::ALL {
        let values: Vec<f64> = samples.iter().filter_map(|s| s.get(name)).collect();
        if values.is_empty() {
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        summaries.insert(name, AngleSummary { mean, min, max, samples: values.len() });
    }

    summaries
}

/// Angle snapshot for every event. Events on skipped frames get an empty map.
pub fn event_snapshots(events: &[GaitEvent], samples: &[AngleSample]) -> Vec<EventSnapshot> {
    let by_number: HashMap<u32, &AngleSample> =
        samples.iter().map(|s| (s.frame_number, s)).collect();

    events
        .iter()
        .map(|event| {
            let sample = by_number.get(&event.frame_number);
            EventSnapshot {
                event: *event,
                timestamp: sample.map(|s| s.timestamp),
                angles: sample.map(|s| s.angles.clone()).unwrap_or_default(),
            }
        })
        .collect()
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
