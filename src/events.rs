// src/events.rs - Foot-strike / toe-off detection from vertical foot position
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::config::{AnalysisConfig, EventSignal};
use crate::pose::{Frame, LandmarkIndices, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Strike,
    Off,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Strike => "strike",
            EventType::Off => "off",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaitEvent {
    pub frame_number: u32,
    pub side: Side,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

/// Vertical position of one foot landmark, keyed by frame number. Frames
/// without a usable sample are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerticalSeries {
    samples: BTreeMap<u32, f64>,
}

impl VerticalSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consecutive values starting at frame 0.
    pub fn from_values(values: &[f64]) -> Self {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u32, *v))
            .collect();
        Self { samples }
    }

    /// Like `from_values`, with `None` marking gaps.
    pub fn from_options(values: &[Option<f64>]) -> Self {
        let samples = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as u32, v)))
            .collect();
        Self { samples }
    }

    pub fn from_frames(
        frames: &[Frame],
        indices: &LandmarkIndices,
        side: Side,
        signal: EventSignal,
        visibility_threshold: f64,
    ) -> Self {
        let index = match signal {
            EventSignal::Ankle => indices.ankle(side),
            EventSignal::Heel => indices.heel(side),
            EventSignal::FootIndex => indices.foot_index(side),
        };

        let mut series = Self::new();
        for frame in frames.iter().filter(|f| f.is_usable()) {
            if let Some(lm) = frame.visible(index, visibility_threshold) {
                series.insert(frame.frame_number, lm.y);
            }
        }
        series
    }

    pub fn insert(&mut self, frame_number: u32, value: f64) {
        if value.is_finite() {
            self.samples.insert(frame_number, value);
        }
    }

    pub fn get(&self, frame_number: u32) -> Option<f64> {
        self.samples.get(&frame_number).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Value at `frame_number` with both immediate neighbours, if all three exist.
    fn window(&self, frame_number: u32) -> Option<(f64, f64, f64)> {
        let prev = self.get(frame_number.checked_sub(1)?)?;
        let current = self.get(frame_number)?;
        let next = self.get(frame_number.checked_add(1)?)?;
        Some((prev, current, next))
    }
}

/// Strict local extrema over contiguous frames; no smoothing.
#[derive(Debug, Clone)]
pub struct GaitEventDetector {
    detect_toe_off: bool,
}

impl GaitEventDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self { detect_toe_off: config.detect_toe_off }
    }

    pub fn strikes_only() -> Self {
        Self { detect_toe_off: false }
    }

    pub fn detect_side(&self, series: &VerticalSeries, side: Side) -> Vec<GaitEvent> {
        let mut events = Vec::new();

        for &frame_number in series.samples.keys() {
            let Some((prev, current, next)) = series.window(frame_number) else {
                continue;
            };

            let event_type = if current < prev && current < next {
                EventType::Strike
            } else if self.detect_toe_off && current > prev && current > next {
                EventType::Off
            } else {
                continue;
            };

            events.push(GaitEvent { frame_number, side, event_type });
        }

        debug!(
            side = side.as_str(),
            samples = series.len(),
            events = events.len(),
            "Scanned vertical series"
        );
        events
    }

    /// Events of both sides, ordered by frame (left before right on ties).
    pub fn detect(&self, left: &VerticalSeries, right: &VerticalSeries) -> Vec<GaitEvent> {
        let mut events = self.detect_side(left, Side::Left);
        events.extend(self.detect_side(right, Side::Right));
        events.sort_by_key(|e| (e.frame_number, e.side));
        events
    }
}

pub fn count_of(events: &[GaitEvent], event_type: EventType) -> usize {
    events.iter().filter(|e| e.event_type == event_type).count()
}
