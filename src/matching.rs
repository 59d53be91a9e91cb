// src/matching.rs - Representative frame per event type by RMSE to a target
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

use crate::angles::AngleSample;
use crate::events::{EventType, GaitEvent};
use crate::reference::{ReferenceStatistics, TargetAngles};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestFrame {
    pub frame_number: u32,
    pub rmse: f64,
    /// Angle names that took part in the score.
    pub overlap: usize,
}

/// At most one frame per event type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestCycleSelection {
    pub frames: BTreeMap<EventType, BestFrame>,
}

impl BestCycleSelection {
    pub fn frame_for(&self, event_type: EventType) -> Option<u32> {
        self.frames.get(&event_type).map(|b| b.frame_number)
    }

    pub fn frame_numbers(&self) -> BTreeMap<EventType, u32> {
        self.frames
            .iter()
            .map(|(event_type, best)| (*event_type, best.frame_number))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// RMSE over the names present in both the sample and the target.
/// `None` when they share no available angle.
pub fn rmse(sample: &AngleSample, target: &TargetAngles) -> Option<(f64, usize)> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for (name, expected) in target {
        if let Some(actual) = sample.get(*name) {
            sum += (actual - expected).powi(2);
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    Some(((sum / n as f64).sqrt(), n))
}

#[derive(Debug, Clone, Default)]
pub struct BestCycleMatcher;

impl BestCycleMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn select(
        &self,
        events: &[GaitEvent],
        samples: &[AngleSample],
        reference: &ReferenceStatistics,
    ) -> BestCycleSelection {
        let by_number: HashMap<u32, &AngleSample> =
            samples.iter().map(|s| (s.frame_number, s)).collect();
        let mut selection = BestCycleSelection::default();

        for (event_type, target) in &reference.targets {
            // Both sides may strike on one frame; score it once, in frame order.
            let candidates: BTreeSet<u32> = events
                .iter()
                .filter(|e| e.event_type == *event_type)
                .map(|e| e.frame_number)
                .collect();

            match self.best_of(&candidates, &by_number, target) {
                Some(best) => {
                    debug!(
                        event_type = %event_type,
                        frame = best.frame_number,
                        rmse = best.rmse,
                        "Selected best cycle frame"
                    );
                    selection.frames.insert(*event_type, best);
                }
                None => {
                    info!(
                        event_type = %event_type,
                        candidates = candidates.len(),
                        "No frame could be scored against the target"
                    );
                }
            }
        }

        selection
    }

    /// Lowest RMSE wins; only a strictly lower score replaces the current
    /// best, so ties keep the earliest frame.
    fn best_of(
        &self,
        candidates: &BTreeSet<u32>,
        by_number: &HashMap<u32, &AngleSample>,
        target: &TargetAngles,
    ) -> Option<BestFrame> {
        let mut best: Option<BestFrame> = None;

        for frame_number in candidates {
            let Some(sample) = by_number.get(frame_number) else {
                continue;
            };
            let Some((score, overlap)) = rmse(sample, target) else {
                continue;
            };
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |b| score < b.rmse) {
                best = Some(BestFrame { frame_number: *frame_number, rmse: score, overlap });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::AngleName;
    use crate::pose::Side;
    use approx::assert_abs_diff_eq;

    fn sample(frame_number: u32, values: &[(AngleName, Option<f64>)]) -> AngleSample {
        AngleSample {
            frame_number,
            timestamp: frame_number as f64 / 30.0,
            angles: values.iter().copied().collect(),
        }
    }

    fn event(frame_number: u32, side: Side, event_type: EventType) -> GaitEvent {
        GaitEvent { frame_number, side, event_type }
    }

    fn reference(target: &[(AngleName, f64)]) -> ReferenceStatistics {
        let mut reference = ReferenceStatistics::default();
        reference
            .targets
            .insert(EventType::Strike, target.iter().copied().collect());
        reference
    }

    #[test]
    fn test_rmse_uses_overlap_only() {
        let s = sample(0, &[(AngleName::Trunk, Some(5.0)), (AngleName::LeftThigh, None)]);
        let target: TargetAngles = [(AngleName::Trunk, 8.0), (AngleName::LeftThigh, 100.0)]
            .into_iter()
            .collect();
        let (score, n) = rmse(&s, &target).unwrap();
        assert_eq!(n, 1);
        assert_abs_diff_eq!(score, 3.0);

        let empty = sample(1, &[(AngleName::Trunk, None)]);
        assert!(rmse(&empty, &target).is_none());
    }

    #[test]
    fn test_selects_minimum_rmse_per_event_type() {
        let samples = vec![
            sample(2, &[(AngleName::Trunk, Some(10.0))]),
            sample(5, &[(AngleName::Trunk, Some(6.0))]),
            sample(9, &[(AngleName::Trunk, Some(5.5))]),
        ];
        let events = vec![
            event(2, Side::Left, EventType::Strike),
            event(5, Side::Right, EventType::Strike),
            event(9, Side::Left, EventType::Off),
        ];
        let selection = BestCycleMatcher::new().select(&events, &samples, &reference(&[(AngleName::Trunk, 5.0)]));

        // frame 9 is closer but is a toe-off
        assert_eq!(selection.frame_for(EventType::Strike), Some(5));
        assert_eq!(selection.frame_for(EventType::Off), None);
        assert_abs_diff_eq!(selection.frames[&EventType::Strike].rmse, 1.0);
    }

    #[test]
    fn test_ties_pick_earliest_frame() {
        let samples = vec![
            sample(12, &[(AngleName::Trunk, Some(7.0))]),
            sample(4, &[(AngleName::Trunk, Some(3.0))]),
        ];
        let events = vec![
            event(12, Side::Left, EventType::Strike),
            event(4, Side::Right, EventType::Strike),
        ];
        let matcher = BestCycleMatcher::new();
        let reference = reference(&[(AngleName::Trunk, 5.0)]);
        for _ in 0..5 {
            let selection = matcher.select(&events, &samples, &reference);
            assert_eq!(selection.frame_for(EventType::Strike), Some(4));
        }
    }

    #[test]
    fn test_frames_without_overlap_are_skipped() {
        let samples = vec![
            sample(1, &[(AngleName::Trunk, None), (AngleName::LeftShank, Some(0.0))]),
            sample(3, &[(AngleName::Trunk, Some(50.0))]),
        ];
        let events = vec![
            event(1, Side::Left, EventType::Strike),
            event(3, Side::Left, EventType::Strike),
        ];
        let selection = BestCycleMatcher::new().select(&events, &samples, &reference(&[(AngleName::Trunk, 5.0)]));
        assert_eq!(selection.frame_for(EventType::Strike), Some(3));
    }

    #[test]
    fn test_unmatchable_event_type_is_absent() {
        let samples = vec![sample(1, &[(AngleName::Trunk, None)])];
        let events = vec![event(1, Side::Left, EventType::Strike)];
        let selection = BestCycleMatcher::new().select(&events, &samples, &reference(&[(AngleName::Trunk, 5.0)]));
        assert!(selection.is_empty());
        assert!(selection.frame_numbers().is_empty());
    }

    #[test]
    fn test_events_on_skipped_frames_are_ignored() {
        let events = vec![event(8, Side::Left, EventType::Strike)];
        let selection = BestCycleMatcher::new().select(&events, &[], &reference(&[(AngleName::Trunk, 5.0)]));
        assert!(selection.is_empty());
    }
}
