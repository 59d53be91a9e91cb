// src/analysis.rs - One full pass from landmark frames to the gait report
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::angles::{AngleSample, SegmentAngleCalculator};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::events::{EventType, GaitEvent, GaitEventDetector, VerticalSeries};
use crate::matching::{BestCycleMatcher, BestCycleSelection};
use crate::metrics::{event_snapshots, CycleAggregator, EventSnapshot, GaitMetrics};
use crate::pose::{Frame, LandmarkRecording, Side, VideoMetadata};
use crate::reference::ReferenceStatistics;
use crate::scoring::{ZScoreScorer, ZScores};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: VideoMetadata,
    pub frames_total: usize,
    pub frames_analyzed: usize,
    pub metrics: GaitMetrics,
    pub events: Vec<GaitEvent>,
    pub event_snapshots: Vec<EventSnapshot>,
    /// Event type to representative frame number.
    pub best_cycle: BTreeMap<EventType, u32>,
    pub best_cycle_detail: BestCycleSelection,
    pub z_scores: ZScores,
    /// Per-frame angles; exported as CSV rather than inside the JSON report.
    #[serde(skip)]
    pub samples: Vec<AngleSample>,
}

/// Holds only immutable settings, so one analyzer can serve any number of
/// recordings, including from several threads.
pub struct GaitAnalyzer {
    config: AnalysisConfig,
    calculator: SegmentAngleCalculator,
    detector: GaitEventDetector,
    aggregator: CycleAggregator,
    matcher: BestCycleMatcher,
    scorer: ZScoreScorer,
}

impl GaitAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            calculator: SegmentAngleCalculator::new(&config),
            detector: GaitEventDetector::new(&config),
            aggregator: CycleAggregator::new(&config),
            matcher: BestCycleMatcher::new(),
            scorer: ZScoreScorer::new(),
            config,
        }
    }

    pub fn analyze_recording(
        &self,
        recording: &LandmarkRecording,
        reference: &ReferenceStatistics,
    ) -> AnalysisResult<AnalysisReport> {
        self.analyze(&recording.frames, &recording.metadata, reference)
    }

    pub fn analyze(
        &self,
        frames: &[Frame],
        metadata: &VideoMetadata,
        reference: &ReferenceStatistics,
    ) -> AnalysisResult<AnalysisReport> {
        validate(frames, metadata)?;

        let samples = self.calculator.compute_all(frames);
        let skipped = frames.len() - samples.len();
        if skipped > 0 {
            warn!(skipped, total = frames.len(), "Skipped frames without a full skeleton");
        }

        let events = self.detect_events(frames);
        let metrics = self.aggregator.aggregate(frames, &samples, &events, metadata);
        let snapshots = event_snapshots(&events, &samples);
        let selection = self.matcher.select(&events, &samples, reference);
        let z_scores = self.scorer.score(&selection, &samples, reference);

        info!(
            frames = frames.len(),
            analyzed = samples.len(),
            events = events.len(),
            best_cycle = ?selection.frame_numbers(),
            "Gait analysis complete"
        );

        Ok(AnalysisReport {
            metadata: *metadata,
            frames_total: frames.len(),
            frames_analyzed: samples.len(),
            metrics,
            events,
            event_snapshots: snapshots,
            best_cycle: selection.frame_numbers(),
            best_cycle_detail: selection,
            z_scores,
            samples,
        })
    }

    pub fn detect_events(&self, frames: &[Frame]) -> Vec<GaitEvent> {
        let series = |side: Side| {
            VerticalSeries::from_frames(
                frames,
                &self.config.landmarks,
                side,
                self.config.event_signal,
                self.config.visibility_threshold,
            )
        };
        let left = series(Side::Left);
        let right = series(Side::Right);

        if left.is_empty() || right.is_empty() {
            warn!(
                left_samples = left.len(),
                right_samples = right.len(),
                "Foot landmark missing for a whole side"
            );
        }

        self.detector.detect(&left, &right)
    }
}

fn validate(frames: &[Frame], metadata: &VideoMetadata) -> AnalysisResult<()> {
    if !metadata.fps.is_finite() || metadata.fps <= 0.0 {
        return Err(AnalysisError::InvalidMetadata(format!(
            "fps must be positive, got {}",
            metadata.fps
        )));
    }

    let mut previous: Option<u32> = None;
    for frame in frames {
        if !frame.timestamp.is_finite() {
            return Err(AnalysisError::InvalidTimestamp { frame_number: frame.frame_number });
        }
        if let Some(prev) = previous {
            if frame.frame_number <= prev {
                return Err(AnalysisError::NonMonotonicFrames {
                    previous: prev,
                    current: frame.frame_number,
                });
            }
        }
        previous = Some(frame.frame_number);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, POSE_LANDMARK_COUNT};

    fn blank(frame_number: u32) -> Frame {
        Frame {
            frame_number,
            timestamp: frame_number as f64 / 30.0,
            keypoints: vec![Landmark::default(); POSE_LANDMARK_COUNT],
            landmarks_detected: true,
            confidence_score: 0.0,
        }
    }

    const META: VideoMetadata = VideoMetadata { fps: 30.0, width: 640, height: 480 };

    #[test]
    fn test_rejects_non_monotonic_frames() {
        let analyzer = GaitAnalyzer::new(AnalysisConfig::default());
        let frames = vec![blank(0), blank(2), blank(2)];
        let err = analyzer
            .analyze(&frames, &META, &ReferenceStatistics::default())
            .unwrap_err();
        assert_eq!(err, AnalysisError::NonMonotonicFrames { previous: 2, current: 2 });
    }

    #[test]
    fn test_rejects_bad_metadata_and_timestamps() {
        let analyzer = GaitAnalyzer::new(AnalysisConfig::default());
        let meta = VideoMetadata { fps: 0.0, ..META };
        assert!(matches!(
            analyzer.analyze(&[], &meta, &ReferenceStatistics::default()),
            Err(AnalysisError::InvalidMetadata(_))
        ));

        let mut frame = blank(0);
        frame.timestamp = f64::NAN;
        assert_eq!(
            analyzer.analyze(&[frame], &META, &ReferenceStatistics::default()),
            Err(AnalysisError::InvalidTimestamp { frame_number: 0 })
        );
    }

    #[test]
    fn test_invisible_recording_still_reports() {
        let analyzer = GaitAnalyzer::new(AnalysisConfig::default());
        let frames: Vec<Frame> = (0..10).map(blank).collect();
        let report = analyzer
            .analyze(&frames, &META, &ReferenceStatistics::default())
            .unwrap();

        assert_eq!(report.frames_total, 10);
        assert_eq!(report.frames_analyzed, 10);
        assert!(report.events.is_empty());
        assert!(report.best_cycle.is_empty());
        assert!(report.z_scores.scores.is_empty());
        assert_eq!(report.metrics.cadence.value, Some(0.0));
    }

    #[test]
    fn test_analyzer_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GaitAnalyzer>();
    }
}
