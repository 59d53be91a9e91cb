//! Running gait metrics from pose landmark sequences.
//!
//! Frames of 33-point pose landmarks go in; segment angles, foot-strike and
//! toe-off events, run-level metrics, a best-matching frame per event type
//! and its Z-scores against reference statistics come out.
//!
//! ```ignore
//! use gait_metrics::{AnalysisConfig, GaitAnalyzer, LandmarkRecording, ReferenceStatistics};
//!
//! let recording = LandmarkRecording::load("run.json")?;
//! let reference = ReferenceStatistics::load("reference.json")?;
//! let report = GaitAnalyzer::new(AnalysisConfig::default())
//!     .analyze_recording(&recording, &reference)?;
//! println!("cadence: {:?}", report.metrics.cadence.value);
//! ```

pub mod analysis;
pub mod angles;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod geometry;
pub mod matching;
pub mod metrics;
pub mod pose;
pub mod reference;
pub mod scoring;

pub use analysis::{AnalysisReport, GaitAnalyzer};
pub use angles::{AngleName, AngleSample, SegmentAngleCalculator, SignTable};
pub use config::{AnalysisConfig, EventSignal};
pub use error::{AnalysisError, AnalysisResult};
pub use events::{EventType, GaitEvent, GaitEventDetector, VerticalSeries};
pub use export::{ExportPaths, ReportExporter};
pub use geometry::{angle_to_vertical, vector, SignConvention};
pub use matching::{BestCycleMatcher, BestCycleSelection, BestFrame};
pub use metrics::{CycleAggregator, GaitMetrics, MetricStatus, MetricUnit, MetricValue};
pub use pose::{Frame, Landmark, LandmarkIndices, LandmarkRecording, Side, VideoMetadata};
pub use reference::{ReferenceStat, ReferenceStatistics};
pub use scoring::{ZScoreBand, ZScoreScorer, ZScores};
