// src/scoring.rs - Z-scores of the best-cycle frames against reference stats
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::angles::{AngleName, AngleSample};
use crate::events::EventType;
use crate::matching::BestCycleSelection;
use crate::reference::ReferenceStatistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZScoreBand {
    Typical,
    Elevated,
    Outlier,
}

impl ZScoreBand {
    pub fn classify(z: f64) -> Self {
        let magnitude = z.abs();
        if magnitude <= 1.0 {
            ZScoreBand::Typical
        } else if magnitude <= 2.0 {
            ZScoreBand::Elevated
        } else {
            ZScoreBand::Outlier
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreEntry {
    pub value: f64,
    pub mean: f64,
    pub stddev: f64,
    /// `None` when the reference spread is zero.
    pub z: Option<f64>,
    pub band: Option<ZScoreBand>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZScores {
    pub scores: BTreeMap<EventType, BTreeMap<AngleName, ZScoreEntry>>,
}

impl ZScores {
    pub fn z(&self, event_type: EventType, name: AngleName) -> Option<f64> {
        self.scores.get(&event_type)?.get(&name)?.z
    }

    pub fn entry(&self, event_type: EventType, name: AngleName) -> Option<&ZScoreEntry> {
        self.scores.get(&event_type)?.get(&name)
    }
}

pub fn z_score(value: f64, mean: f64, stddev: f64) -> Option<f64> {
    if stddev == 0.0 || !stddev.is_finite() {
        return None;
    }
    let z = (value - mean) / stddev;
    z.is_finite().then_some(z)
}

#[derive(Debug, Clone, Default)]
pub struct ZScoreScorer;

impl ZScoreScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores only the selected frames, only for angles with both a value
    /// and reference stats.
    pub fn score(
        &self,
        selection: &BestCycleSelection,
        samples: &[AngleSample],
        reference: &ReferenceStatistics,
    ) -> ZScores {
        let by_number: HashMap<u32, &AngleSample> =
            samples.iter().map(|s| (s.frame_number, s)).collect();
        let mut result = ZScores::default();

        for (event_type, best) in &selection.frames {
            let (Some(sample), Some(stats)) =
                (by_number.get(&best.frame_number), reference.stats.get(event_type))
            else {
                continue;
            };

            let entries: BTreeMap<AngleName, ZScoreEntry> = stats
                .iter()
                .filter_map(|(name, stat)| {
                    let value = sample.get(*name)?;
                    let z = z_score(value, stat.mean, stat.stddev);
                    if z.is_none() {
                        debug!(
                            event_type = %event_type,
                            angle = %name,
                            "Reference stddev is zero, z-score unavailable"
                        );
                    }
                    Some((
                        *name,
                        ZScoreEntry {
                            value,
                            mean: stat.mean,
                            stddev: stat.stddev,
                            z,
                            band: z.map(ZScoreBand::classify),
                        },
                    ))
                })
                .collect();

            if !entries.is_empty() {
                result.scores.insert(*event_type, entries);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::BestFrame;
    use crate::reference::ReferenceStat;
    use approx::assert_abs_diff_eq;

    fn selection(frame_number: u32) -> BestCycleSelection {
        let mut selection = BestCycleSelection::default();
        selection
            .frames
            .insert(EventType::Strike, BestFrame { frame_number, rmse: 0.0, overlap: 1 });
        selection
    }

    fn samples() -> Vec<AngleSample> {
        vec![
            AngleSample {
                frame_number: 3,
                timestamp: 0.1,
                angles: [
                    (AngleName::Trunk, Some(9.0)),
                    (AngleName::LeftThigh, Some(-20.0)),
                    (AngleName::RightThigh, None),
                    (AngleName::LeftShank, Some(10.0)),
                ]
                .into_iter()
                .collect(),
            },
            AngleSample {
                frame_number: 4,
                timestamp: 0.13,
                angles: [(AngleName::Trunk, Some(100.0))].into_iter().collect(),
            },
        ]
    }

    fn reference() -> ReferenceStatistics {
        let stats: BTreeMap<AngleName, ReferenceStat> = [
            (AngleName::Trunk, ReferenceStat { mean: 5.0, stddev: 2.0 }),
            (AngleName::LeftThigh, ReferenceStat { mean: -15.0, stddev: 0.0 }),
            (AngleName::RightThigh, ReferenceStat { mean: -15.0, stddev: 3.0 }),
            (AngleName::LeftShank, ReferenceStat { mean: 4.0, stddev: 2.0 }),
        ]
        .into_iter()
        .collect();
        ReferenceStatistics::from_stats([(EventType::Strike, stats)].into_iter().collect())
    }

    #[test]
    fn test_z_score_formula() {
        assert_eq!(z_score(9.0, 5.0, 2.0), Some(2.0));
        assert_eq!(z_score(9.0, 5.0, 0.0), None);
        assert_eq!(z_score(9.0, 5.0, f64::NAN), None);
    }

    #[test]
    fn test_zero_stddev_leaves_siblings_intact() {
        let scores = ZScoreScorer::new().score(&selection(3), &samples(), &reference());

        assert_abs_diff_eq!(scores.z(EventType::Strike, AngleName::Trunk).unwrap(), 2.0);
        assert_eq!(scores.z(EventType::Strike, AngleName::LeftThigh), None);
        let thigh = scores.entry(EventType::Strike, AngleName::LeftThigh).unwrap();
        assert_eq!(thigh.value, -20.0);
        assert_eq!(thigh.band, None);
        assert_abs_diff_eq!(scores.z(EventType::Strike, AngleName::LeftShank).unwrap(), 3.0);
    }

    #[test]
    fn test_only_angles_present_in_both() {
        let scores = ZScoreScorer::new().score(&selection(3), &samples(), &reference());
        let strike = &scores.scores[&EventType::Strike];
        assert!(!strike.contains_key(&AngleName::RightThigh));
        assert!(!strike.contains_key(&AngleName::RightShank));
        assert_eq!(strike.len(), 3);
    }

    #[test]
    fn test_scoped_to_best_cycle_frame() {
        let scores = ZScoreScorer::new().score(&selection(3), &samples(), &reference());
        // frame 4 has trunk 100 but is not selected
        assert_abs_diff_eq!(scores.entry(EventType::Strike, AngleName::Trunk).unwrap().value, 9.0);
        assert!(scores.scores.get(&EventType::Off).is_none());
    }

    #[test]
    fn test_bands() {
        assert_eq!(ZScoreBand::classify(0.4), ZScoreBand::Typical);
        assert_eq!(ZScoreBand::classify(-1.0), ZScoreBand::Typical);
        assert_eq!(ZScoreBand::classify(1.5), ZScoreBand::Elevated);
        assert_eq!(ZScoreBand::classify(-2.5), ZScoreBand::Outlier);

        let scores = ZScoreScorer::new().score(&selection(3), &samples(), &reference());
        let trunk = scores.entry(EventType::Strike, AngleName::Trunk).unwrap();
        assert_eq!(trunk.band, Some(ZScoreBand::Elevated));
    }

    #[test]
    fn test_empty_selection_scores_nothing() {
        let scores = ZScoreScorer::new().score(&BestCycleSelection::default(), &samples(), &reference());
        assert!(scores.scores.is_empty());
    }
}
