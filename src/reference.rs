// src/reference.rs - Externally supplied population reference values
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::angles::AngleName;
use crate::events::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStat {
    pub mean: f64,
    pub stddev: f64,
}

pub type TargetAngles = BTreeMap<AngleName, f64>;

/// Read-only reference data: target angle vectors for best-cycle matching
/// and mean/stddev pairs for Z-scoring, both keyed by event type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStatistics {
    #[serde(default)]
    pub targets: BTreeMap<EventType, TargetAngles>,
    #[serde(default)]
    pub stats: BTreeMap<EventType, BTreeMap<AngleName, ReferenceStat>>,
}

impl ReferenceStatistics {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference statistics {}", path.display()))?;
        let reference: ReferenceStatistics = serde_json::from_str(&content)
            .with_context(|| format!("Invalid reference statistics {}", path.display()))?;
        Ok(reference)
    }

    /// Targets default to the reference means when none are given.
    pub fn from_stats(stats: BTreeMap<EventType, BTreeMap<AngleName, ReferenceStat>>) -> Self {
        let targets = stats
            .iter()
            .map(|(event_type, angles)| {
                let target = angles.iter().map(|(name, s)| (*name, s.mean)).collect();
                (*event_type, target)
            })
            .collect();
        Self { targets, stats }
    }

    pub fn target(&self, event_type: EventType) -> Option<&TargetAngles> {
        self.targets.get(&event_type)
    }

    pub fn stat(&self, event_type: EventType, name: AngleName) -> Option<&ReferenceStat> {
        self.stats.get(&event_type)?.get(&name)
    }
}
