// src/export.rs - Writes a session's angle series and report to disk
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::AnalysisReport;
use crate::angles::{AngleName, AngleSample};
use crate::events::GaitEvent;

#[derive(Debug, Serialize)]
struct AngleRecord {
    frame: u32,
    timestamp: f64,
    trunk: Option<f64>,
    left_thigh: Option<f64>,
    right_thigh: Option<f64>,
    left_shank: Option<f64>,
    right_shank: Option<f64>,
}

impl From<&AngleSample> for AngleRecord {
    fn from(sample: &AngleSample) -> Self {
        Self {
            frame: sample.frame_number,
            timestamp: sample.timestamp,
            trunk: sample.get(AngleName::Trunk),
            left_thigh: sample.get(AngleName::LeftThigh),
            right_thigh: sample.get(AngleName::RightThigh),
            left_shank: sample.get(AngleName::LeftShank),
            right_shank: sample.get(AngleName::RightShank),
        }
    }
}

#[derive(Debug, Serialize)]
struct EventRecord {
    frame: u32,
    side: &'static str,
    event_type: &'static str,
}

impl From<&GaitEvent> for EventRecord {
    fn from(event: &GaitEvent) -> Self {
        Self {
            frame: event.frame_number,
            side: event.side.as_str(),
            event_type: event.event_type.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub report: PathBuf,
    pub angles: PathBuf,
    pub events: PathBuf,
}

pub struct ReportExporter {
    output_dir: PathBuf,
    session_name: String,
}

impl ReportExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
        }
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn export_all(&self, report: &AnalysisReport) -> Result<ExportPaths> {
        let paths = ExportPaths {
            report: self.export_report_json(report)?,
            angles: self.export_angles_csv(&report.samples)?,
            events: self.export_events_csv(&report.events)?,
        };
        info!(dir = %self.session_dir().display(), "Exported gait session");
        Ok(paths)
    }

    pub fn export_report_json(&self, report: &AnalysisReport) -> Result<PathBuf> {
        let path = self.prepare("report.json")?;
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;
        Ok(path)
    }

    pub fn export_angles_csv(&self, samples: &[AngleSample]) -> Result<PathBuf> {
        let path = self.prepare("angles.csv")?;
        let mut writer = Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for sample in samples {
            writer.serialize(AngleRecord::from(sample))?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn export_events_csv(&self, events: &[GaitEvent]) -> Result<PathBuf> {
        let path = self.prepare("events.csv")?;
        let mut writer = Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for event in events {
            writer.serialize(EventRecord::from(event))?;
        }
        writer.flush()?;
        Ok(path)
    }

    fn prepare(&self, file_name: &str) -> Result<PathBuf> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir.join(file_name))
    }
}
