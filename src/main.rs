// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gait_metrics::{AnalysisConfig, GaitAnalyzer, LandmarkRecording, ReferenceStatistics, ReportExporter};

/// Derive running gait metrics from a pose landmark recording.
#[derive(Debug, Parser)]
#[command(name = "gait-metrics", version)]
struct Cli {
    /// Landmark recording (JSON: metadata + frames)
    #[arg(long)]
    recording: PathBuf,

    /// Reference statistics (JSON: targets + stats per event type)
    #[arg(long)]
    reference: PathBuf,

    /// Analysis settings (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory that receives the session folder
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Session folder name; timestamped when omitted
    #[arg(long)]
    session: Option<String>,

    /// Also print the report JSON to stdout
    #[arg(long)]
    print: bool,
}

fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("GaitMetrics")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    let recording = LandmarkRecording::load(&cli.recording)?;
    let reference = ReferenceStatistics::load(&cli.reference)?;

    tracing::info!(
        frames = recording.frames.len(),
        fps = recording.metadata.fps,
        "Loaded landmark recording"
    );

    let analyzer = GaitAnalyzer::new(config);
    let report = analyzer
        .analyze_recording(&recording, &reference)
        .context("Gait analysis failed")?;

    let output_dir = cli.output_dir.unwrap_or_else(default_output_dir);
    let exporter = ReportExporter::new(output_dir, cli.session);
    let paths = exporter.export_all(&report)?;

    if cli.print {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    eprintln!("Report:  {}", paths.report.display());
    eprintln!("Angles:  {}", paths.angles.display());
    eprintln!("Events:  {}", paths.events.display());

    Ok(())
}
