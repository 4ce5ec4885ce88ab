//! Demo capture command
//!
//! Runs the single start-up capture a simulation host would trigger: announce
//! where data goes, log one object position, flush it to disk.

use anyhow::{Context, Result};
use colored::*;
use simcapture_core::{CaptureConfig, CapturedRecord, LogSummary, RecordLogger, Vector3};
use std::path::PathBuf;

/// What to capture
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Destination name
    pub name: String,
    /// Observed entity
    pub label: String,
    pub position: Vector3,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            name: "DataCapture".to_string(),
            label: "ExampleObjectName".to_string(),
            position: Vector3::new(0.0, 1.0, 2.0),
        }
    }
}

/// Outcome of a demo capture
#[derive(Debug)]
pub struct DemoReport {
    pub location: String,
    pub destination: PathBuf,
    pub written: usize,
}

/// Run the demo capture
pub fn run_demo(config: &CaptureConfig, options: &DemoOptions) -> Result<DemoReport> {
    let location = config.display_location();
    println!("{} {}", "Capture location:".cyan().bold(), location);
    tracing::info!(attempt = %config.attempt_id, "starting demo capture");

    let logger = RecordLogger::with_config(&options.name, config)
        .with_context(|| format!("Failed to create logger '{}'", options.name))?;

    let record = CapturedRecord::position(options.position, options.label.clone())
        .context("Failed to build position record")?;
    println!("  {} {}", "→".cyan(), record.log_summary());
    logger.submit(record)?;

    let written = logger
        .flush_all()
        .with_context(|| format!("Failed to flush to {}", logger.destination().display()))?;
    logger.close()?;

    println!(
        "{} wrote {} record(s) to {}",
        "✓".green(),
        written,
        logger.destination().display().to_string().yellow()
    );

    Ok(DemoReport {
        location,
        destination: logger.destination().to_path_buf(),
        written,
    })
}
