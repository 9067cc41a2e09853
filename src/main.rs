//! Club roster screenshot scanner.
//!
//! Batch tool: for every screenshot in the input folder, crops the fixed
//! per-field regions, preprocesses each crop, reads it with Tesseract, and
//! collects the recognized stats into a CSV table. Each screenshot also
//! gets a diagnostic copy with the regions outlined for visual
//! verification.

mod config;
mod csv_writer;
mod ocr;
mod paths;
mod runner;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::ScanConfig;
use crate::ocr::TesseractEngine;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::logs_dir().join("club_scan.log");
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    paths::ensure_directories()?;

    let config = ScanConfig::load_or_default(Path::new("scan_config.json"));
    config.validate()?;

    // Tesseract must be reachable before any image is touched.
    let engine = TesseractEngine::new().context(
        "Tesseract is not installed. Please install Tesseract OCR.\n\
         Visit https://github.com/UB-Mannheim/tesseract/wiki for Windows installation.\n\
         For macOS, use: brew install tesseract\n\
         For Linux, use: sudo apt-get install tesseract-ocr",
    )?;

    let summary = runner::run_batch(&config, &engine)?;
    log(&format!(
        "Done: {} image(s) processed, {} skipped, table {}",
        summary.processed,
        summary.skipped,
        if summary.csv_written { "written" } else { "not written" }
    ));
    Ok(())
}
