//! Batch driver: enumerates screenshots, extracts every configured field,
//! and persists the CSV table plus one diagnostic image per screenshot.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use regex::Regex;

use crate::config::{Rect, ScanConfig};
use crate::csv_writer;
use crate::log;
use crate::ocr::{self, OcrEngine};

/// Border color for the diagnostic overlay.
const BOX_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BOX_THICKNESS: u32 = 2;

/// Recognized values for one screenshot, in field-table order. Built once
/// per image and never mutated afterwards.
#[derive(Debug)]
pub struct ExtractedRecord {
    values: Vec<(String, String)>,
}

impl ExtractedRecord {
    pub(crate) fn new(values: Vec<(String, String)>) -> Self {
        Self { values }
    }

    /// The value recognized for `field`, if the field table contains it.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}

/// What a completed batch did.
#[derive(Debug)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub csv_written: bool,
}

/// Processes every eligible screenshot in the configured input directory.
///
/// A failure on one image (unreadable file, crop out of bounds, OCR error)
/// is logged with the filename and skips only that image. The CSV is
/// written once at the end, and only when at least one record was
/// produced.
pub fn run_batch(config: &ScanConfig, engine: &dyn OcrEngine) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let files = eligible_images(&config.input_dir)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for path in &files {
        log(&format!("Processing {}", path.display()));
        match process_image(path, config, engine) {
            Ok(record) => records.push(record),
            Err(e) => {
                log(&format!("Error processing {}: {:#}", path.display(), e));
                skipped += 1;
            }
        }
    }

    let csv_written = if records.is_empty() {
        log("No data was extracted from the images.");
        false
    } else {
        csv_writer::write_records(&config.csv_path, &config.fields, &records)?;
        log(&format!("Data saved to {}", config.csv_path.display()));
        true
    };

    Ok(BatchSummary {
        processed: records.len(),
        skipped,
        csv_written,
    })
}

/// Image files in `dir`, sorted by name so row order does not depend on
/// filesystem listing order.
fn eligible_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    let ext = ext.to_ascii_lowercase();
                    ext == "jpg" || ext == "png"
                })
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Extracts all fields from one screenshot and writes its diagnostic
/// image into the output directory.
fn process_image(
    path: &Path,
    config: &ScanConfig,
    engine: &dyn OcrEngine,
) -> Result<ExtractedRecord> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load {}", path.display()))?
        .to_rgba8();

    // The overlay copy gets the boxes; extraction reads the pristine image.
    let mut overlay = img.clone();

    let mut values = Vec::with_capacity(config.fields.len());
    for spec in &config.fields {
        draw_rect(&mut overlay, &spec.region, BOX_COLOR, BOX_THICKNESS);

        let value = ocr::extract_field(&img, spec, engine)
            .with_context(|| format!("Failed to extract field {}", spec.name))?;
        log(&format!("{}: {}", spec.name, value));
        values.push((spec.name.clone(), value));
    }
    let record = ExtractedRecord::new(values);

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("input path has no file name")?;
    let prefix = sanitize_for_filename(record.value("Name").unwrap_or("Unknown"));
    let overlay_path = config.output_dir.join(format!("{prefix}_{file_name}"));
    overlay
        .save(&overlay_path)
        .with_context(|| format!("Failed to save diagnostic image {}", overlay_path.display()))?;

    Ok(record)
}

/// Replaces characters that are unsafe in filenames with underscores.
fn sanitize_for_filename(name: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^\w\-. ]").expect("invalid regex"));
    re.replace_all(name, "_").into_owned()
}

/// Draws a rectangle border on the overlay image. Edges falling outside
/// the image are silently dropped; the overlay is advisory.
fn draw_rect(img: &mut RgbaImage, region: &Rect, color: Rgba<u8>, thickness: u32) {
    let (img_w, img_h) = img.dimensions();
    let Rect { x, y, width: w, height: h } = *region;

    // Top edge
    for dy in 0..thickness {
        for dx in 0..w {
            let (px, py) = (x + dx, y + dy);
            if px < img_w && py < img_h {
                img.put_pixel(px, py, color);
            }
        }
    }

    // Bottom edge
    for dy in 0..thickness {
        for dx in 0..w {
            let (px, py) = (x + dx, (y + h.saturating_sub(1)).saturating_sub(dy));
            if px < img_w && py < img_h {
                img.put_pixel(px, py, color);
            }
        }
    }

    // Left edge
    for dy in 0..h {
        for dx in 0..thickness {
            let (px, py) = (x + dx, y + dy);
            if px < img_w && py < img_h {
                img.put_pixel(px, py, color);
            }
        }
    }

    // Right edge
    for dy in 0..h {
        for dx in 0..thickness {
            let (px, py) = ((x + w.saturating_sub(1)).saturating_sub(dx), y + dy);
            if px < img_w && py < img_h {
                img.put_pixel(px, py, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldKind, FieldSpec, PageSegMode, PreprocessParams};
    use crate::ocr::MockEngine;
    use tempfile::tempdir;

    fn field(name: &str, region: Rect, kind: FieldKind) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            region,
            preprocess: PreprocessParams {
                block_size: 3,
                threshold_c: 5,
                invert: false,
                scale: 1,
            },
            psm: PageSegMode::SingleLine,
            whitelist: "0123456789".to_string(),
            kind,
        }
    }

    /// A tiny three-field layout that fits a 16x8 test image.
    fn test_config(input_dir: &Path, output_dir: &Path, csv_path: &Path) -> ScanConfig {
        ScanConfig {
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            csv_path: csv_path.to_path_buf(),
            fields: vec![
                field(
                    "Name",
                    Rect { x: 0, y: 0, width: 8, height: 4 },
                    FieldKind::Text,
                ),
                field(
                    "Power",
                    Rect { x: 8, y: 0, width: 8, height: 4 },
                    FieldKind::Magnitude,
                ),
                field(
                    "Leadership",
                    Rect { x: 0, y: 4, width: 8, height: 4 },
                    FieldKind::Digits,
                ),
            ],
        }
    }

    fn write_test_image(path: &Path) {
        RgbaImage::from_pixel(16, 8, Rgba([220, 220, 220, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn batch_writes_one_row_per_image() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("screenshots");
        let output = dir.path().join("output");
        let csv = dir.path().join("output.csv");
        fs::create_dir_all(&input).unwrap();
        write_test_image(&input.join("member.png"));

        let config = test_config(&input, &output, &csv);
        let engine = MockEngine::new(["  Alice B  ", "45.6M", "12abc"]);

        let summary = run_batch(&config, &engine).unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 0);
        assert!(summary.csv_written);

        let content = fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, ["Name,Power,Leadership", "Alice B,45.6M,12"]);

        // Diagnostic image named after the sanitized recognized name
        assert!(output.join("Alice B_member.png").exists());
    }

    #[test]
    fn empty_input_directory_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("screenshots");
        let output = dir.path().join("output");
        let csv = dir.path().join("output.csv");
        fs::create_dir_all(&input).unwrap();

        let config = test_config(&input, &output, &csv);
        let engine = MockEngine::new(Vec::<String>::new());

        let summary = run_batch(&config, &engine).unwrap();

        assert_eq!(summary.processed, 0);
        assert!(!summary.csv_written);
        assert!(!csv.exists());
    }

    #[test]
    fn unreadable_image_is_skipped_and_batch_continues() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("screenshots");
        let output = dir.path().join("output");
        let csv = dir.path().join("output.csv");
        fs::create_dir_all(&input).unwrap();
        // Sorts first, fails to decode
        fs::write(input.join("aa_broken.png"), b"not an image").unwrap();
        write_test_image(&input.join("bb_member.png"));

        let config = test_config(&input, &output, &csv);
        let engine = MockEngine::new(["Bob", "3.2M", "44"]);

        let summary = run_batch(&config, &engine).unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.csv_written);

        let content = fs::read_to_string(&csv).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("Bob,3.2M,44"));
    }

    #[test]
    fn only_unreadable_images_means_no_table() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("screenshots");
        let output = dir.path().join("output");
        let csv = dir.path().join("output.csv");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("broken.jpg"), b"garbage").unwrap();

        let config = test_config(&input, &output, &csv);
        let engine = MockEngine::new(Vec::<String>::new());

        let summary = run_batch(&config, &engine).unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped, 1);
        assert!(!csv.exists());
    }

    #[test]
    fn out_of_bounds_layout_skips_the_image() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("screenshots");
        let output = dir.path().join("output");
        let csv = dir.path().join("output.csv");
        fs::create_dir_all(&input).unwrap();
        write_test_image(&input.join("member.png"));

        let mut config = test_config(&input, &output, &csv);
        // Region extends past the 16x8 test image
        config.fields[1].region = Rect { x: 8, y: 0, width: 100, height: 4 };
        let engine = MockEngine::new(["Alice"]);

        let summary = run_batch(&config, &engine).unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.csv_written);
    }

    #[test]
    fn eligible_images_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.png"), b"").unwrap();
        fs::write(dir.path().join("a.JPG"), b"").unwrap();
        fs::write(dir.path().join("b.txt"), b"").unwrap();
        fs::write(dir.path().join("d.jpeg"), b"").unwrap();

        let files = eligible_images(dir.path()).unwrap();
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();

        assert_eq!(names, ["a.JPG", "c.png"]);
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_for_filename("Dr. Evil/Jr?"), "Dr. Evil_Jr_");
        assert_eq!(sanitize_for_filename("Alice B."), "Alice B.");
        assert_eq!(sanitize_for_filename(""), "");
    }

    #[test]
    fn draw_rect_outlines_the_region() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let region = Rect { x: 2, y: 2, width: 6, height: 6 };

        draw_rect(&mut img, &region, BOX_COLOR, 1);

        assert_eq!(*img.get_pixel(2, 2), BOX_COLOR, "corner");
        assert_eq!(*img.get_pixel(7, 7), BOX_COLOR, "opposite corner");
        assert_eq!(*img.get_pixel(5, 2), BOX_COLOR, "top edge");
        assert_eq!(
            *img.get_pixel(4, 4),
            Rgba([0, 0, 0, 255]),
            "interior untouched"
        );
    }
}
