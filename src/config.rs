//! Field layout and run configuration.
//!
//! The field table lives in an explicit `ScanConfig` object handed to the
//! batch runner, so tests can substitute alternate layouts. Settings are
//! loaded from scan_config.json when present, otherwise built-in defaults
//! for the club roster screen are used.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A rectangle in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Rect {
    /// X position of the top-left corner.
    pub x: u32,
    /// Y position of the top-left corner.
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Per-field image preprocessing settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// Side length of the local window used for adaptive thresholding.
    /// Must be odd; larger windows average over bigger neighborhoods.
    pub block_size: u32,
    /// Constant subtracted from the local mean before comparing.
    pub threshold_c: i32,
    /// Invert after thresholding (for light-on-dark text).
    pub invert: bool,
    /// Integer upscale factor applied last (1 = no scaling).
    pub scale: u32,
}

/// Layout hint passed to the OCR engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// A single uniform block of text.
    SingleBlock,
    /// A single text line.
    SingleLine,
    /// A raw line, bypassing layout analysis.
    RawLine,
}

impl PageSegMode {
    /// The value for tesseract's `--psm` flag.
    pub fn tesseract_arg(self) -> &'static str {
        match self {
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::RawLine => "13",
        }
    }
}

/// How raw OCR text is normalized into the field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, passed through trimmed.
    Text,
    /// First run of digits.
    Digits,
    /// Digits with an optional decimal fraction and magnitude suffix.
    Magnitude,
}

/// Everything needed to locate, preprocess, recognize, and parse one field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub region: Rect,
    pub preprocess: PreprocessParams,
    pub psm: PageSegMode,
    /// Characters the OCR engine is allowed to produce for this field.
    pub whitelist: String,
    pub kind: FieldKind,
}

/// Complete run configuration: directories plus the field table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub csv_path: PathBuf,
    pub fields: Vec<FieldSpec>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("screenshots"),
            output_dir: PathBuf::from("output"),
            csv_path: PathBuf::from("output.csv"),
            fields: default_fields(),
        }
    }
}

const NAME_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789. ";

/// Field table tuned for 1080x1920 portrait screenshots of the club
/// member screen. A different UI version or resolution needs new regions.
fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec {
            name: "Name".to_string(),
            region: Rect { x: 250, y: 660, width: 800, height: 125 },
            preprocess: PreprocessParams {
                block_size: 13,
                threshold_c: 5,
                invert: false,
                scale: 1,
            },
            psm: PageSegMode::RawLine,
            whitelist: NAME_WHITELIST.to_string(),
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "Power".to_string(),
            region: Rect { x: 585, y: 800, width: 250, height: 80 },
            preprocess: PreprocessParams {
                block_size: 15,
                threshold_c: 5,
                invert: false,
                scale: 1,
            },
            psm: PageSegMode::RawLine,
            whitelist: "0123456789.M".to_string(),
            kind: FieldKind::Magnitude,
        },
        FieldSpec {
            name: "Weekly_Club_Exp".to_string(),
            region: Rect { x: 600, y: 1080, width: 75, height: 50 },
            preprocess: PreprocessParams {
                block_size: 11,
                threshold_c: 5,
                invert: false,
                scale: 2,
            },
            psm: PageSegMode::SingleLine,
            whitelist: "0123456789".to_string(),
            kind: FieldKind::Digits,
        },
        FieldSpec {
            name: "Total_Club_Exp".to_string(),
            region: Rect { x: 585, y: 1150, width: 90, height: 50 },
            preprocess: PreprocessParams {
                block_size: 13,
                threshold_c: 5,
                invert: false,
                scale: 1,
            },
            psm: PageSegMode::SingleBlock,
            whitelist: "0123456789".to_string(),
            kind: FieldKind::Digits,
        },
        FieldSpec {
            name: "DNA_Strength".to_string(),
            region: Rect { x: 945, y: 1580, width: 130, height: 55 },
            preprocess: PreprocessParams {
                block_size: 19,
                threshold_c: 2,
                invert: false,
                scale: 2,
            },
            psm: PageSegMode::SingleBlock,
            whitelist: "0123456789K".to_string(),
            kind: FieldKind::Magnitude,
        },
        FieldSpec {
            name: "Leadership".to_string(),
            region: Rect { x: 960, y: 1725, width: 115, height: 65 },
            preprocess: PreprocessParams {
                block_size: 19,
                threshold_c: 2,
                // Leadership is rendered light-on-dark
                invert: true,
                scale: 2,
            },
            psm: PageSegMode::SingleLine,
            whitelist: "0123456789".to_string(),
            kind: FieldKind::Digits,
        },
    ]
}

impl ScanConfig {
    /// Loads configuration from the given JSON file, or returns defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => {
                        crate::log(&format!("Config loaded from {}", path.display()));
                        return config;
                    }
                    Err(e) => {
                        crate::log(&format!(
                            "Failed to parse {}: {}. Using defaults.",
                            path.display(),
                            e
                        ));
                    }
                },
                Err(e) => {
                    crate::log(&format!(
                        "Failed to read {}: {}. Using defaults.",
                        path.display(),
                        e
                    ));
                }
            }
        }
        Self::default()
    }

    /// Rejects field specs that could never produce a usable crop or OCR
    /// call. A bad spec is a configuration error, caught before any image
    /// is touched.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            bail!("field table is empty");
        }
        let mut seen = HashSet::new();
        for spec in &self.fields {
            if spec.name.is_empty() {
                bail!("field with empty name");
            }
            if !seen.insert(spec.name.as_str()) {
                bail!("duplicate field {}", spec.name);
            }
            if spec.whitelist.is_empty() {
                bail!("field {}: whitelist is empty", spec.name);
            }
            if spec.region.width == 0 || spec.region.height == 0 {
                bail!("field {}: region has zero area", spec.name);
            }
            if spec.preprocess.block_size < 3 || spec.preprocess.block_size % 2 == 0 {
                bail!("field {}: block_size must be odd and >= 3", spec.name);
            }
            if spec.preprocess.scale == 0 {
                bail!("field {}: scale must be >= 1", spec.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_expected_columns() {
        let config = ScanConfig::default();
        let names: Vec<&str> = config.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Name",
                "Power",
                "Weekly_Club_Exp",
                "Total_Club_Exp",
                "DNA_Strength",
                "Leadership"
            ]
        );
    }

    #[test]
    fn default_config_validates() {
        ScanConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_even_block_size() {
        let mut config = ScanConfig::default();
        config.fields[0].preprocess.block_size = 12;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_whitelist() {
        let mut config = ScanConfig::default();
        config.fields[2].whitelist.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_area_region() {
        let mut config = ScanConfig::default();
        config.fields[1].region.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_fields() {
        let mut config = ScanConfig::default();
        config.fields[1].name = "Name".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_json_round_trips() {
        let config = ScanConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ScanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fields.len(), config.fields.len());
        assert_eq!(back.fields[5].psm, PageSegMode::SingleLine);
        assert!(back.fields[5].preprocess.invert);
    }

    #[test]
    fn psm_maps_to_tesseract_args() {
        assert_eq!(PageSegMode::SingleBlock.tesseract_arg(), "6");
        assert_eq!(PageSegMode::SingleLine.tesseract_arg(), "7");
        assert_eq!(PageSegMode::RawLine.tesseract_arg(), "13");
    }
}
