//! OCR engine abstraction and the Tesseract CLI implementation.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use image::GrayImage;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::PageSegMode;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("`{0}` is not installed or not runnable")]
    Unavailable(String),
    #[error("tesseract failed: {0}")]
    Engine(String),
    #[error("could not hand the crop to tesseract: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode the crop: {0}")]
    Image(#[from] image::ImageError),
}

/// Narrow capability interface over a text-recognition engine.
///
/// Implementations receive a preprocessed single-channel buffer, a layout
/// hint, and the set of characters they are allowed to produce. The
/// returned text is trimmed of surrounding whitespace.
pub trait OcrEngine: Send + Sync {
    fn recognize(
        &self,
        img: &GrayImage,
        psm: PageSegMode,
        whitelist: &str,
    ) -> Result<String, OcrError>;
}

// ── Tesseract CLI backend ─────────────────────────────────────────────────────

/// Runs the `tesseract` executable over a temporary PNG per crop.
#[derive(Debug)]
pub struct TesseractEngine {
    program: PathBuf,
}

impl TesseractEngine {
    /// Probes `tesseract --version` on PATH. The probe runs once, before
    /// any image is processed; a missing engine fails the whole run here.
    pub fn new() -> Result<Self, OcrError> {
        Self::with_program("tesseract")
    }

    /// Same probe against a specific executable path.
    pub fn with_program(program: impl Into<PathBuf>) -> Result<Self, OcrError> {
        let program = program.into();
        let probe = Command::new(&program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match probe {
            Ok(status) if status.success() => Ok(Self { program }),
            _ => Err(OcrError::Unavailable(program.display().to_string())),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(
        &self,
        img: &GrayImage,
        psm: PageSegMode,
        whitelist: &str,
    ) -> Result<String, OcrError> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let output = Command::new(&self.program)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg(psm.tesseract_arg())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={whitelist}"))
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

// ── Mock backend ──────────────────────────────────────────────────────────────

/// Returns scripted responses in call order — lets the batch pipeline run
/// in tests without Tesseract installed.
pub struct MockEngine {
    responses: Mutex<VecDeque<String>>,
}

impl MockEngine {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

impl OcrEngine for MockEngine {
    fn recognize(
        &self,
        _img: &GrayImage,
        _psm: PageSegMode,
        _whitelist: &str,
    ) -> Result<String, OcrError> {
        let mut queue = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        Ok(queue.pop_front().unwrap_or_default())
    }
}
