pub mod engine;
pub mod parse;
pub mod preprocess;

pub use engine::{MockEngine, OcrEngine, OcrError, TesseractEngine};
pub use parse::parse_field;
pub use preprocess::{PreprocessError, crop_region, prepare_region};

use anyhow::Result;
use image::RgbaImage;

use crate::config::FieldSpec;

/// High-level function: one field from one screenshot.
///
/// Crops the field's rectangle, preprocesses the crop, runs the engine
/// with the field's layout hint and whitelist, and normalizes the result.
pub fn extract_field(
    img: &RgbaImage,
    spec: &FieldSpec,
    engine: &dyn OcrEngine,
) -> Result<String> {
    let crop = preprocess::crop_region(img, &spec.region)?;
    let prepared = preprocess::prepare_region(&crop, &spec.preprocess);
    let raw = engine.recognize(&prepared, spec.psm, &spec.whitelist)?;
    Ok(parse::parse_field(spec.kind, &raw))
}
