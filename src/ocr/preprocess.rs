//! Per-field crop preparation ahead of OCR.
//!
//! Each crop is binarized against a locally-windowed threshold so uneven
//! lighting across the screenshot does not shift the cutoff, then
//! optionally inverted and upscaled per the field's settings.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use thiserror::Error;

use crate::config::{PreprocessParams, Rect};

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error(
        "region {x},{y} {width}x{height} lies outside the {image_width}x{image_height} image"
    )]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("region has zero width or height")]
    EmptyRegion,
}

/// Crops a fixed rectangle out of a screenshot.
///
/// The rectangle must lie fully inside the image. Out-of-bounds regions are
/// an error rather than being clamped: a truncated or empty crop would feed
/// garbage to the OCR engine.
pub fn crop_region(img: &RgbaImage, region: &Rect) -> Result<RgbaImage, PreprocessError> {
    if region.width == 0 || region.height == 0 {
        return Err(PreprocessError::EmptyRegion);
    }
    let (image_width, image_height) = img.dimensions();
    if region.x as u64 + region.width as u64 > image_width as u64
        || region.y as u64 + region.height as u64 > image_height as u64
    {
        return Err(PreprocessError::OutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            image_width,
            image_height,
        });
    }
    Ok(imageops::crop_imm(img, region.x, region.y, region.width, region.height).to_image())
}

/// Prepares a cropped region for OCR.
///
/// Steps, in order: grayscale, adaptive threshold, optional inversion,
/// cubic upscale when the scale factor exceeds 1. Deterministic: the same
/// crop and settings always produce the same buffer.
pub fn prepare_region(crop: &RgbaImage, params: &PreprocessParams) -> GrayImage {
    let gray = imageops::grayscale(crop);
    let mut out = adaptive_threshold(&gray, params.block_size, params.threshold_c);
    if params.invert {
        imageops::invert(&mut out);
    }
    if params.scale > 1 {
        let (w, h) = out.dimensions();
        out = imageops::resize(
            &out,
            w * params.scale,
            h * params.scale,
            FilterType::CatmullRom,
        );
    }
    out
}

/// Binarizes against the mean of each pixel's `block_size` window, shifted
/// down by `c`. Pixels brighter than the shifted mean become white.
fn adaptive_threshold(image: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);
    let half_block = block_size / 2;

    for y in 0..height {
        for x in 0..width {
            let y_start = y.saturating_sub(half_block);
            let y_end = (y + half_block + 1).min(height);
            let x_start = x.saturating_sub(half_block);
            let x_end = (x + half_block + 1).min(width);

            let mut sum = 0u32;
            let mut count = 0u32;
            for ly in y_start..y_end {
                for lx in x_start..x_end {
                    sum += image.get_pixel(lx, ly)[0] as u32;
                    count += 1;
                }
            }

            let mean = (sum / count) as i32;
            let value = if image.get_pixel(x, y)[0] as i32 > mean - c {
                255u8
            } else {
                0u8
            };
            result.put_pixel(x, y, Luma([value]));
        }
    }

    result
}
