//! Saliency overlay rendering.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use image::{imageops::FilterType, ImageBuffer, Luma, Rgb, RgbImage};

use crate::inference::SaliencyMap;

/// Fixed blend weights: `0.6 * original + 0.4 * colorized saliency`.
const ORIGINAL_WEIGHT: f32 = 0.6;
const HEATMAP_WEIGHT: f32 = 0.4;

/// Renders the saliency map over the original image.
///
/// The map is bilinearly rescaled to the original resolution, colorized
/// with a jet colormap (low -> blue, high -> red) and alpha-blended onto
/// the original. Output dimensions equal the original image's, not the
/// model's 224x224 working size.
#[must_use]
pub fn render_overlay(original: &RgbImage, saliency: &SaliencyMap) -> RgbImage {
    let (width, height) = original.dimensions();

    let coarse: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(
        saliency.width() as u32,
        saliency.height() as u32,
        saliency.values().to_vec(),
    )
    .unwrap_or_else(|| ImageBuffer::new(saliency.width() as u32, saliency.height() as u32));

    let fine = image::imageops::resize(&coarse, width, height, FilterType::Triangle);

    RgbImage::from_fn(width, height, |x, y| {
        let heat = jet(fine.get_pixel(x, y)[0]);
        let base = original.get_pixel(x, y);
        let mut blended = [0u8; 3];
        for c in 0..3 {
            let v = ORIGINAL_WEIGHT * f32::from(base[c]) + HEATMAP_WEIGHT * f32::from(heat[c]);
            blended[c] = v.clamp(0.0, 255.0) as u8;
        }
        Rgb(blended)
    })
}

/// Jet colormap: maps `[0, 1]` to a cool-to-hot RGB ramp.
fn jet(v: f32) -> [u8; 3] {
    let v = v.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * v - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * v - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * v - 1.0).abs()).clamp(0.0, 1.0);
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}
