//! Image decoding and model-input preparation.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use candle_core::{Device, Tensor};
use image::{imageops::FilterType, DynamicImage, RgbImage};

use crate::domain::PredictError;
use crate::inference::{INPUT_CHANNELS, INPUT_SIZE};

/// One decoded upload: the display copy plus the model-ready tensor.
#[derive(Debug)]
pub struct DecodedImage {
    /// Original-resolution RGB image, unscaled, used for the overlay.
    pub original: RgbImage,
    /// Preprocessed input of shape `(1, 3, 224, 224)`, scaled to `[-1, 1]`.
    pub tensor: Tensor,
}

/// Decodes uploaded bytes and prepares both pipeline inputs.
///
/// Grayscale images are replicated to three channels, alpha channels are
/// dropped; the model copy is resized to 224x224 (must match the training
/// input size exactly) and rescaled from `[0, 255]` to `[-1, 1]`.
///
/// # Errors
///
/// [`PredictError::Decode`] for malformed bytes, [`PredictError::Shape`]
/// if the decoded image cannot be coerced to three channels.
pub fn decode_and_prepare(bytes: &[u8], device: &Device) -> Result<DecodedImage, PredictError> {
    let decoded = image::load_from_memory(bytes)?;
    let original = normalize_channels(decoded)?;

    let resized = image::imageops::resize(
        &original,
        INPUT_SIZE as u32,
        INPUT_SIZE as u32,
        FilterType::Triangle,
    );

    // HWC u8 -> CHW f32 in [-1, 1]
    let raw = resized.into_raw();
    if raw.len() != INPUT_SIZE * INPUT_SIZE * INPUT_CHANNELS {
        return Err(PredictError::Shape(format!(
            "resized buffer holds {} samples, expected {}",
            raw.len(),
            INPUT_SIZE * INPUT_SIZE * INPUT_CHANNELS
        )));
    }
    let mut data = vec![0.0f32; raw.len()];
    for (i, &sample) in raw.iter().enumerate() {
        let channel = i % INPUT_CHANNELS;
        let pixel = i / INPUT_CHANNELS;
        data[channel * INPUT_SIZE * INPUT_SIZE + pixel] = f32::from(sample) / 127.5 - 1.0;
    }

    let tensor = Tensor::from_vec(data, (1, INPUT_CHANNELS, INPUT_SIZE, INPUT_SIZE), device)?;

    Ok(DecodedImage { original, tensor })
}

/// Coerces any decoded image to a 3-channel RGB grid.
fn normalize_channels(decoded: DynamicImage) -> Result<RgbImage, PredictError> {
    match decoded {
        // Grayscale: replicate the single channel
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => Ok(decoded.to_rgb8()),
        // Transparency: keep only the color channels
        DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageRgba16(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => Ok(decoded.to_rgb8()),
        DynamicImage::ImageRgb8(img) => Ok(img),
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => Ok(decoded.to_rgb8()),
        other => {
            let channels = other.color().channel_count();
            if channels == 4 {
                Ok(other.to_rgb8())
            } else {
                Err(PredictError::Shape(format!(
                    "cannot coerce {channels}-channel image to RGB"
                )))
            }
        }
    }
}
