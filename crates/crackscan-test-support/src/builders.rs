//! Synthetic image builders for testing.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

/// Builder for creating synthetic test images.
///
/// Provides convenience methods for generating concrete-surface-like
/// images (cracked, intact) in the channel layouts the preprocessor must
/// handle.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Creates a light slab with a dark diagonal streak, crack-like.
    #[must_use]
    pub fn cracked_slab(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            if x.abs_diff(y) < width / 40 + 2 {
                Rgb([25, 22, 20])
            } else {
                Rgb([190, 185, 180])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Creates a uniform light slab with mild texture, no crack.
    #[must_use]
    pub fn intact_slab(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let noise = ((x * 7 + y * 13) % 11) as u8;
            Rgb([180 + noise, 178 + noise, 175 + noise])
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Grayscale variant of the cracked slab.
    #[must_use]
    pub fn cracked_slab_gray(width: u32, height: u32) -> DynamicImage {
        let img = GrayImage::from_fn(width, height, |x, y| {
            if x.abs_diff(y) < width / 40 + 2 {
                Luma([25])
            } else {
                Luma([185])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    /// RGBA variant of the cracked slab (alpha must be dropped downstream).
    #[must_use]
    pub fn cracked_slab_rgba(width: u32, height: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            if x.abs_diff(y) < width / 40 + 2 {
                Rgba([25, 22, 20, 255])
            } else {
                Rgba([190, 185, 180, 128])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    /// Encodes an image as PNG bytes.
    #[must_use]
    pub fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    /// Encodes an image as JPEG bytes.
    #[must_use]
    pub fn jpeg_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        rgb.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }
}
