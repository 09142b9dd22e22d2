//! Labeled dataset loading with class rebalancing.
//!
//! Expects a directory with `Positive/` and `Negative/` image subdirs. The
//! majority class is undersampled to the minority count before the
//! train/validation split, so the classes stay balanced.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use candle_core::{Device, Tensor};
use crackscan_core::inference::{INPUT_CHANNELS, INPUT_SIZE};
use image::imageops::FilterType;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Fraction of samples held out for validation.
const VALIDATION_SPLIT: f32 = 0.2;

/// One labeled image file.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Path to the image.
    pub path: PathBuf,
    /// True for crack, false for intact.
    pub label: bool,
}

/// Balanced, shuffled dataset split into train and validation sets.
#[derive(Debug)]
pub struct Dataset {
    /// Training samples.
    pub train: Vec<Sample>,
    /// Held-out validation samples.
    pub validation: Vec<Sample>,
}

/// Scans `<root>/Positive` and `<root>/Negative`, rebalances by
/// undersampling the majority class, shuffles with the given rng and
/// splits 80/20.
///
/// # Errors
///
/// Returns an error if either class directory is missing or empty.
pub fn load_dataset(root: &Path, rng: &mut StdRng) -> Result<Dataset> {
    let mut positives = collect_images(&root.join("Positive"))?;
    let mut negatives = collect_images(&root.join("Negative"))?;
    if positives.is_empty() || negatives.is_empty() {
        bail!(
            "dataset at {} needs non-empty Positive/ and Negative/ directories",
            root.display()
        );
    }

    positives.shuffle(rng);
    negatives.shuffle(rng);
    let per_class = positives.len().min(negatives.len());
    positives.truncate(per_class);
    negatives.truncate(per_class);
    info!("Balanced dataset: {per_class} images per class");

    let mut samples: Vec<Sample> = positives
        .into_iter()
        .map(|path| Sample { path, label: true })
        .chain(negatives.into_iter().map(|path| Sample { path, label: false }))
        .collect();
    samples.shuffle(rng);

    let val_len = ((samples.len() as f32) * VALIDATION_SPLIT).round() as usize;
    let validation = samples.split_off(samples.len() - val_len);

    Ok(Dataset {
        train: samples,
        validation,
    })
}

/// Lists supported images in a directory, sorted for determinism.
fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read dataset directory: {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                    })
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Loads one image as a `(3, 224, 224)` tensor scaled to `[-1, 1]`,
/// optionally mirrored for augmentation.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn image_to_tensor(path: &Path, flip: bool, device: &Device) -> Result<Tensor> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open image: {}", path.display()))?
        .to_rgb8();
    let img = if flip {
        image::imageops::flip_horizontal(&img)
    } else {
        img
    };
    let resized = image::imageops::resize(
        &img,
        INPUT_SIZE as u32,
        INPUT_SIZE as u32,
        FilterType::Triangle,
    );

    // HWC u8 -> CHW f32 in [-1, 1]
    let raw = resized.into_raw();
    let mut data = vec![0.0f32; raw.len()];
    for (i, &sample) in raw.iter().enumerate() {
        let channel = i % INPUT_CHANNELS;
        let pixel = i / INPUT_CHANNELS;
        data[channel * INPUT_SIZE * INPUT_SIZE + pixel] = f32::from(sample) / 127.5 - 1.0;
    }

    Tensor::from_vec(data, (INPUT_CHANNELS, INPUT_SIZE, INPUT_SIZE), device)
        .context("Failed to create image tensor")
}

/// Loads a batch of samples as `(inputs, targets)` tensors of shapes
/// `(batch, 3, 224, 224)` and `(batch, 1)`.
///
/// With `augment` set, each image is mirrored with probability 0.5.
///
/// # Errors
///
/// Returns an error if any image fails to load.
pub fn load_batch(
    samples: &[Sample],
    augment: bool,
    rng: &mut StdRng,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let mut inputs = Vec::with_capacity(samples.len());
    let mut targets = Vec::with_capacity(samples.len());
    for sample in samples {
        let flip = augment && rng.gen_bool(0.5);
        inputs.push(image_to_tensor(&sample.path, flip, device)?);
        targets.push(if sample.label { 1.0f32 } else { 0.0 });
    }

    let inputs = Tensor::stack(&inputs, 0)?;
    let targets = Tensor::from_vec(targets, (samples.len(), 1), device)?;
    Ok((inputs, targets))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use rand::SeedableRng;

    fn write_dataset(positives: usize, negatives: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Positive")).unwrap();
        std::fs::create_dir(dir.path().join("Negative")).unwrap();

        for i in 0..positives {
            crackscan_test_support::SyntheticImageBuilder::cracked_slab(64, 64)
                .save(dir.path().join(format!("Positive/crack_{i}.png")))
                .unwrap();
        }
        for i in 0..negatives {
            crackscan_test_support::SyntheticImageBuilder::intact_slab(64, 64)
                .save(dir.path().join(format!("Negative/plain_{i}.png")))
                .unwrap();
        }
        dir
    }

    #[test]
    fn test_majority_class_is_undersampled() {
        let dir = write_dataset(3, 7);
        let mut rng = StdRng::seed_from_u64(42);
        let dataset = load_dataset(dir.path(), &mut rng).unwrap();

        let total = dataset.train.len() + dataset.validation.len();
        assert_eq!(total, 6);

        let positives = dataset
            .train
            .iter()
            .chain(&dataset.validation)
            .filter(|s| s.label)
            .count();
        assert_eq!(positives, 3);
    }

    #[test]
    fn test_empty_class_is_an_error() {
        let dir = write_dataset(2, 0);
        let mut rng = StdRng::seed_from_u64(42);
        assert!(load_dataset(dir.path(), &mut rng).is_err());
    }

    #[test]
    fn test_batch_shapes() {
        let dir = write_dataset(2, 2);
        let mut rng = StdRng::seed_from_u64(42);
        let dataset = load_dataset(dir.path(), &mut rng).unwrap();

        let (inputs, targets) =
            load_batch(&dataset.train, true, &mut rng, &Device::Cpu).unwrap();
        assert_eq!(inputs.dims()[1..], [3, 224, 224]);
        assert_eq!(targets.dims(), &[dataset.train.len(), 1]);
    }
}
