//! Train command - fit a classifier head on a labeled image directory.

use std::path::{Path, PathBuf};
use std::sync::PoisonError;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Var};
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use clap::Args;
use crackscan_core::{get_device, ClassifierConfig, CrackClassifier};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::dataset::{self, Dataset, Sample};
use crate::metrics::BinaryMetrics;

/// Arguments for head training.
#[derive(Args, Clone)]
pub struct TrainArgs {
    /// Dataset root containing Positive/ and Negative/ subdirectories
    pub data_dir: PathBuf,

    /// Output path for the trained weights
    #[arg(short, long, default_value = "crackscan.safetensors")]
    pub output: PathBuf,

    /// Training epochs
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Batch size
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Shuffle/undersampling seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Trains the classification head with the feature extractor frozen.
///
/// # Errors
///
/// Returns an error if the dataset cannot be loaded or training fails.
pub fn run(args: &TrainArgs) -> Result<()> {
    let device = get_device();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let dataset = dataset::load_dataset(&args.data_dir, &mut rng)?;
    info!(
        "Training on {} samples, validating on {}",
        dataset.train.len(),
        dataset.validation.len()
    );

    let config = ClassifierConfig::default();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = CrackClassifier::new(config.clone(), vb)?;

    // Feature extractor stays frozen: only head vars reach the optimizer
    let trainable = select_vars(&varmap, &["head."]);
    fit(
        &model, trainable, &dataset, args.epochs, args.batch_size, args.lr, &mut rng, &device,
    )?;

    save_model(&varmap, &config, &args.output)?;
    println!("Model saved to {}", args.output.display());
    Ok(())
}

/// Runs the epoch loop: shuffled batches, BCE-with-logits loss, AdamW on
/// the selected vars, validation accuracy after each epoch.
#[allow(clippy::too_many_arguments)]
pub(crate) fn fit(
    model: &CrackClassifier,
    trainable: Vec<Var>,
    dataset: &Dataset,
    epochs: usize,
    batch_size: usize,
    lr: f64,
    rng: &mut StdRng,
    device: &Device,
) -> Result<()> {
    anyhow::ensure!(!trainable.is_empty(), "no trainable variables selected");
    let mut optimizer = AdamW::new(
        trainable,
        ParamsAdamW {
            lr,
            ..ParamsAdamW::default()
        },
    )?;

    let mut order: Vec<usize> = (0..dataset.train.len()).collect();
    for epoch in 1..=epochs {
        order.shuffle(rng);
        let bar = epoch_bar(order.len().div_ceil(batch_size), epoch, epochs);

        let mut epoch_loss = 0.0f32;
        let mut batches = 0usize;
        for chunk in order.chunks(batch_size) {
            let samples: Vec<Sample> = chunk.iter().map(|&i| dataset.train[i].clone()).collect();
            let (inputs, targets) = dataset::load_batch(&samples, true, rng, device)?;

            let logits = model.forward_logits(&inputs, true)?;
            let loss = loss::binary_cross_entropy_with_logit(&logits, &targets)?;
            optimizer.backward_step(&loss)?;

            epoch_loss += loss.to_scalar::<f32>()?;
            batches += 1;
            bar.inc(1);
        }
        bar.finish_and_clear();

        let scored = score_samples(model, &dataset.validation, device)?;
        let val = BinaryMetrics::from_scores(&scored, 0.5);
        info!(
            "epoch {epoch}/{epochs}: loss {:.4}, val accuracy {:.2}%",
            epoch_loss / batches.max(1) as f32,
            val.accuracy() * 100.0
        );
    }
    Ok(())
}

/// Scores each sample with the current weights.
pub(crate) fn score_samples(
    model: &CrackClassifier,
    samples: &[Sample],
    device: &Device,
) -> Result<Vec<(f32, bool)>> {
    let mut scored = Vec::with_capacity(samples.len());
    for sample in samples {
        let input = dataset::image_to_tensor(&sample.path, false, device)?.unsqueeze(0)?;
        let score = model.predict(&input)?;
        scored.push((score, sample.label));
    }
    Ok(scored)
}

/// Collects vars whose name starts with one of the prefixes, sorted by
/// name so optimizer state stays stable across runs.
pub(crate) fn select_vars(varmap: &VarMap, prefixes: &[&str]) -> Vec<Var> {
    let data = varmap
        .data()
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let mut named: Vec<(String, Var)> = data
        .iter()
        .filter(|(name, _)| prefixes.iter().any(|p| name.starts_with(p)))
        .map(|(name, var)| (name.clone(), var.clone()))
        .collect();
    named.sort_by(|a, b| a.0.cmp(&b.0));
    named.into_iter().map(|(_, var)| var).collect()
}

/// Writes the weights plus the sidecar architecture config.
pub(crate) fn save_model(
    varmap: &VarMap,
    config: &ClassifierConfig,
    path: &Path,
) -> Result<()> {
    varmap
        .save(path)
        .with_context(|| format!("Failed to save weights to {}", path.display()))?;
    let config_path = path.with_extension("json");
    std::fs::write(&config_path, serde_json::to_string_pretty(config)?)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(())
}

fn epoch_bar(batches: usize, epoch: usize, epochs: usize) -> ProgressBar {
    let bar = ProgressBar::new(batches as u64);
    bar.set_style(
        ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_prefix(format!("epoch {epoch}/{epochs}"));
    bar
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_select_vars_filters_by_prefix() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = ClassifierConfig {
            channels: vec![4, 8],
            dropout: 0.0,
        };
        let _model = CrackClassifier::new(config, vb).unwrap();

        // head: dense weight + bias
        assert_eq!(select_vars(&varmap, &["head."]).len(), 2);
        // one conv block: weight + bias
        assert_eq!(select_vars(&varmap, &["features.block1."]).len(), 2);
        assert!(select_vars(&varmap, &["nonexistent."]).is_empty());
    }
}
