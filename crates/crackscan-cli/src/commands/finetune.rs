//! Finetune command - unfreeze the top feature blocks at a low rate.

use std::path::PathBuf;

use anyhow::{Context, Result};
use candle_core::DType;
use candle_nn::{VarBuilder, VarMap};
use clap::Args;
use crackscan_core::{get_device, inference::load_classifier_config, CrackClassifier};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use super::train::{fit, save_model, select_vars};
use crate::dataset;

/// Arguments for fine-tuning.
#[derive(Args, Clone)]
pub struct FinetuneArgs {
    /// Dataset root containing Positive/ and Negative/ subdirectories
    pub data_dir: PathBuf,

    /// Trained weights to start from
    #[arg(short, long, default_value = "crackscan.safetensors")]
    pub model: PathBuf,

    /// Output path for the upgraded weights
    #[arg(short, long, default_value = "crackscan_v2.safetensors")]
    pub output: PathBuf,

    /// Number of top conv blocks to unfreeze
    #[arg(long, default_value_t = 1)]
    pub unfreeze: usize,

    /// Training epochs
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Batch size
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Learning rate; much lower than head training on purpose
    #[arg(long, default_value_t = 1e-5)]
    pub lr: f64,

    /// Shuffle/undersampling seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Continues training with the head plus the top N conv blocks unfrozen.
///
/// # Errors
///
/// Returns an error if the model or dataset cannot be loaded or training
/// fails.
pub fn run(args: &FinetuneArgs) -> Result<()> {
    let device = get_device();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let dataset = dataset::load_dataset(&args.data_dir, &mut rng)?;

    let config = load_classifier_config(&args.model)?;
    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = CrackClassifier::new(config.clone(), vb)?;
    varmap
        .load(&args.model)
        .with_context(|| format!("Failed to load weights from {}", args.model.display()))?;

    // Head plus the top N blocks; lower blocks keep their generic filters
    let blocks = config.channels.len();
    let first_unfrozen = blocks.saturating_sub(args.unfreeze);
    let mut prefixes: Vec<String> = vec!["head.".to_string()];
    for block in first_unfrozen..blocks {
        prefixes.push(format!("features.block{block}."));
    }
    let prefix_refs: Vec<&str> = prefixes.iter().map(String::as_str).collect();
    let trainable = select_vars(&varmap, &prefix_refs);
    info!(
        "Fine-tuning {} vars (blocks {first_unfrozen}..{blocks} + head) at lr {}",
        trainable.len(),
        args.lr
    );

    fit(
        &model, trainable, &dataset, args.epochs, args.batch_size, args.lr, &mut rng, &device,
    )?;

    save_model(&varmap, &config, &args.output)?;
    println!("Upgraded model saved to {}", args.output.display());
    Ok(())
}
