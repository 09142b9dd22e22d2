//! Evaluate command - metrics on the validation split.

use std::path::PathBuf;

use anyhow::Result;
use candle_core::Device;
use clap::Args;
use crackscan_core::{
    get_device,
    inference::{load_classifier_config, load_safetensors},
    CrackClassifier,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use super::train::score_samples;
use crate::dataset;
use crate::metrics::BinaryMetrics;

/// Arguments for evaluation.
#[derive(Args, Clone)]
pub struct EvaluateArgs {
    /// Dataset root containing Positive/ and Negative/ subdirectories
    pub data_dir: PathBuf,

    /// Trained weights to evaluate
    #[arg(short, long, default_value = "crackscan.safetensors")]
    pub model: PathBuf,

    /// Decision threshold
    #[arg(long, default_value_t = 0.5)]
    pub threshold: f32,

    /// Shuffle/undersampling seed; must match training for a clean split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Emit metrics as JSON instead of a report
    #[arg(long)]
    pub json: bool,
}

/// Scores the validation split and reports confusion metrics.
///
/// # Errors
///
/// Returns an error if the model or dataset cannot be loaded.
pub fn run(args: &EvaluateArgs) -> Result<()> {
    let device = get_device();
    let scored = score_validation(args, &device)?;

    let metrics = BinaryMetrics::from_scores(&scored, args.threshold);
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "threshold": metrics.threshold,
                "samples": scored.len(),
                "confusion": { "tp": metrics.tp, "fp": metrics.fp, "tn": metrics.tn, "fn": metrics.fn_ },
                "accuracy": metrics.accuracy(),
                "precision": metrics.precision(),
                "recall": metrics.recall(),
                "f1": metrics.f1(),
            }))?
        );
    } else {
        println!("Evaluation on {} validation samples", scored.len());
        println!(
            "confusion: tp={} fp={} tn={} fn={}",
            metrics.tp, metrics.fp, metrics.tn, metrics.fn_
        );
        println!("accuracy:  {:.2}%", metrics.accuracy() * 100.0);
        println!("precision: {:.2}%", metrics.precision() * 100.0);
        println!("recall:    {:.2}%", metrics.recall() * 100.0);
        println!("f1:        {:.4}", metrics.f1());
    }
    Ok(())
}

/// Loads the model and scores the validation split.
pub(crate) fn score_validation(args: &EvaluateArgs, device: &Device) -> Result<Vec<(f32, bool)>> {
    let config = load_classifier_config(&args.model)?;
    let vb = load_safetensors(&args.model, device)?;
    let model = CrackClassifier::new(config, vb)?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let dataset = dataset::load_dataset(&args.data_dir, &mut rng)?;
    score_samples(&model, &dataset.validation, device)
}
