//! Sweep command - decision threshold optimization.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use crackscan_core::get_device;

use super::evaluate::{score_validation, EvaluateArgs};
use crate::metrics::BinaryMetrics;

/// Arguments for the threshold sweep.
#[derive(Args, Clone)]
pub struct SweepArgs {
    /// Dataset root containing Positive/ and Negative/ subdirectories
    pub data_dir: PathBuf,

    /// Trained weights to evaluate
    #[arg(short, long, default_value = "crackscan.safetensors")]
    pub model: PathBuf,

    /// Shuffle/undersampling seed; must match training for a clean split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Scores the validation split once, then sweeps thresholds 0.1-0.9 and
/// reports the best F1.
///
/// # Errors
///
/// Returns an error if the model or dataset cannot be loaded.
pub fn run(args: &SweepArgs) -> Result<()> {
    let device = get_device();
    let eval_args = EvaluateArgs {
        data_dir: args.data_dir.clone(),
        model: args.model.clone(),
        threshold: 0.5,
        seed: args.seed,
        json: false,
    };
    let scored = score_validation(&eval_args, &device)?;

    println!(
        "{:<10} {:<10} {:<15} {:<10}",
        "threshold", "accuracy", "recall (crack)", "precision"
    );

    let mut best: Option<BinaryMetrics> = None;
    for step in 1u8..=9 {
        let threshold = f32::from(step) / 10.0;
        let metrics = BinaryMetrics::from_scores(&scored, threshold);
        println!(
            "{:<10.1} {:<10.2} {:<15.2} {:<10.2}",
            threshold,
            metrics.accuracy() * 100.0,
            metrics.recall() * 100.0,
            metrics.precision() * 100.0
        );
        if best.map_or(true, |b| metrics.f1() > b.f1()) {
            best = Some(metrics);
        }
    }

    if let Some(best) = best {
        println!(
            "best threshold: {:.1} (f1 {:.4})",
            best.threshold,
            best.f1()
        );
    }
    Ok(())
}
