//! Explain command - predict and explain a single image.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use crackscan_core::{get_device, Engine};
use serde_json::json;

/// Arguments for single-image explanation.
#[derive(Args, Clone)]
pub struct ExplainArgs {
    /// Image to classify
    pub image: PathBuf,

    /// Trained weights
    #[arg(short, long, default_value = "crackscan.safetensors")]
    pub model: PathBuf,

    /// Write the Grad-CAM overlay to this path (format from extension)
    #[arg(long, value_name = "FILE")]
    pub heatmap: Option<PathBuf>,
}

/// Runs the full predict + Grad-CAM pipeline on one file and prints the
/// verdict as JSON.
///
/// # Errors
///
/// Returns an error if the model, the image or the pipeline fails.
pub fn run(args: &ExplainArgs) -> Result<()> {
    let engine = Engine::load(&args.model, get_device())?;

    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read image: {}", args.image.display()))?;
    let prediction = engine.predict_with_explanation(&bytes)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "filename": args.image.file_name().and_then(|n| n.to_str()),
            "result": prediction.verdict.label.display(),
            "confidence": prediction.verdict.confidence_percent(),
            "raw_score": prediction.verdict.score,
        }))?
    );

    if let Some(path) = &args.heatmap {
        prediction
            .overlay
            .save(path)
            .with_context(|| format!("Failed to write heatmap: {}", path.display()))?;
        eprintln!("heatmap written to {}", path.display());
    }
    Ok(())
}
