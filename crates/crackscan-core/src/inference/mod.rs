//! ML inference engine using Candle.
//!
//! Provides model loading, the crack classifier and the Grad-CAM
//! explanation pipeline built on top of it.

mod classifier;
mod device;
mod gradcam;
mod loader;

pub use classifier::{
    ClassifierConfig, CrackClassifier, LayerDesc, LayerKind, INPUT_CHANNELS, INPUT_SIZE,
};
pub use device::{get_device, gpu_available};
pub use gradcam::{ExplanationGraph, SaliencyMap};
pub use loader::{load_classifier_config, load_safetensors};

/// Sigmoid activation function.
#[inline]
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
