//! Crackscan Core - Concrete crack detection with Grad-CAM explanations.
//!
//! This crate contains the domain types, the binary crack classifier, the
//! image preprocessor, the Grad-CAM explanation pipeline and the overlay
//! compositor, tied together by the [`Engine`] facade.

pub mod domain;
mod engine;
pub mod inference;
pub mod overlay;
pub mod preprocess;

pub use domain::{Label, Prediction, PredictError, Verdict, DECISION_THRESHOLD};
pub use engine::Engine;
pub use inference::{
    get_device, gpu_available, ClassifierConfig, CrackClassifier, ExplanationGraph, SaliencyMap,
};
pub use preprocess::{decode_and_prepare, DecodedImage};
