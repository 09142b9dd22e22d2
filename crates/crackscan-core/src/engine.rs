//! Inference engine: owns the loaded classifier and its explanation graph.

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::Device;
use tracing::info;

use crate::domain::{Prediction, PredictError, Verdict};
use crate::inference::{
    load_classifier_config, load_safetensors, ClassifierConfig, CrackClassifier, ExplanationGraph,
};
use crate::overlay::render_overlay;
use crate::preprocess::decode_and_prepare;

/// Loaded classifier plus its cached explanation graph.
///
/// Built once at startup and immutable afterwards, so it can be shared
/// freely across concurrently handled requests. All request-scoped buffers
/// (decoded images, tensors, saliency maps) are locals of the methods below
/// and are released when the call returns, keeping resident memory flat
/// under sustained load.
#[derive(Debug)]
pub struct Engine {
    classifier: CrackClassifier,
    graph: ExplanationGraph,
    device: Device,
}

impl Engine {
    /// Loads the model artifact and builds the explanation graph.
    ///
    /// Graph construction happens here, exactly once per loaded classifier.
    /// A classifier whose feature extractor lacks any convolution layer
    /// fails the load, so misconfiguration surfaces at startup rather than
    /// on the first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights cannot be read or the explanation
    /// graph cannot be built.
    pub fn load(model_path: impl AsRef<Path>, device: Device) -> Result<Self> {
        let model_path = model_path.as_ref();
        let config = load_classifier_config(model_path)?;
        let vb = load_safetensors(model_path, &device)?;
        let classifier = CrackClassifier::new(config, vb)
            .with_context(|| format!("Failed to build classifier from {}", model_path.display()))?;
        let graph = ExplanationGraph::build(&classifier)
            .context("Classifier is unusable for explanation")?;

        info!("Model loaded from {}", model_path.display());
        Ok(Self {
            classifier,
            graph,
            device,
        })
    }

    /// Builds an engine from an already-constructed classifier.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::Configuration`] if the explanation graph
    /// cannot be built.
    pub fn from_classifier(classifier: CrackClassifier) -> Result<Self, PredictError> {
        let graph = ExplanationGraph::build(&classifier)?;
        let device = classifier.device().clone();
        Ok(Self {
            classifier,
            graph,
            device,
        })
    }

    /// Runs the full pipeline on uploaded bytes:
    /// decode -> predict -> Grad-CAM -> composite.
    ///
    /// # Errors
    ///
    /// Returns the enumerated [`PredictError`] for any failing step; no
    /// panics cross this boundary.
    pub fn predict_with_explanation(&self, bytes: &[u8]) -> Result<Prediction, PredictError> {
        let decoded = decode_and_prepare(bytes, &self.device)?;

        let score = self.classifier.predict(&decoded.tensor)?;
        let verdict = Verdict::from_score(score);

        let saliency = self.graph.saliency(&self.classifier, &decoded.tensor)?;
        let overlay = render_overlay(&decoded.original, &saliency);

        Ok(Prediction { verdict, overlay })
    }

    /// Plain prediction without an explanation.
    ///
    /// # Errors
    ///
    /// Returns a [`PredictError`] if decoding or inference fails.
    pub fn predict(&self, bytes: &[u8]) -> Result<Verdict, PredictError> {
        let decoded = decode_and_prepare(bytes, &self.device)?;
        let score = self.classifier.predict(&decoded.tensor)?;
        Ok(Verdict::from_score(score))
    }

    /// Access to the underlying classifier.
    #[must_use]
    pub fn classifier(&self) -> &CrackClassifier {
        &self.classifier
    }

    /// The architecture the engine was loaded with.
    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        self.classifier.config()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use candle_core::DType;
    use candle_nn::{VarBuilder, VarMap};
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn small_engine() -> Engine {
        let config = ClassifierConfig {
            channels: vec![4, 8],
            dropout: 0.2,
        };
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let classifier = CrackClassifier::new(config, vb).unwrap();
        Engine::from_classifier(classifier).unwrap()
    }

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            // Diagonal dark streak on a light background
            if x.abs_diff(y) < 4 {
                Rgba([30, 30, 30, 255])
            } else {
                Rgba([200, 200, 200, 255])
            }
        }));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_pipeline_produces_overlay_at_original_size() {
        let engine = small_engine();
        let prediction = engine.predict_with_explanation(&rgba_png(300, 200)).unwrap();

        assert_eq!(prediction.overlay.dimensions(), (300, 200));
        assert!((0.0..=1.0).contains(&prediction.verdict.score));
        assert!((0.0..=1.0).contains(&prediction.verdict.confidence));
    }

    #[test]
    fn test_pipeline_rejects_garbage_bytes() {
        let engine = small_engine();
        let err = engine.predict_with_explanation(b"garbage").unwrap_err();
        assert!(matches!(err, PredictError::Decode(_)));
    }

    #[test]
    fn test_missing_model_file_fails_load() {
        assert!(Engine::load("/nonexistent/crackscan.safetensors", Device::Cpu).is_err());
    }

    #[test]
    fn test_conv_less_classifier_fails_at_load() {
        let config = ClassifierConfig {
            channels: vec![],
            dropout: 0.0,
        };
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let classifier = CrackClassifier::new(config, vb).unwrap();

        let err = Engine::from_classifier(classifier).unwrap_err();
        assert!(matches!(err, PredictError::Configuration(_)));
    }
}
