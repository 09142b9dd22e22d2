//! Grad-CAM explanation pipeline.
//!
//! [`ExplanationGraph::build`] scans the feature extractor's layers in
//! reverse structural order for the last 2D convolution and caches the
//! split point. Building happens once per loaded classifier, at load time;
//! re-deriving it per request is what caused unbounded memory growth in the
//! service this replaces, so the per-request path only ever runs the two
//! cached split forwards.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use candle_core::{Tensor, Var, D};
use tracing::debug;

use super::classifier::{CrackClassifier, LayerKind};
use crate::domain::PredictError;

/// Epsilon guarding the normalization against an all-zero map.
const NORM_EPSILON: f32 = 1e-8;

/// Normalized 2D saliency map in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyMap {
    values: Vec<f32>,
    width: usize,
    height: usize,
}

impl SaliencyMap {
    /// Map width in cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Map height in cells.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Value at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// Row-major cell values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Cached gradient-tracing view over a loaded classifier.
///
/// Holds the index of the block whose convolution is the explanation
/// target. The classifier itself is borrowed per call; the graph carries no
/// tensors and is trivially shared across requests.
#[derive(Debug, Clone, Copy)]
pub struct ExplanationGraph {
    target_block: usize,
}

impl ExplanationGraph {
    /// Locates the last 2D convolution in the feature extractor.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::Configuration`] if the extractor contains no
    /// convolution layer. The classifier then stays usable for plain
    /// prediction, but not for explanation.
    pub fn build(classifier: &CrackClassifier) -> Result<Self, PredictError> {
        let layers = classifier.layers();
        let target_block = layers
            .iter()
            .rev()
            .find(|desc| desc.kind == LayerKind::Conv2d)
            .map(|desc| desc.block)
            .ok_or_else(|| {
                PredictError::Configuration(
                    "feature extractor has no 2D convolution layer".to_string(),
                )
            })?;

        debug!("Explanation target: conv of block {target_block}");
        Ok(Self { target_block })
    }

    /// Computes the Grad-CAM saliency map for one preprocessed input of
    /// shape `(1, 3, 224, 224)`.
    ///
    /// The last conv activations are detached and re-entered as a gradient
    /// variable, so backpropagation only traverses the layers above the
    /// split. Everything tensor-shaped is dropped when this returns; only
    /// the plain numeric map survives.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::Graph`] if no gradient reaches the conv
    /// activations, or an inference error if a tensor op fails.
    pub fn saliency(
        &self,
        classifier: &CrackClassifier,
        input: &Tensor,
    ) -> Result<SaliencyMap, PredictError> {
        // (1, C, H, W) raw activations of the target convolution
        let activations = classifier
            .forward_to_conv(input, self.target_block)?
            .detach();
        let tracked = Var::from_tensor(&activations)?;

        let features = classifier.forward_from_conv(tracked.as_tensor(), self.target_block)?;
        let logits = classifier.forward_head(&features, false)?;

        // Scalar prediction: index 0 of the single output unit
        let logit = logits.squeeze(0)?.squeeze(0)?;
        let score = candle_nn::ops::sigmoid(&logit)?;

        let grads = score.backward()?;
        let grad = grads.get(&tracked).ok_or_else(|| {
            PredictError::Graph("no gradient reached the conv activations".to_string())
        })?;

        // One importance weight per channel: spatial mean of the gradient
        let weights = grad.mean_keepdim(D::Minus1)?.mean_keepdim(D::Minus2)?;

        // Channel-weighted sum of activations, positive contributions only
        let cam = activations
            .broadcast_mul(&weights)?
            .sum(1)?
            .squeeze(0)?
            .relu()?;

        let max = cam.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        let cam = (cam / f64::from(max + NORM_EPSILON))?;

        let (height, width) = cam.dims2()?;
        let values = cam.flatten_all()?.to_vec1::<f32>()?;

        Ok(SaliencyMap {
            values,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::inference::ClassifierConfig;
    use candle_core::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};

    fn small_classifier(channels: Vec<usize>) -> CrackClassifier {
        let config = ClassifierConfig {
            channels,
            dropout: 0.2,
        };
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        CrackClassifier::new(config, vb).unwrap()
    }

    fn random_input() -> Tensor {
        Tensor::rand(-1.0f32, 1.0, (1, 3, 224, 224), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_build_targets_last_conv_block() {
        let model = small_classifier(vec![4, 8, 8]);
        let graph = ExplanationGraph::build(&model).unwrap();
        assert_eq!(graph.target_block, 2);
    }

    #[test]
    fn test_build_fails_without_conv_layer() {
        let model = small_classifier(vec![]);
        let err = ExplanationGraph::build(&model).unwrap_err();
        assert!(matches!(err, PredictError::Configuration(_)));
    }

    #[test]
    fn test_saliency_values_in_unit_range() {
        let model = small_classifier(vec![4, 8]);
        let graph = ExplanationGraph::build(&model).unwrap();
        let map = graph.saliency(&model, &random_input()).unwrap();

        assert_eq!(map.width(), 56);
        assert_eq!(map.height(), 56);
        for &v in map.values() {
            assert!((0.0..=1.0).contains(&v), "saliency value {v} out of range");
        }
    }

    #[test]
    fn test_saliency_max_is_one_when_non_degenerate() {
        let model = small_classifier(vec![4, 8]);
        let graph = ExplanationGraph::build(&model).unwrap();
        let map = graph.saliency(&model, &random_input()).unwrap();

        let max = map.values().iter().copied().fold(0.0f32, f32::max);
        if max > 0.0 {
            assert!((max - 1.0).abs() < 1e-5, "non-degenerate max was {max}");
        }
    }

    #[test]
    fn test_saliency_is_deterministic() {
        // Same weights, same input, dropout inactive: identical maps.
        let model = small_classifier(vec![4, 8]);
        let graph = ExplanationGraph::build(&model).unwrap();
        let input = random_input();

        let first = graph.saliency(&model, &input).unwrap();
        let second = graph.saliency(&model, &input).unwrap();
        assert_eq!(first, second);
    }
}
