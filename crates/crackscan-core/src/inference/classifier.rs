//! Binary crack classifier.
//!
//! Two-stage model: a conv-block feature extractor followed by a small
//! classification head (global average pooling, dropout, single-unit dense
//! with sigmoid). The extractor depth is config-driven; each block is
//! conv2d 3x3 -> relu -> max-pool 2, halving the spatial size.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Dropout, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};

use super::sigmoid;

/// Model input edge length; must match the training input size exactly.
pub const INPUT_SIZE: usize = 224;

/// Number of input image channels.
pub const INPUT_CHANNELS: usize = 3;

/// Architecture parameters, saved as a sidecar JSON next to the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Output channel width of each conv block, in order.
    pub channels: Vec<usize>,
    /// Dropout probability in the classification head.
    pub dropout: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            // 224 -> 112 -> 56 -> 28 -> 14: final activation volume 14x14x128
            channels: vec![16, 32, 64, 128],
            dropout: 0.2,
        }
    }
}

impl ClassifierConfig {
    /// Spatial edge length of the final feature map.
    #[must_use]
    pub fn feature_map_size(&self) -> usize {
        INPUT_SIZE >> self.channels.len()
    }

    /// Channel count fed into the classification head.
    #[must_use]
    pub fn head_input(&self) -> usize {
        self.channels.last().copied().unwrap_or(INPUT_CHANNELS)
    }
}

/// Operation type of one layer in the feature extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// 2D convolution.
    Conv2d,
    /// ReLU activation.
    Relu,
    /// 2x2 max pooling.
    MaxPool,
}

/// Descriptor of one feature-extractor layer, in structural order.
#[derive(Debug, Clone, Copy)]
pub struct LayerDesc {
    /// Operation type.
    pub kind: LayerKind,
    /// Index of the conv block this layer belongs to.
    pub block: usize,
}

/// Crack classifier model.
///
/// Weight names: `features.block{i}.conv.{weight,bias}` and
/// `head.dense.{weight,bias}`.
#[derive(Debug)]
pub struct CrackClassifier {
    blocks: Vec<Conv2d>,
    dropout: Dropout,
    dense: Linear,
    config: ClassifierConfig,
    device: Device,
}

impl CrackClassifier {
    /// Builds the classifier from weights.
    ///
    /// # Errors
    ///
    /// Returns an error if weights are missing or have unexpected shapes.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config: ClassifierConfig, vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();

        let features = vb.pp("features");
        let mut blocks = Vec::with_capacity(config.channels.len());
        let mut in_channels = INPUT_CHANNELS;
        for (i, &out_channels) in config.channels.iter().enumerate() {
            let conv = conv2d(
                in_channels,
                out_channels,
                3,
                Conv2dConfig {
                    padding: 1,
                    ..Conv2dConfig::default()
                },
                features.pp(format!("block{i}")).pp("conv"),
            )
            .with_context(|| format!("Failed to build conv block {i}"))?;
            blocks.push(conv);
            in_channels = out_channels;
        }

        let dense = linear(config.head_input(), 1, vb.pp("head").pp("dense"))
            .context("Failed to build classification head")?;
        let dropout = Dropout::new(config.dropout);

        Ok(Self {
            blocks,
            dropout,
            dense,
            config,
            device,
        })
    }

    /// Returns the architecture configuration.
    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Returns the device the model lives on.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns feature-extractor layer descriptors in structural order.
    ///
    /// Used by the explanation graph builder to locate the last 2D
    /// convolution without reaching into the block internals.
    #[must_use]
    pub fn layers(&self) -> Vec<LayerDesc> {
        let mut layers = Vec::with_capacity(self.blocks.len() * 3);
        for block in 0..self.blocks.len() {
            layers.push(LayerDesc {
                kind: LayerKind::Conv2d,
                block,
            });
            layers.push(LayerDesc {
                kind: LayerKind::Relu,
                block,
            });
            layers.push(LayerDesc {
                kind: LayerKind::MaxPool,
                block,
            });
        }
        layers
    }

    /// Runs the full feature extractor.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor operation fails.
    pub fn forward_features(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let mut x = x.clone();
        for conv in &self.blocks {
            x = conv.forward(&x)?;
            x = x.relu()?;
            x = x.max_pool2d(2)?;
        }
        Ok(x)
    }

    /// Runs the extractor up to and including the convolution of `block`.
    ///
    /// Earlier blocks run in full; `block` itself stops after its conv so
    /// the raw (pre-activation) output is returned. `block` must come from
    /// [`Self::layers`].
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor operation fails.
    pub fn forward_to_conv(&self, x: &Tensor, block: usize) -> candle_core::Result<Tensor> {
        let mut x = x.clone();
        for conv in &self.blocks[..block] {
            x = conv.forward(&x)?;
            x = x.relu()?;
            x = x.max_pool2d(2)?;
        }
        self.blocks[block].forward(&x)
    }

    /// Runs the extractor from the raw output of `block`'s convolution to
    /// the extractor's final output.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor operation fails.
    pub fn forward_from_conv(&self, a: &Tensor, block: usize) -> candle_core::Result<Tensor> {
        let mut x = a.relu()?.max_pool2d(2)?;
        for conv in &self.blocks[block + 1..] {
            x = conv.forward(&x)?;
            x = x.relu()?;
            x = x.max_pool2d(2)?;
        }
        Ok(x)
    }

    /// Runs the classification head on extractor output, returning logits
    /// of shape `(batch, 1)`.
    ///
    /// Dropout is only active when `train` is true, so inference is
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor operation fails.
    pub fn forward_head(&self, features: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        // Global average pooling over both spatial dimensions
        let x = features.mean(candle_core::D::Minus1)?;
        let x = x.mean(candle_core::D::Minus1)?;
        let x = self.dropout.forward(&x, train)?;
        self.dense.forward(&x)
    }

    /// Full forward pass to logits, shape `(batch, 1)`.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor operation fails.
    pub fn forward_logits(&self, x: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let features = self.forward_features(x)?;
        self.forward_head(&features, train)
    }

    /// Predicts the crack probability for a single preprocessed input of
    /// shape `(1, 3, 224, 224)`.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn predict(&self, x: &Tensor) -> candle_core::Result<f32> {
        let logits = self.forward_logits(x, false)?;
        let logit = logits.squeeze(0)?.squeeze(0)?.to_scalar::<f32>()?;
        Ok(sigmoid(logit))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn small_classifier() -> CrackClassifier {
        let config = ClassifierConfig {
            channels: vec![4, 8],
            dropout: 0.2,
        };
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        CrackClassifier::new(config, vb).unwrap()
    }

    #[test]
    fn test_feature_map_size_math() {
        // 224 halves once per block
        assert_eq!(ClassifierConfig::default().feature_map_size(), 14);
        let small = ClassifierConfig {
            channels: vec![4, 8],
            dropout: 0.0,
        };
        assert_eq!(small.feature_map_size(), 56);
    }

    #[test]
    fn test_layer_descriptors_order() {
        let model = small_classifier();
        let layers = model.layers();
        assert_eq!(layers.len(), 6);
        assert_eq!(layers[0].kind, LayerKind::Conv2d);
        assert_eq!(layers[3].kind, LayerKind::Conv2d);
        assert_eq!(layers[3].block, 1);
        assert_eq!(layers[5].kind, LayerKind::MaxPool);
    }

    #[test]
    fn test_forward_shapes() {
        let model = small_classifier();
        let x = Tensor::zeros((1, 3, 224, 224), DType::F32, &Device::Cpu).unwrap();

        let features = model.forward_features(&x).unwrap();
        assert_eq!(features.dims(), &[1, 8, 56, 56]);

        let logits = model.forward_head(&features, false).unwrap();
        assert_eq!(logits.dims(), &[1, 1]);
    }

    #[test]
    fn test_split_forward_matches_full_forward() {
        let model = small_classifier();
        let x = Tensor::rand(-1.0f32, 1.0, (1, 3, 224, 224), &Device::Cpu).unwrap();

        let full = model.forward_features(&x).unwrap();
        let last = model.layers().len() / 3 - 1;
        let conv = model.forward_to_conv(&x, last).unwrap();
        let split = model.forward_from_conv(&conv, last).unwrap();

        let diff = (full - split)
            .unwrap()
            .abs()
            .unwrap()
            .flatten_all()
            .unwrap()
            .max(0)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_predict_returns_probability() {
        let model = small_classifier();
        let x = Tensor::rand(-1.0f32, 1.0, (1, 3, 224, 224), &Device::Cpu).unwrap();
        let score = model.predict(&x).unwrap();
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_conv_less_classifier_still_predicts() {
        // No conv blocks: head pools the raw channels. Prediction works,
        // only explanation is unavailable.
        let config = ClassifierConfig {
            channels: vec![],
            dropout: 0.0,
        };
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = CrackClassifier::new(config, vb).unwrap();

        let x = Tensor::rand(-1.0f32, 1.0, (1, 3, 224, 224), &Device::Cpu).unwrap();
        let score = model.predict(&x).unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!(model.layers().is_empty());
    }
}
