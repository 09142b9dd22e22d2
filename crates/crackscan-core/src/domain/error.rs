//! Error taxonomy for the prediction pipeline.
//!
//! Every failure a request can hit is enumerated here so the service
//! boundary can convert it into a structured `{error: message}` response
//! instead of letting a fault escape.

use thiserror::Error;

/// Errors produced by the prediction and explanation pipeline.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PredictError {
    /// The uploaded bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The decoded image could not be coerced to three channels.
    #[error("unexpected image shape: {0}")]
    Shape(String),

    /// The explanation graph could not be built from the classifier.
    ///
    /// Raised at model load time, never per request. The classifier
    /// remains usable for plain prediction without explanations.
    #[error("explanation graph configuration error: {0}")]
    Configuration(String),

    /// Gradient computation failed while producing a saliency map.
    ///
    /// Indicates a disconnected graph, a configuration bug rather than
    /// a retryable condition.
    #[error("gradient computation failed: {0}")]
    Graph(String),

    /// The model never loaded; the service is running degraded.
    #[error("Model is not loaded.")]
    ModelUnavailable,

    /// Tensor or inference failure inside the ML runtime.
    #[error("inference error: {0}")]
    Inference(#[from] candle_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_unavailable_message_is_stable() {
        // The HTTP layer surfaces this string verbatim to clients.
        assert_eq!(
            PredictError::ModelUnavailable.to_string(),
            "Model is not loaded."
        );
    }
}
