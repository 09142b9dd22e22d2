//! Prediction verdict and confidence derivation.

use serde::{Deserialize, Serialize};

/// Decision threshold on the raw sigmoid score.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Binary classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// A crack was detected.
    Positive,
    /// No crack detected.
    Negative,
}

impl Label {
    /// Human-facing result string reported by the API.
    #[must_use]
    pub const fn display(self) -> &'static str {
        match self {
            Self::Positive => "CRACK DETECTED ⚠️",
            Self::Negative => "Safe / No Crack ✅",
        }
    }
}

/// Verdict derived from a raw classifier score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Raw sigmoid score in `[0, 1]`.
    pub score: f32,
    /// Derived binary label.
    pub label: Label,
    /// Derived confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Verdict {
    /// Derives label and confidence from a raw score.
    ///
    /// Strictly-greater threshold: a score of exactly 0.5 is negative.
    /// The two confidence formulas are intentionally asymmetric: positive
    /// confidence is the rescaled distance above the threshold
    /// `(score - 0.5) / 0.5`, negative confidence is `1 - score`.
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score > DECISION_THRESHOLD {
            Self {
                score,
                label: Label::Positive,
                confidence: (score - DECISION_THRESHOLD) / DECISION_THRESHOLD,
            }
        } else {
            Self {
                score,
                label: Label::Negative,
                confidence: 1.0 - score,
            }
        }
    }

    /// Formats the confidence as a percentage string, e.g. `"64.00%"`.
    #[must_use]
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

/// Complete result of one prediction request.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Score, label and confidence.
    pub verdict: Verdict,
    /// Grad-CAM overlay at the original image resolution.
    pub overlay: image::RgbImage,
}
