//! Binary classification metrics.

// Allow common ML code patterns
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

/// Confusion counts and derived metrics at one decision threshold.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BinaryMetrics {
    /// Threshold the scores were cut at.
    pub threshold: f32,
    /// True positives.
    pub tp: usize,
    /// False positives.
    pub fp: usize,
    /// True negatives.
    pub tn: usize,
    /// False negatives.
    pub fn_: usize,
}

impl BinaryMetrics {
    /// Computes confusion counts from `(score, is_crack)` pairs.
    ///
    /// Scores strictly above the threshold count as positive, matching the
    /// serving-side decision rule.
    #[must_use]
    pub fn from_scores(scored: &[(f32, bool)], threshold: f32) -> Self {
        let mut metrics = Self {
            threshold,
            tp: 0,
            fp: 0,
            tn: 0,
            fn_: 0,
        };
        for &(score, actual) in scored {
            let predicted = score > threshold;
            match (predicted, actual) {
                (true, true) => metrics.tp += 1,
                (true, false) => metrics.fp += 1,
                (false, false) => metrics.tn += 1,
                (false, true) => metrics.fn_ += 1,
            }
        }
        metrics
    }

    /// Fraction of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f32 {
        let total = self.tp + self.fp + self.tn + self.fn_;
        if total == 0 {
            return 0.0;
        }
        (self.tp + self.tn) as f32 / total as f32
    }

    /// Of predicted cracks, the fraction that were real.
    #[must_use]
    pub fn precision(&self) -> f32 {
        if self.tp + self.fp == 0 {
            return 0.0;
        }
        self.tp as f32 / (self.tp + self.fp) as f32
    }

    /// Of real cracks, the fraction that were found.
    #[must_use]
    pub fn recall(&self) -> f32 {
        if self.tp + self.fn_ == 0 {
            return 0.0;
        }
        self.tp as f32 / (self.tp + self.fn_) as f32
    }

    /// Harmonic mean of precision and recall.
    #[must_use]
    pub fn f1(&self) -> f32 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use super::*;

    fn sample_scores() -> Vec<(f32, bool)> {
        vec![
            (0.9, true),  // tp
            (0.8, true),  // tp
            (0.7, false), // fp
            (0.4, true),  // fn
            (0.2, false), // tn
            (0.1, false), // tn
        ]
    }

    #[test]
    fn test_confusion_counts() {
        let m = BinaryMetrics::from_scores(&sample_scores(), 0.5);
        assert_eq!((m.tp, m.fp, m.tn, m.fn_), (2, 1, 2, 1));
    }

    #[test]
    fn test_derived_metrics() {
        let m = BinaryMetrics::from_scores(&sample_scores(), 0.5);
        assert_eq!(m.accuracy(), 4.0 / 6.0);
        assert_eq!(m.precision(), 2.0 / 3.0);
        assert_eq!(m.recall(), 2.0 / 3.0);
        assert!((m.f1() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_strict() {
        let m = BinaryMetrics::from_scores(&[(0.5, true)], 0.5);
        assert_eq!(m.fn_, 1);
        assert_eq!(m.tp, 0);
    }

    #[test]
    fn test_degenerate_inputs_do_not_divide_by_zero() {
        let m = BinaryMetrics::from_scores(&[], 0.5);
        assert_eq!(m.accuracy(), 0.0);
        assert_eq!(m.precision(), 0.0);
        assert_eq!(m.recall(), 0.0);
        assert_eq!(m.f1(), 0.0);
    }
}
