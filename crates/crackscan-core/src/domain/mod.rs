//! Core domain types for crack detection.

mod error;
mod verdict;

pub use error::PredictError;
pub use verdict::{Label, Prediction, Verdict, DECISION_THRESHOLD};
