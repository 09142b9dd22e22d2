//! Test support utilities for crackscan.
//!
//! Synthetic concrete-surface images and small model fixtures shared by
//! unit and integration tests across the workspace.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

mod builders;
mod models;

pub use builders::SyntheticImageBuilder;
pub use models::{random_engine, save_random_model, small_config};
