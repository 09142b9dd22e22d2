//! Small model fixtures for tests.

use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use crackscan_core::{ClassifierConfig, CrackClassifier, Engine};

/// A two-block architecture small enough for CPU test runs.
#[must_use]
pub fn small_config() -> ClassifierConfig {
    ClassifierConfig {
        channels: vec![4, 8],
        dropout: 0.2,
    }
}

/// Builds an engine around a randomly initialized small classifier.
#[must_use]
pub fn random_engine() -> Engine {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let classifier = CrackClassifier::new(small_config(), vb).expect("build classifier");
    Engine::from_classifier(classifier).expect("build engine")
}

/// Writes a randomly initialized small model artifact (weights plus the
/// sidecar config) so binaries can load it from disk.
pub fn save_random_model(model_path: &Path) {
    let config = small_config();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    // Materializes all variables in the varmap
    let _classifier = CrackClassifier::new(config.clone(), vb).expect("build classifier");

    varmap.save(model_path).expect("save weights");
    std::fs::write(
        model_path.with_extension("json"),
        serde_json::to_string_pretty(&config).expect("serialize config"),
    )
    .expect("write sidecar config");
}
