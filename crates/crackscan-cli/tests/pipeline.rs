//! End-to-end pipeline tests: train, evaluate, sweep, explain.
//!
//! Uses tiny synthetic datasets so the whole loop runs on CPU in seconds.

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::Path;

use assert_cmd::Command;
use crackscan_test_support::{save_random_model, SyntheticImageBuilder};
use predicates::prelude::*;
use serde_json::Value;

fn write_dataset(root: &Path, per_class: usize) {
    std::fs::create_dir_all(root.join("Positive")).unwrap();
    std::fs::create_dir_all(root.join("Negative")).unwrap();
    for i in 0..per_class {
        SyntheticImageBuilder::cracked_slab(96, 96)
            .save(root.join(format!("Positive/crack_{i}.png")))
            .unwrap();
        SyntheticImageBuilder::intact_slab(96, 96)
            .save(root.join(format!("Negative/plain_{i}.png")))
            .unwrap();
    }
}

#[test]
fn test_train_writes_model_and_evaluate_reads_it() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("dataset");
    write_dataset(&data_dir, 5);
    let model_path = temp_dir.path().join("model.safetensors");

    let mut train = Command::cargo_bin("crackscan").unwrap();
    train
        .arg("train")
        .arg(&data_dir)
        .arg("--output")
        .arg(&model_path)
        .arg("--epochs")
        .arg("1")
        .arg("--batch-size")
        .arg("4");
    train.assert().success();

    assert!(model_path.exists());
    assert!(model_path.with_extension("json").exists());

    let mut evaluate = Command::cargo_bin("crackscan").unwrap();
    evaluate
        .arg("evaluate")
        .arg(&data_dir)
        .arg("--model")
        .arg(&model_path)
        .arg("--json");
    let output = evaluate.assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();

    let metrics: Value = serde_json::from_str(&stdout).unwrap();
    let accuracy = metrics["accuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn test_sweep_reports_best_threshold() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("dataset");
    write_dataset(&data_dir, 5);
    let model_path = temp_dir.path().join("model.safetensors");
    save_random_model(&model_path);

    let mut sweep = Command::cargo_bin("crackscan").unwrap();
    sweep
        .arg("sweep")
        .arg(&data_dir)
        .arg("--model")
        .arg(&model_path);
    sweep
        .assert()
        .success()
        .stdout(predicate::str::contains("best threshold"));
}

#[test]
fn test_explain_prints_verdict_and_writes_heatmap() {
    let temp_dir = tempfile::tempdir().unwrap();
    let model_path = temp_dir.path().join("model.safetensors");
    save_random_model(&model_path);

    let img_path = temp_dir.path().join("slab.png");
    SyntheticImageBuilder::cracked_slab_rgba(300, 200)
        .save(&img_path)
        .unwrap();
    let heatmap_path = temp_dir.path().join("heatmap.jpg");

    let mut explain = Command::cargo_bin("crackscan").unwrap();
    explain
        .arg("explain")
        .arg(&img_path)
        .arg("--model")
        .arg(&model_path)
        .arg("--heatmap")
        .arg(&heatmap_path);
    let output = explain.assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();

    let verdict: Value = serde_json::from_str(&stdout).unwrap();
    let raw_score = verdict["raw_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&raw_score));
    let result = verdict["result"].as_str().unwrap();
    assert!(result.contains("CRACK") || result.contains("Safe"));

    // Heatmap keeps the original resolution, not the 224x224 working size
    let heatmap = image::open(&heatmap_path).unwrap();
    assert_eq!((heatmap.width(), heatmap.height()), (300, 200));
}
