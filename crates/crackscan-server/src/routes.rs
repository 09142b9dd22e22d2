//! HTTP routes: status, health and predict.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, RgbImage};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::state::AppState;

/// Fixed JPEG quality for the heatmap payload.
const HEATMAP_JPEG_QUALITY: u8 = 90;

/// Builds the application router.
///
/// CORS is fully open by design: this serves a public demo frontend, not a
/// hardened deployment.
pub fn app(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `GET /` - service status and accelerator detection.
async fn home(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "System Online",
        "gpu_enabled": state.gpu_enabled(),
    }))
}

/// `GET /health` - liveness, independent of model state.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /predict` - classify one uploaded image and explain the verdict.
///
/// Every failure is converted into a `{"error": message}` body; nothing
/// propagates past this handler.
async fn predict(State(state): State<Arc<AppState>>, multipart: Multipart) -> Json<Value> {
    // Short-circuit before touching the request body when degraded
    let Some(engine) = state.engine() else {
        return error_response("Model is not loaded.");
    };

    let (filename, bytes) = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => return error_response(&message),
    };
    debug!("Predict request: {filename} ({} bytes)", bytes.len());

    let prediction = match engine.predict_with_explanation(&bytes) {
        Ok(prediction) => prediction,
        Err(e) => {
            warn!("Prediction failed for {filename}: {e}");
            return error_response(&e.to_string());
        }
    };

    let heatmap = match encode_heatmap(&prediction.overlay) {
        Ok(uri) => uri,
        Err(e) => {
            warn!("Heatmap encoding failed for {filename}: {e}");
            return error_response(&format!("failed to encode heatmap: {e}"));
        }
    };

    Json(json!({
        "filename": filename,
        "result": prediction.verdict.label.display(),
        "confidence": prediction.verdict.confidence_percent(),
        "raw_score": prediction.verdict.score,
        "heatmap": heatmap,
    }))
}

/// Pulls the uploaded file out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), String> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err("No file uploaded".to_string()),
            Err(e) => return Err(format!("malformed multipart body: {e}")),
        };

        // Accept the conventional "file" field or any field carrying a filename
        if field.name() == Some("file") || field.file_name().is_some() {
            let filename = field
                .file_name()
                .unwrap_or("upload")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| format!("failed to read upload: {e}"))?;
            if bytes.is_empty() {
                return Err("No file uploaded".to_string());
            }
            return Ok((filename, bytes.to_vec()));
        }
    }
}

/// Encodes the overlay as a JPEG data URI at fixed quality.
fn encode_heatmap(overlay: &RgbImage) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, HEATMAP_JPEG_QUALITY);
    encoder.encode(
        overlay.as_raw(),
        overlay.width(),
        overlay.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&buf)))
}

fn error_response(message: &str) -> Json<Value> {
    Json(json!({ "error": message }))
}
