//! Crackscan HTTP inference service.
//!
//! axum application serving the crack classifier: a status route, a health
//! probe and a multipart `/predict` endpoint returning the verdict plus a
//! Grad-CAM heatmap as a JPEG data URI.

mod routes;
mod state;

pub use routes::app;
pub use state::{default_model_path, AppState};
