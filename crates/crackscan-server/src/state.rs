//! Shared service state and model lifecycle.

use std::path::{Path, PathBuf};

use crackscan_core::{get_device, gpu_available, Engine};
use tracing::{error, info};

/// Filename of the model artifact expected next to the binary.
const MODEL_FILENAME: &str = "crackscan.safetensors";

/// Immutable service state, built once at startup.
///
/// The engine is read-only after construction, so the state is shared
/// across request handlers without locking. When the model failed to load
/// the service stays live but degraded: `engine` is `None` and every
/// predict call answers with a structured error.
pub struct AppState {
    engine: Option<Engine>,
    gpu_enabled: bool,
}

impl AppState {
    /// Loads the model and builds the explanation graph.
    ///
    /// Never fails: a load error is logged and leaves the state degraded.
    #[must_use]
    pub fn load(model_path: &Path) -> Self {
        let engine = match Engine::load(model_path, get_device()) {
            Ok(engine) => Some(engine),
            Err(e) => {
                error!("Model load failed, serving degraded: {e:#}");
                None
            }
        };
        if engine.is_some() {
            info!("Service ready");
        }

        Self {
            engine,
            gpu_enabled: gpu_available(),
        }
    }

    /// Builds state around an already-loaded engine (used by tests).
    #[must_use]
    pub fn with_engine(engine: Option<Engine>) -> Self {
        Self {
            engine,
            gpu_enabled: gpu_available(),
        }
    }

    /// The loaded engine, if startup succeeded.
    #[must_use]
    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    /// Whether an accelerator device was detected.
    #[must_use]
    pub fn gpu_enabled(&self) -> bool {
        self.gpu_enabled
    }
}

/// Resolves the default model path relative to the executable's own
/// directory, not the process working directory.
#[must_use]
pub fn default_model_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(MODEL_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_leaves_state_degraded() {
        let state = AppState::load(Path::new("/nonexistent/crackscan.safetensors"));
        assert!(state.engine().is_none());
    }

    #[test]
    fn test_default_model_path_points_at_exe_dir() {
        let path = default_model_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(MODEL_FILENAME)
        );
    }
}
