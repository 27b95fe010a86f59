use std::sync::Arc;

use congestion_core::form::FormState;
use congestion_detect::Detector;

use crate::config::ServerConfig;
use crate::controller::FormController;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// The one live upload form and its submission runner.
    pub controller: Arc<FormController>,
}

impl AppState {
    /// Build state with a fresh form initialised from `config`.
    pub fn new(config: ServerConfig, detector: Arc<dyn Detector>) -> Self {
        let form = FormState::new(config.form.default_thresholds, config.form.policy);
        Self {
            config: Arc::new(config),
            controller: FormController::new(form, detector),
        }
    }
}
