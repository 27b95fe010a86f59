use axum::routing::{get, post};
use axum::Router;

use crate::handlers::form;
use crate::state::AppState;

/// Routes for the upload form page and its actions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(form::show_form))
        .route("/file", post(form::select_file))
        .route("/thresholds", post(form::update_thresholds))
        .route("/submit", post(form::submit))
        .route("/notice/dismiss", post(form::dismiss_notice))
        .route("/api/state", get(form::form_state))
}
