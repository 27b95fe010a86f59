pub mod form;
pub mod health;
pub mod videos;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree.
///
/// Route hierarchy:
///
/// ```text
/// /                     form page (GET)
/// /file                 select a file (POST, multipart)
/// /thresholds           edit thresholds (POST, urlencoded)
/// /submit               submit for detection (POST)
/// /notice/dismiss       dismiss the current notice (POST)
/// /api/state            form snapshot as JSON (GET)
/// /videos/{id}          result video playback (GET)
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(form::router())
        .nest("/videos", videos::router())
}
