//! Handlers for the upload form.
//!
//! Each mutating route maps to one form event and answers with a
//! `303 See Other` back to the page, so a reload never re-posts.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, Redirect};
use axum::{Form, Json};
use congestion_core::form::{FormEvent, SelectedFile};
use congestion_core::thresholds::ThresholdValue;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::view::{self, FormSnapshot};

/// Raw text of the threshold controls. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct ThresholdsForm {
    pub moderate_threshold: Option<String>,
    pub heavy_threshold: Option<String>,
}

/// GET /
pub async fn show_form(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.controller.snapshot().await;
    Html(view::render_page(&snapshot))
}

/// GET /api/state
pub async fn form_state(State(state): State<AppState>) -> Json<DataResponse<FormSnapshot>> {
    Json(DataResponse {
        data: state.controller.snapshot().await,
    })
}

/// POST /file
///
/// Accepts a multipart form with a required `file` field and makes it the
/// selected file. A part with an empty file name counts as no file.
pub async fn select_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Redirect> {
    let mut selected: Option<SelectedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some("file") {
            continue; // ignore unknown fields
        }
        let file_name = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(multipart_error)?;
        if !file_name.is_empty() {
            selected = Some(SelectedFile::new(file_name, content_type, bytes));
        }
    }

    let file =
        selected.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    tracing::info!(
        file_name = %file.file_name,
        bytes = file.bytes.len(),
        "File selected",
    );

    state.controller.dispatch(FormEvent::FileSelected(file)).await;
    Ok(Redirect::to("/"))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// POST /thresholds
pub async fn update_thresholds(
    State(state): State<AppState>,
    Form(input): Form<ThresholdsForm>,
) -> Redirect {
    apply_threshold_edits(&state, input).await;
    Redirect::to("/")
}

/// POST /submit
///
/// The submit form carries the threshold controls, so whatever they hold is
/// applied before the submission. A bare POST submits the current values.
pub async fn submit(
    State(state): State<AppState>,
    input: Result<Form<ThresholdsForm>, FormRejection>,
) -> AppResult<Redirect> {
    match input {
        Ok(Form(input)) => apply_threshold_edits(&state, input).await,
        Err(FormRejection::InvalidFormContentType(_)) => {}
        Err(e) => return Err(AppError::BadRequest(e.body_text())),
    }
    state.controller.dispatch(FormEvent::SubmitRequested).await;
    Ok(Redirect::to("/"))
}

async fn apply_threshold_edits(state: &AppState, input: ThresholdsForm) {
    if let Some(raw) = input.moderate_threshold {
        let value = ThresholdValue::parse(&raw);
        state
            .controller
            .dispatch(FormEvent::ModerateEdited(value))
            .await;
    }
    if let Some(raw) = input.heavy_threshold {
        let value = ThresholdValue::parse(&raw);
        state.controller.dispatch(FormEvent::HeavyEdited(value)).await;
    }
}

/// POST /notice/dismiss
pub async fn dismiss_notice(State(state): State<AppState>) -> Redirect {
    state.controller.dispatch(FormEvent::NoticeDismissed).await;
    Redirect::to("/")
}
