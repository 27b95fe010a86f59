//! Handlers for the `/videos` resource.
//!
//! Serves result videos from the in-memory view store, with HTTP range
//! request support so players can seek.

use axum::extract::{Path, State};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Parse a `Range: bytes=START-END` header value.
/// Returns `(start, optional_end)`.
fn parse_range_header(range: &str) -> Option<(u64, Option<u64>)> {
    let range = range.strip_prefix("bytes=")?;
    let (start, end) = range.split_once('-')?;
    let start = start.parse::<u64>().ok()?;
    let end = if end.is_empty() {
        None
    } else {
        Some(end.parse::<u64>().ok()?)
    };
    Some((start, end))
}

/// GET /videos/{id}
///
/// Returns the exact bytes stored for a result video. Answers 404 once the
/// video has been replaced and released.
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let video = state.controller.video(id).await?;
    let size = video.bytes.len() as u64;
    let last_modified = video
        .created_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    if let Some(range_value) = headers.get(header::RANGE) {
        let range_str = range_value
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Range header".into()))?;

        if let Some((start, end)) = parse_range_header(range_str) {
            let last = size.saturating_sub(1);
            let end = end.map_or(last, |e| e.min(last));

            if start >= size || start > end {
                let headers: [(HeaderName, String); 1] =
                    [(header::CONTENT_RANGE, format!("bytes */{size}"))];
                return Ok((StatusCode::RANGE_NOT_SATISFIABLE, headers).into_response());
            }

            let body = video.bytes.slice(start as usize..=end as usize);
            let headers: [(HeaderName, String); 5] = [
                (header::CONTENT_TYPE, video.content_type),
                (header::CONTENT_LENGTH, body.len().to_string()),
                (header::CONTENT_RANGE, format!("bytes {start}-{end}/{size}")),
                (header::ACCEPT_RANGES, "bytes".to_string()),
                (header::LAST_MODIFIED, last_modified),
            ];
            return Ok((StatusCode::PARTIAL_CONTENT, headers, body).into_response());
        }
    }

    let headers: [(HeaderName, String); 4] = [
        (header::CONTENT_TYPE, video.content_type),
        (header::CONTENT_LENGTH, size.to_string()),
        (header::ACCEPT_RANGES, "bytes".to_string()),
        (header::LAST_MODIFIED, last_modified),
    ];
    Ok((StatusCode::OK, headers, video.bytes).into_response())
}
