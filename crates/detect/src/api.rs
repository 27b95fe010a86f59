//! REST client for the `/api/detect` endpoint.
//!
//! Wraps the single collaborator call (multipart upload in, MP4 out) using
//! [`reqwest`]. No timeout is applied unless the caller supplies a client
//! built with one via [`DetectApi::with_client`].

use async_trait::async_trait;
use bytes::Bytes;
use congestion_core::form::{DetectRequest, FailureKind};
use congestion_core::summary::{TrafficSummary, SUMMARY_HEADER};
use congestion_core::thresholds::Thresholds;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};

/// Endpoint used when none is configured.
pub const DEFAULT_DETECT_URL: &str = "http://localhost:5000/api/detect";

/// Anything that can run detection for one submission.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, DetectError>;
}

/// Successful collaborator response.
#[derive(Debug, Clone)]
pub struct DetectResponse {
    /// Annotated video, exactly as received. Its Content-Type is not inspected.
    pub video: Bytes,
    /// Metrics from the summary header, when the collaborator sent one.
    pub summary: Option<TrafficSummary>,
}

/// Errors from the detection API layer.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The HTTP request itself failed (network, DNS, connection refused, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The collaborator returned a non-2xx status code.
    #[error("Detection API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl DetectError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Request(_) => FailureKind::Transport,
            Self::ApiError { status, .. } => FailureKind::Server { status: *status },
        }
    }
}

/// HTTP client for one detection endpoint.
pub struct DetectApi {
    client: reqwest::Client,
    endpoint: String,
}

impl DetectApi {
    /// Create a client for the full endpoint URL, e.g.
    /// `http://localhost:5000/api/detect`.
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`DetectError::ApiError`] containing the
    /// status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DetectError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DetectError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Detector for DetectApi {
    /// Upload the file with both thresholds.
    ///
    /// Sends `POST {endpoint}` with multipart fields `file`,
    /// `heavy_threshold` and `moderate_threshold`. Returns the raw body as
    /// the result video.
    async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, DetectError> {
        let form = build_form(request)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            file_name = %request.file.file_name,
            bytes = request.file.bytes.len(),
            moderate_threshold = %request.thresholds.moderate,
            heavy_threshold = %request.thresholds.heavy,
            "Sending detection request",
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let summary = read_summary(response.headers(), &request.thresholds);
        let video = response.bytes().await?;

        Ok(DetectResponse { video, summary })
    }
}

/// Build the multipart body for one submission.
///
/// Thresholds go out as decimal text, or `NaN` for a control that did not
/// hold a number. The file part carries its length, so the whole body has a
/// known `Content-Length`.
pub fn build_form(request: &DetectRequest) -> Result<Form, reqwest::Error> {
    let file = &request.file;
    let length = file.bytes.len() as u64;
    let mut part = Part::stream_with_length(reqwest::Body::from(file.bytes.clone()), length)
        .file_name(file.file_name.clone());
    if let Some(content_type) = &file.content_type {
        part = part.mime_str(content_type)?;
    }

    Ok(Form::new()
        .part("file", part)
        .text("heavy_threshold", request.thresholds.heavy.to_string())
        .text("moderate_threshold", request.thresholds.moderate.to_string()))
}

/// Read the optional summary header. A malformed value is logged and ignored.
fn read_summary(headers: &HeaderMap, thresholds: &Thresholds) -> Option<TrafficSummary> {
    let value = headers.get(SUMMARY_HEADER)?;

    let text = match value.to_str() {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring non-text traffic summary header");
            return None;
        }
    };

    match TrafficSummary::from_header(text, thresholds) {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed traffic summary header");
            None
        }
    }
}
