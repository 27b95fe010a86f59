//! Shared helpers for the api integration tests.
//!
//! Every test gets its own router, its own form and its own in-process
//! detection collaborator bound to an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{header, Method, Request, Response as HttpResponse, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use congestion_api::config::ServerConfig;
use congestion_api::router::build_app_router;
use congestion_api::state::AppState;
use congestion_detect::{DetectApi, Detector};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const BOUNDARY: &str = "congestion-test-boundary";

/// Build a test `ServerConfig` with safe defaults, pointed at `detect_url`.
pub fn test_config(detect_url: &str) -> ServerConfig {
    ServerConfig::from_lookup(|key| match key {
        "PORT" => Some("0".to_string()),
        "DETECT_URL" => Some(detect_url.to_string()),
        _ => None,
    })
    .expect("test configuration should be valid")
}

/// A router and the state behind it, so tests can wait on submissions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Build the full application router with all middleware layers.
    pub fn new(config: ServerConfig) -> Self {
        let detector = Arc::new(DetectApi::new(config.detect.url.clone()));
        Self::with_detector(config, detector)
    }

    /// Same stack, with a caller-supplied collaborator.
    pub fn with_detector(config: ServerConfig, detector: Arc<dyn Detector>) -> Self {
        let state = AppState::new(config.clone(), detector);
        let router = build_app_router(state.clone(), &config);
        Self { router, state }
    }

    pub async fn request(&self, request: Request<Body>) -> HttpResponse<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> HttpResponse<Body> {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_empty(&self, uri: &str) -> HttpResponse<Body> {
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn post_form(&self, uri: &str, body: &str) -> HttpResponse<Body> {
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST a `multipart/form-data` body built by [`multipart_file`].
    pub async fn post_multipart(&self, uri: &str, body: Vec<u8>) -> HttpResponse<Body> {
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Select `file_name` with the given bytes as the form's file.
    pub async fn select_file(&self, file_name: &str, bytes: &[u8]) {
        let response = self
            .post_multipart("/file", multipart_file("file", file_name, "video/mp4", bytes))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    /// Submit, then wait for the collaborator call to resolve.
    pub async fn submit_and_settle(&self) {
        let response = self.post_empty("/submit").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        self.state.controller.settle().await;
    }

    /// Current form snapshot from `/api/state`.
    pub async fn form_state(&self) -> serde_json::Value {
        let response = self.get("/api/state").await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["data"].clone()
    }
}

/// Encode one file part as a multipart body.
pub fn multipart_file(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_bytes(response: HttpResponse<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
}

pub async fn body_json(response: HttpResponse<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body should be JSON")
}

pub async fn body_text(response: HttpResponse<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).expect("body should be UTF-8")
}

// ---------------------------------------------------------------------------
// Mock detection collaborator
// ---------------------------------------------------------------------------

/// One multipart request as the collaborator received it.
#[derive(Debug, Default, Clone)]
pub struct RecordedRequest {
    pub fields: HashMap<String, Bytes>,
    pub file_name: Option<String>,
}

impl RecordedRequest {
    pub fn text(&self, field: &str) -> String {
        String::from_utf8_lossy(&self.fields[field]).into_owned()
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Video {
        body: Bytes,
        summary_header: Option<String>,
    },
    Status(StatusCode),
}

impl Reply {
    pub fn video(body: &[u8]) -> Self {
        Self::Video {
            body: Bytes::copy_from_slice(body),
            summary_header: None,
        }
    }

    pub fn video_with_summary(body: &[u8], summary_header: &str) -> Self {
        Self::Video {
            body: Bytes::copy_from_slice(body),
            summary_header: Some(summary_header.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct MockDetector {
    pub url: String,
    reply: Arc<Mutex<Reply>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockDetector {
    /// Bind a collaborator on `127.0.0.1:0` that answers every call with `reply`.
    pub async fn spawn(reply: Reply) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mock = Self {
            url: format!("http://{addr}/api/detect"),
            reply: Arc::new(Mutex::new(reply)),
            requests: Arc::default(),
        };
        let app = Router::new()
            .route("/api/detect", post(handle_detect))
            .with_state(mock.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        mock
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("collaborator should have been called")
    }
}

async fn handle_detect(State(mock): State<MockDetector>, mut multipart: Multipart) -> Response {
    let mut recorded = RecordedRequest::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            recorded.file_name = field.file_name().map(str::to_string);
        }
        recorded.fields.insert(name, field.bytes().await.unwrap());
    }
    mock.requests.lock().unwrap().push(recorded);

    let reply = mock.reply.lock().unwrap().clone();
    match reply {
        Reply::Video {
            body,
            summary_header,
        } => {
            let mut builder = Response::builder().header(header::CONTENT_TYPE, "video/mp4");
            if let Some(value) = summary_header {
                builder = builder.header("x-traffic-summary", value);
            }
            builder.body(Body::from(body)).unwrap()
        }
        Reply::Status(status) => Response::builder()
            .status(status)
            .body(Body::from("processing failed"))
            .unwrap(),
    }
}

/// An endpoint URL on a port nobody is listening on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/detect")
}
