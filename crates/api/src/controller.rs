//! Owner of the live upload form and runner for its effects.
//!
//! [`FormController`] keeps the [`FormState`] and the [`ViewStore`] behind a
//! single lock, so every transition is applied one at a time. Effects the
//! reducer asks for are carried out here: `ReleaseVideo` immediately, and
//! `SendRequest` as a task on a [`TaskTracker`] that reports back with
//! `SubmitSucceeded` or `SubmitFailed` once the collaborator answers.

use std::sync::Arc;
use std::time::Duration;

use congestion_core::error::CoreError;
use congestion_core::form::{DetectRequest, Effect, FormEvent, FormState};
use congestion_core::types::{SubmissionTicket, RESULT_CONTENT_TYPE};
use congestion_core::views::{StoredVideo, ViewStore};
use congestion_detect::Detector;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::view::FormSnapshot;

pub struct FormController {
    inner: Mutex<Inner>,
    detector: Arc<dyn Detector>,
    /// In-flight submissions.
    tracker: TaskTracker,
}

struct Inner {
    form: FormState,
    views: ViewStore,
}

impl FormController {
    pub fn new(form: FormState, detector: Arc<dyn Detector>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                form,
                views: ViewStore::new(),
            }),
            detector,
            tracker: TaskTracker::new(),
        })
    }

    /// Apply one event and perform the effects it produces.
    pub async fn dispatch(self: &Arc<Self>, event: FormEvent) {
        let kind = event.kind();
        let mut inner = self.inner.lock().await;

        let form = std::mem::take(&mut inner.form);
        let (form, effects) = form.apply(event);
        inner.form = form;

        tracing::debug!(
            event = kind,
            submission = ?inner.form.submission(),
            effects = effects.len(),
            "Form event applied",
        );

        for effect in effects {
            match effect {
                Effect::ReleaseVideo(handle) => {
                    let video_id = handle.id();
                    let released = inner.views.release(handle);
                    tracing::debug!(%video_id, released, "Released result video");
                }
                Effect::SendRequest { ticket, request } => {
                    self.spawn_submission(ticket, request);
                }
            }
        }
    }

    /// Current form contents, as rendered.
    pub async fn snapshot(&self) -> FormSnapshot {
        let inner = self.inner.lock().await;
        FormSnapshot::capture(&inner.form, &inner.views)
    }

    /// Look up the stored bytes behind a view URL.
    pub async fn video(&self, id: Uuid) -> Result<StoredVideo, CoreError> {
        self.inner.lock().await.views.resolve(id).cloned()
    }

    /// Wait until every spawned submission has resolved.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Drain in-flight submissions, waiting at most `timeout`.
    ///
    /// Returns `false` if some were still running when it elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }

    fn spawn_submission(self: &Arc<Self>, ticket: SubmissionTicket, request: DetectRequest) {
        let controller = Arc::clone(self);
        self.tracker.spawn(async move {
            controller.run_submission(ticket, request).await;
        });
    }

    async fn run_submission(self: Arc<Self>, ticket: SubmissionTicket, request: DetectRequest) {
        tracing::info!(
            ticket,
            file_name = %request.file.file_name,
            bytes = request.file.bytes.len(),
            "Submitting upload for detection",
        );

        let event = match self.detector.detect(&request).await {
            Ok(response) => {
                let bytes = response.video.len();
                let video = self
                    .inner
                    .lock()
                    .await
                    .views
                    .insert(response.video, RESULT_CONTENT_TYPE);
                tracing::info!(ticket, bytes, video_id = %video.id(), "Detection succeeded");
                FormEvent::SubmitSucceeded {
                    ticket,
                    video,
                    summary: response.summary,
                }
            }
            Err(e) => {
                tracing::error!(ticket, error = %e, "Upload failed");
                FormEvent::SubmitFailed {
                    ticket,
                    failure: e.failure_kind(),
                }
            }
        };

        self.dispatch(event).await;
    }
}
