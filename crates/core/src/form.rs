//! Upload form state and its transition function.
//!
//! Every user action and every network completion is a [`FormEvent`].
//! [`FormState::apply`] maps the current state and one event to the next
//! state plus the [`Effect`]s the caller must perform. The transition itself
//! never touches the network or the view store, so it can be exercised
//! without either.
//!
//! ```text
//! Idle | Succeeded | Failed | InFlight
//!     --(SubmitRequested, file present)--> InFlight
//! InFlight
//!     --(SubmitSucceeded, latest ticket)--> Succeeded
//!     --(SubmitFailed, latest ticket)-----> Failed
//! ```
//!
//! Overlapping submissions are allowed. Each accepted submission takes the
//! next [`SubmissionTicket`]; a completion carrying an older ticket is
//! discarded, and if it brought a video, that handle comes straight back as
//! [`Effect::ReleaseVideo`].

use bytes::Bytes;
use serde::Serialize;

use crate::error::CoreError;
use crate::summary::TrafficSummary;
use crate::thresholds::{ThresholdPolicy, ThresholdValue, Thresholds};
use crate::types::SubmissionTicket;
use crate::views::VideoHandle;

/// The file the user picked, read fully into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

impl SubmissionState {
    /// Label of the submit button; the only thing submission state drives.
    pub fn button_label(self) -> &'static str {
        match self {
            Self::InFlight => "Processing...",
            _ => "Upload & Detect",
        }
    }
}

/// User-facing alert currently raised by the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    MissingFile,
    DetectionFailed,
    InvalidThresholds(String),
}

impl Notice {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFile => "MISSING_FILE",
            Self::DetectionFailed => "DETECTION_FAILED",
            Self::InvalidThresholds(_) => "INVALID_THRESHOLDS",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::MissingFile => "Please upload a file first.".to_string(),
            Self::DetectionFailed => "Detection failed.".to_string(),
            Self::InvalidThresholds(reason) => format!("Invalid thresholds: {reason}"),
        }
    }
}

/// Why a submission failed. The user sees the same notice for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// The request never produced a response (refused, DNS, reset, ...).
    Transport,
    /// The collaborator answered with a non-success status.
    Server { status: u16 },
}

/// Everything one submission sends to the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectRequest {
    pub file: SelectedFile,
    pub thresholds: Thresholds,
}

#[derive(Debug)]
pub enum FormEvent {
    FileSelected(SelectedFile),
    ModerateEdited(ThresholdValue),
    HeavyEdited(ThresholdValue),
    SubmitRequested,
    SubmitSucceeded {
        ticket: SubmissionTicket,
        video: VideoHandle,
        summary: Option<TrafficSummary>,
    },
    SubmitFailed {
        ticket: SubmissionTicket,
        failure: FailureKind,
    },
    NoticeDismissed,
}

impl FormEvent {
    /// Short name for logging; events carry file and video bytes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileSelected(_) => "file_selected",
            Self::ModerateEdited(_) => "moderate_edited",
            Self::HeavyEdited(_) => "heavy_edited",
            Self::SubmitRequested => "submit_requested",
            Self::SubmitSucceeded { .. } => "submit_succeeded",
            Self::SubmitFailed { .. } => "submit_failed",
            Self::NoticeDismissed => "notice_dismissed",
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, PartialEq)]
pub enum Effect {
    SendRequest {
        ticket: SubmissionTicket,
        request: DetectRequest,
    },
    ReleaseVideo(VideoHandle),
}

#[derive(Debug)]
pub struct FormState {
    selected_file: Option<SelectedFile>,
    thresholds: Thresholds,
    policy: ThresholdPolicy,
    submission: SubmissionState,
    result_video: Option<VideoHandle>,
    summary: Option<TrafficSummary>,
    notice: Option<Notice>,
    last_failure: Option<FailureKind>,
    /// Ticket of the most recent accepted submission; `0` before the first.
    latest_ticket: SubmissionTicket,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new(Thresholds::default(), ThresholdPolicy::default())
    }
}

impl FormState {
    pub fn new(thresholds: Thresholds, policy: ThresholdPolicy) -> Self {
        Self {
            selected_file: None,
            thresholds,
            policy,
            submission: SubmissionState::Idle,
            result_video: None,
            summary: None,
            notice: None,
            last_failure: None,
            latest_ticket: 0,
        }
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn submission(&self) -> SubmissionState {
        self.submission
    }

    pub fn result_video(&self) -> Option<&VideoHandle> {
        self.result_video.as_ref()
    }

    pub fn summary(&self) -> Option<&TrafficSummary> {
        self.summary.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Cause of the latest submission's failure, if it failed.
    pub fn last_failure(&self) -> Option<FailureKind> {
        self.last_failure
    }

    pub fn latest_ticket(&self) -> SubmissionTicket {
        self.latest_ticket
    }

    /// Apply one event, returning the next state and the effects to run.
    #[must_use]
    pub fn apply(self, event: FormEvent) -> (Self, Vec<Effect>) {
        match event {
            FormEvent::FileSelected(file) => (self.select_file(file), Vec::new()),
            FormEvent::ModerateEdited(value) => {
                let mut next = self;
                next.thresholds.moderate = value;
                (next, Vec::new())
            }
            FormEvent::HeavyEdited(value) => {
                let mut next = self;
                next.thresholds.heavy = value;
                (next, Vec::new())
            }
            FormEvent::SubmitRequested => self.submit(),
            FormEvent::SubmitSucceeded {
                ticket,
                video,
                summary,
            } => self.succeed(ticket, video, summary),
            FormEvent::SubmitFailed { ticket, failure } => {
                (self.fail(ticket, failure), Vec::new())
            }
            FormEvent::NoticeDismissed => {
                let mut next = self;
                next.notice = None;
                (next, Vec::new())
            }
        }
    }

    fn select_file(mut self, file: SelectedFile) -> Self {
        self.selected_file = Some(file);
        self.summary = None;
        self
    }

    fn submit(mut self) -> (Self, Vec<Effect>) {
        let Some(file) = self.selected_file.clone() else {
            self.notice = Some(Notice::MissingFile);
            return (self, Vec::new());
        };

        if let Err(err) = self.policy.check(&self.thresholds) {
            let reason = match err {
                CoreError::Validation(msg) => msg,
                other => other.to_string(),
            };
            self.notice = Some(Notice::InvalidThresholds(reason));
            return (self, Vec::new());
        }

        // An accepted submission supersedes any earlier alert.
        self.latest_ticket += 1;
        self.submission = SubmissionState::InFlight;
        self.notice = None;
        self.last_failure = None;

        let effect = Effect::SendRequest {
            ticket: self.latest_ticket,
            request: DetectRequest {
                file,
                thresholds: self.thresholds,
            },
        };
        (self, vec![effect])
    }

    fn succeed(
        mut self,
        ticket: SubmissionTicket,
        video: VideoHandle,
        summary: Option<TrafficSummary>,
    ) -> (Self, Vec<Effect>) {
        if ticket != self.latest_ticket {
            return (self, vec![Effect::ReleaseVideo(video)]);
        }

        let mut effects = Vec::new();
        if let Some(previous) = self.result_video.replace(video) {
            effects.push(Effect::ReleaseVideo(previous));
        }
        self.summary = summary;
        self.submission = SubmissionState::Succeeded;
        (self, effects)
    }

    fn fail(mut self, ticket: SubmissionTicket, failure: FailureKind) -> Self {
        if ticket != self.latest_ticket {
            return self;
        }
        self.submission = SubmissionState::Failed;
        self.last_failure = Some(failure);
        self.notice = Some(Notice::DetectionFailed);
        self
    }
}
