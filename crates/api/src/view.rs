//! Server-rendered form page.
//!
//! [`FormSnapshot`] is an owned copy of everything the page shows; it is
//! also served as JSON from `/api/state`. [`render_page`] is a pure function
//! of a snapshot.

use congestion_core::form::{FailureKind, FormState, SubmissionState};
use congestion_core::summary::TrafficSummary;
use congestion_core::thresholds::{ThresholdValue, Thresholds};
use congestion_core::types::SubmissionTicket;
use congestion_core::views::ViewStore;
use serde::Serialize;

/// Seconds between automatic reloads while a submission is in flight.
const REFRESH_SECS: u32 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct FileView {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeView {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
    pub file: Option<FileView>,
    pub thresholds: Thresholds,
    pub submission: SubmissionState,
    pub button_label: &'static str,
    pub video_url: Option<String>,
    pub summary: Option<TrafficSummary>,
    pub notice: Option<NoticeView>,
    /// Why the latest submission failed; not shown on the page.
    pub last_failure: Option<FailureKind>,
    pub latest_ticket: SubmissionTicket,
    /// Videos currently held by the view store.
    pub stored_videos: usize,
}

impl FormSnapshot {
    pub fn capture(form: &FormState, views: &ViewStore) -> Self {
        Self {
            file: form.selected_file().map(|file| FileView {
                file_name: file.file_name.clone(),
                content_type: file.content_type.clone(),
                size_bytes: file.bytes.len(),
            }),
            thresholds: form.thresholds(),
            submission: form.submission(),
            button_label: form.submission().button_label(),
            video_url: form.result_video().map(|handle| handle.url()),
            summary: form.summary().cloned(),
            notice: form.notice().map(|notice| NoticeView {
                code: notice.code(),
                message: notice.message(),
            }),
            last_failure: form.last_failure(),
            latest_ticket: form.latest_ticket(),
            stored_videos: views.len(),
        }
    }
}

/// Render the full form page.
pub fn render_page(snapshot: &FormSnapshot) -> String {
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    if snapshot.submission == SubmissionState::InFlight {
        html.push_str(&format!(
            "<meta http-equiv=\"refresh\" content=\"{REFRESH_SECS}\">\n"
        ));
    }
    html.push_str("<title>Traffic Congestion Detection</title>\n</head>\n<body>\n<main>\n");
    html.push_str("<h1>Traffic Congestion Detection</h1>\n");

    if let Some(notice) = &snapshot.notice {
        html.push_str(&format!(
            "<div role=\"alert\" data-code=\"{}\">\n<p>{}</p>\n\
             <form method=\"post\" action=\"/notice/dismiss\"><button type=\"submit\">OK</button></form>\n\
             </div>\n",
            notice.code,
            escape(&notice.message),
        ));
    }

    // Choosing a file uploads it right away; the button covers pages without scripts.
    html.push_str(
        "<form method=\"post\" action=\"/file\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" accept=\"image/*,video/*\" onchange=\"this.form.submit()\">\n\
         <button type=\"submit\">Select</button>\n</form>\n",
    );
    if let Some(file) = &snapshot.file {
        html.push_str(&format!(
            "<p>Selected: {} ({} bytes)</p>\n",
            escape(&file.file_name),
            file.size_bytes,
        ));
    }

    // Thresholds travel with the submit button so typed values are never lost.
    html.push_str("<form method=\"post\" action=\"/submit\">\n");
    push_threshold_input(
        &mut html,
        "moderate_threshold",
        "Moderate Traffic Vehicle Count Starts At",
        snapshot.thresholds.moderate,
        "e.g. 10",
    );
    push_threshold_input(
        &mut html,
        "heavy_threshold",
        "Heavy Traffic Vehicle Count Starts At",
        snapshot.thresholds.heavy,
        "e.g. 15",
    );
    html.push_str(
        "<button type=\"submit\" formaction=\"/thresholds\">Set thresholds</button>\n",
    );
    html.push_str(&format!(
        "<button type=\"submit\">{}</button>\n</form>\n",
        escape(snapshot.button_label),
    ));

    if let Some(url) = &snapshot.video_url {
        html.push_str(&format!(
            "<section id=\"result-video\">\n<h2>Detection Result Video:</h2>\n\
             <video src=\"{url}\" width=\"700\" height=\"500\" controls autoplay muted></video>\n\
             </section>\n",
            url = escape(url),
        ));
    }

    if let Some(summary) = &snapshot.summary {
        html.push_str(&format!(
            "<section id=\"traffic-info\">\n<h3>Traffic Info:</h3>\n\
             <p><strong>FPS:</strong> {}</p>\n\
             <p><strong>Total Vehicles:</strong> {}</p>\n\
             <p><strong>Left Street Cars:</strong> {}</p>\n\
             <p><strong>Right Street Cars:</strong> {}</p>\n\
             <p><strong>Traffic Condition:</strong> {}</p>\n\
             </section>\n",
            summary.fps,
            summary.total_cars,
            summary.left_street_cars,
            summary.right_street_cars,
            escape(&summary.road_condition.to_string()),
        ));
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn push_threshold_input(
    html: &mut String,
    name: &str,
    label: &str,
    value: ThresholdValue,
    placeholder: &str,
) {
    // A NaN control renders empty, as a number input would.
    let value = value.count().map(|n| n.to_string()).unwrap_or_default();
    html.push_str(&format!(
        "<label for=\"{name}\">{label}</label>\n\
         <input id=\"{name}\" name=\"{name}\" type=\"number\" value=\"{value}\" placeholder=\"{placeholder}\">\n"
    ));
}

/// Escape text for use in HTML content and double-quoted attributes.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
