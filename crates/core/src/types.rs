/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Monotonic sequence number identifying one accepted submission.
///
/// Only the response carrying the latest ticket may update the form.
pub type SubmissionTicket = u64;

/// Content type assumed for every payload returned by the collaborator.
pub const RESULT_CONTENT_TYPE: &str = "video/mp4";
