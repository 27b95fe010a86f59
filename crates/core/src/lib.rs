//! Domain layer for the congestion upload form.
//!
//! Holds the form state and its pure transition function, the threshold
//! and traffic-summary types shared with the detection client, and the
//! in-memory store that backs result-video view URLs. Nothing here performs
//! I/O; effects are returned to the caller as data.

pub mod error;
pub mod form;
pub mod summary;
pub mod thresholds;
pub mod types;
pub mod views;
