//! HTTP client for the traffic detection collaborator.
//!
//! The collaborator accepts one uploaded image or video plus two congestion
//! thresholds and answers with an annotated MP4. [`DetectApi`] is the
//! `reqwest` implementation; callers depend on the [`Detector`] trait so the
//! collaborator can be swapped out.

pub mod api;

pub use api::{DetectApi, DetectError, DetectResponse, Detector, DEFAULT_DETECT_URL};
