//! HTTP surface for the traffic congestion upload form.
//!
//! Serves the form page and its actions, holds result videos for playback,
//! and forwards submissions to the detection service.

pub mod config;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod view;
