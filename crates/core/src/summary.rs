//! Structured traffic metrics reported by the detection collaborator.
//!
//! The collaborator attaches the summary to its video response as a JSON
//! header value (see [`SUMMARY_HEADER`]). When it reports counts without a
//! road condition, the condition is derived locally from the thresholds that
//! were submitted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::thresholds::{ThresholdValue, Thresholds};

/// Response header carrying an optional [`TrafficSummary`] as JSON.
pub const SUMMARY_HEADER: &str = "x-traffic-summary";

/// Congestion level for a vehicle count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadCondition {
    Smooth,
    Moderate,
    Heavy,
    /// A condition label this client does not know; rendered verbatim.
    #[serde(untagged)]
    Other(String),
}

impl RoadCondition {
    /// Classify a vehicle count: `heavy` at or above the heavy threshold,
    /// `moderate` at or above the moderate one, `smooth` otherwise.
    ///
    /// A `NaN` threshold never matches.
    pub fn classify(total_cars: u32, thresholds: &Thresholds) -> Self {
        let total = i64::from(total_cars);
        let reached = |t: ThresholdValue| t.count().is_some_and(|c| total >= c);

        if reached(thresholds.heavy) {
            Self::Heavy
        } else if reached(thresholds.moderate) {
            Self::Moderate
        } else {
            Self::Smooth
        }
    }
}

impl fmt::Display for RoadCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smooth => f.write_str("smooth"),
            Self::Moderate => f.write_str("moderate"),
            Self::Heavy => f.write_str("heavy"),
            Self::Other(label) => f.write_str(label),
        }
    }
}

/// Traffic metrics for one processed upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSummary {
    pub fps: f64,
    pub total_cars: u32,
    pub left_street_cars: u32,
    pub right_street_cars: u32,
    pub road_condition: RoadCondition,
}

/// Wire shape of the summary header; `road_condition` may be omitted.
#[derive(Debug, Deserialize)]
struct ReportedSummary {
    fps: f64,
    total_cars: u32,
    #[serde(default)]
    left_street_cars: u32,
    #[serde(default)]
    right_street_cars: u32,
    road_condition: Option<RoadCondition>,
}

impl TrafficSummary {
    /// Parse the JSON value of [`SUMMARY_HEADER`], filling a missing road
    /// condition from `thresholds`.
    pub fn from_header(value: &str, thresholds: &Thresholds) -> Result<Self, serde_json::Error> {
        let reported: ReportedSummary = serde_json::from_str(value)?;
        let road_condition = reported
            .road_condition
            .unwrap_or_else(|| RoadCondition::classify(reported.total_cars, thresholds));

        Ok(Self {
            fps: reported.fps,
            total_cars: reported.total_cars,
            left_street_cars: reported.left_street_cars,
            right_street_cars: reported.right_street_cars,
            road_condition,
        })
    }
}
