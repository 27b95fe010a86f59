//! Congestion thresholds sent alongside every upload.
//!
//! The detection collaborator classifies per-frame vehicle counts as
//! `moderate` from [`Thresholds::moderate`] upwards and `heavy` from
//! [`Thresholds::heavy`] upwards. The form never reorders or clamps them;
//! ordering is only checked under [`ThresholdPolicy::Ordered`].

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::CoreError;

/// Vehicle count at which moderate congestion begins, unless configured.
pub const DEFAULT_MODERATE_THRESHOLD: i64 = 10;

/// Vehicle count at which heavy congestion begins, unless configured.
pub const DEFAULT_HEAVY_THRESHOLD: i64 = 15;

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Text transmitted for a threshold that did not parse as a number.
pub const NOT_A_NUMBER: &str = "NaN";

/// Value held by one threshold control.
///
/// Mirrors number-input coercion: blank text is `0` and any numeric literal
/// with an integral value (`12`, `12.0`, `1e1`) is that count. Fractional
/// values such as `12.5` and any other text become
/// [`ThresholdValue::NotANumber`], which is still sent as `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdValue {
    Count(i64),
    NotANumber,
}

impl ThresholdValue {
    /// Coerce the raw text of a number control.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::Count(0);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::Count(n);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
                Self::Count(f as i64)
            }
            _ => Self::NotANumber,
        }
    }

    /// The count, or `None` for the not-a-number sentinel.
    pub fn count(self) -> Option<i64> {
        match self {
            Self::Count(n) => Some(n),
            Self::NotANumber => None,
        }
    }
}

impl From<i64> for ThresholdValue {
    fn from(n: i64) -> Self {
        Self::Count(n)
    }
}

impl fmt::Display for ThresholdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::NotANumber => f.write_str(NOT_A_NUMBER),
        }
    }
}

/// Counts serialize as JSON numbers, the sentinel as the string `"NaN"`.
impl Serialize for ThresholdValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => serializer.serialize_i64(*n),
            Self::NotANumber => serializer.serialize_str(NOT_A_NUMBER),
        }
    }
}

/// The pair of thresholds configured on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    pub moderate: ThresholdValue,
    pub heavy: ThresholdValue,
}

impl Thresholds {
    pub fn new(moderate: i64, heavy: i64) -> Self {
        Self {
            moderate: ThresholdValue::Count(moderate),
            heavy: ThresholdValue::Count(heavy),
        }
    }

    /// Check that both thresholds are non-negative counts and that
    /// `moderate` is strictly below `heavy`.
    pub fn validate_ordering(&self) -> Result<(), CoreError> {
        let moderate = require_count(self.moderate, "moderate_threshold")?;
        let heavy = require_count(self.heavy, "heavy_threshold")?;
        if moderate >= heavy {
            return Err(CoreError::Validation(format!(
                "moderate_threshold ({moderate}) must be below heavy_threshold ({heavy})"
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(DEFAULT_MODERATE_THRESHOLD, DEFAULT_HEAVY_THRESHOLD)
    }
}

/// How thresholds are checked before a submission is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThresholdPolicy {
    /// Send whatever the controls hold, `NaN` included.
    #[default]
    Unchecked,
    /// Refuse to submit unless [`Thresholds::validate_ordering`] passes.
    Ordered,
}

impl ThresholdPolicy {
    pub fn check(self, thresholds: &Thresholds) -> Result<(), CoreError> {
        match self {
            Self::Unchecked => Ok(()),
            Self::Ordered => thresholds.validate_ordering(),
        }
    }
}

fn require_count(value: ThresholdValue, name: &str) -> Result<i64, CoreError> {
    match value.count() {
        Some(n) if n >= 0 => Ok(n),
        Some(n) => Err(CoreError::Validation(format!(
            "{name} must not be negative, got {n}"
        ))),
        None => Err(CoreError::Validation(format!("{name} must be a number"))),
    }
}
