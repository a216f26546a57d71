// src/gps/data.rs
//! Position fix data structures

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single geolocation fix as delivered by a location source.
///
/// Immutable once created; the tracker replaces stored fixes wholesale and
/// never mutates them in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy, 1-sigma radius in meters.
    pub accuracy: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp,
        }
    }

    /// Build a fix from an epoch-milliseconds timestamp.
    pub fn from_millis(latitude: f64, longitude: f64, accuracy: f64, epoch_ms: i64) -> Self {
        Self::new(
            latitude,
            longitude,
            accuracy,
            Utc.timestamp_millis_opt(epoch_ms)
                .single()
                .unwrap_or_else(Utc::now),
        )
    }

    /// Seconds elapsed since an earlier fix, negative if this fix is older.
    pub fn seconds_since(&self, earlier: &PositionFix) -> f64 {
        (self.timestamp - earlier.timestamp).num_milliseconds() as f64 / 1000.0
    }

    /// Age of the fix relative to the wall clock, in seconds.
    pub fn age_seconds(&self) -> i64 {
        Utc::now().signed_duration_since(self.timestamp).num_seconds()
    }

    /// Human-readable accuracy grade.
    pub fn accuracy_grade(&self) -> &'static str {
        match self.accuracy {
            a if a <= 5.0 => "Excellent",
            a if a <= 10.0 => "Good",
            a if a <= 20.0 => "Fair",
            a if a <= 50.0 => "Poor",
            _ => "Very Poor",
        }
    }
}

/// Options for a fix request, both single-shot and continuous.
///
/// `max_age` is advisory: sources with no fix cache (gpsd, replay files)
/// always deliver live data and ignore it.
#[derive(Debug, Clone, Copy)]
pub struct FixRequest {
    pub high_accuracy: bool,
    /// For single-shot requests, the overall deadline; for continuous
    /// observation, the longest tolerated gap between fixes.
    pub timeout: Duration,
    pub max_age: Duration,
}

impl Default for FixRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_age: Duration::ZERO,
        }
    }
}
