// src/mission.rs
//! Walking-mission success judgment and end-of-walk summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target distance used when the mission does not specify one.
pub const DEFAULT_TARGET_DISTANCE_M: f64 = 1000.0;

/// Whether a walked distance meets the mission target.
pub fn mission_success(distance_m: f64, target_m: Option<f64>) -> bool {
    distance_m >= target_m.unwrap_or(DEFAULT_TARGET_DISTANCE_M)
}

/// End-of-walk record handed to the upload/UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkSummary {
    /// Walk date, `YYYY-MM-DD`.
    pub date: String,
    /// Total walked distance, rounded to whole meters.
    pub distance_m: f64,
    pub duration_s: u64,
    pub success: bool,
    /// How many small-movement buckets were flushed into the total.
    pub accumulated_segments: u32,
}

impl WalkSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        distance_m: f64,
        target_m: Option<f64>,
        accumulated_segments: u32,
    ) -> Self {
        let duration_s = (ended_at - started_at).num_seconds().max(0) as u64;
        Self {
            date: started_at.format("%Y-%m-%d").to_string(),
            distance_m: distance_m.round(),
            duration_s,
            success: mission_success(distance_m, target_m),
            accumulated_segments,
        }
    }
}
