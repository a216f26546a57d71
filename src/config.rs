// src/config.rs
//! Tracker and session policy configuration

use crate::error::{Result, TrackerError};
use crate::gps::data::FixRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Fixes with worse accuracy than this are discarded outright.
    pub accuracy_limit_m: f64,
    /// Segments implying a faster pace than this are dropped as artifacts.
    pub max_speed_kmh: f64,
    /// Segments at or below this length count as GPS jitter.
    pub micro_move_m: f64,
    /// Accumulated small movements are considered for flushing at this size.
    pub accumulation_flush_m: f64,
    /// Pending accumulation above this floor is flushed when a session ends.
    pub final_flush_floor_m: f64,
    /// Position history retention window.
    pub history_window_ms: i64,
    /// Minimum history span before sustained movement can be judged.
    pub sustained_span_ms: i64,
    /// Straight-line displacement over the span that counts as real movement.
    pub sustained_distance_m: f64,
    /// Deadline for the initial single-shot fix at session start.
    pub initial_fix_timeout_secs: u64,
    /// Longest tolerated gap between continuous fixes.
    pub watch_fix_timeout_secs: u64,
    /// Acceptable cached-fix age for continuous observation.
    pub watch_max_age_secs: u64,
    /// One-shot grace period before falling back to polling.
    pub watchdog_secs: u64,
    /// Interval between single-shot requests in degraded polling mode.
    pub poll_interval_secs: u64,
    /// Deadline for each polling fix request.
    pub poll_fix_timeout_secs: u64,
    /// Acceptable cached-fix age when polling.
    pub poll_max_age_secs: u64,
    /// Default walking-mission target distance.
    pub default_target_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            accuracy_limit_m: 50.0,
            max_speed_kmh: 25.0,
            micro_move_m: 1.0,
            accumulation_flush_m: 5.0,
            final_flush_floor_m: 2.0,
            history_window_ms: 30_000,
            sustained_span_ms: 15_000,
            sustained_distance_m: 8.0,
            initial_fix_timeout_secs: 10,
            watch_fix_timeout_secs: 15,
            watch_max_age_secs: 5,
            watchdog_secs: 15,
            poll_interval_secs: 30,
            poll_fix_timeout_secs: 8,
            poll_max_age_secs: 1,
            default_target_m: 1000.0,
        }
    }
}

impl TrackerConfig {
    /// Request options for the initial session-start fix.
    pub fn initial_request(&self) -> FixRequest {
        FixRequest {
            high_accuracy: true,
            timeout: Duration::from_secs(self.initial_fix_timeout_secs),
            max_age: Duration::ZERO,
        }
    }

    /// Request options for continuous observation.
    pub fn watch_request(&self) -> FixRequest {
        FixRequest {
            high_accuracy: true,
            timeout: Duration::from_secs(self.watch_fix_timeout_secs),
            max_age: Duration::from_secs(self.watch_max_age_secs),
        }
    }

    /// Request options for the degraded polling mode.
    pub fn poll_request(&self) -> FixRequest {
        FixRequest {
            high_accuracy: true,
            timeout: Duration::from_secs(self.poll_fix_timeout_secs),
            max_age: Duration::from_secs(self.poll_max_age_secs),
        }
    }

    /// Load configuration from the user's config file, if present.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| TrackerError::Other(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TrackerError::Other(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to the user's config file.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackerError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| TrackerError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| TrackerError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config_path() -> Result<std::path::PathBuf> {
        use std::path::PathBuf;

        let home = std::env::var("HOME")
            .map_err(|_| TrackerError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("walk-tracker")
            .join("config.json"))
    }
}
