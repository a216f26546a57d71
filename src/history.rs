// src/history.rs
//! Sliding time-window store of recent fixes

use crate::gps::data::PositionFix;
use crate::gps::geodesy;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct HistoryEntry {
    fix: PositionFix,
    recorded_at: DateTime<Utc>,
}

/// Recent accepted fixes, pruned to a sliding time window.
///
/// Validates movement over a longer baseline than a single fix-to-fix
/// segment, separating genuine walking from jitter around a fixed point.
///
/// Entries are clocked by fix timestamp rather than a wall-clock read, so
/// the buffer behaves identically live and under replay.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    entries: VecDeque<HistoryEntry>,
    window_ms: i64,
    min_span_ms: i64,
    min_displacement_m: f64,
}

impl PositionHistory {
    pub fn new(window_ms: i64, min_span_ms: i64, min_displacement_m: f64) -> Self {
        Self {
            entries: VecDeque::new(),
            window_ms,
            min_span_ms,
            min_displacement_m,
        }
    }

    /// Append a fix and drop every entry that has aged out of the window.
    pub fn record(&mut self, fix: &PositionFix) {
        let now = fix.timestamp;
        self.entries.push_back(HistoryEntry {
            fix: *fix,
            recorded_at: now,
        });

        while let Some(oldest) = self.entries.front() {
            if (now - oldest.recorded_at).num_milliseconds() < self.window_ms {
                break;
            }
            self.entries.pop_front();
        }
    }

    /// Whether the retained window shows real displacement rather than
    /// jitter: at least `min_span_ms` between oldest and newest entry, and
    /// more than `min_displacement_m` of straight-line distance between them.
    pub fn has_sustained_movement(&self) -> bool {
        if self.entries.len() < 2 {
            return false;
        }

        let oldest = self.entries.front().unwrap();
        let newest = self.entries.back().unwrap();

        let span_ms = (newest.recorded_at - oldest.recorded_at).num_milliseconds();
        if span_ms < self.min_span_ms {
            return false;
        }

        geodesy::distance_between(&oldest.fix, &newest.fix) > self.min_displacement_m
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
