// src/tracker.rs
//! Distance accumulation and drift filtering

use crate::config::TrackerConfig;
use crate::error::ErrorCategory;
use crate::gps::data::PositionFix;
use crate::gps::geodesy;
use crate::history::PositionHistory;
use log::{debug, warn};
use tokio::sync::mpsc::UnboundedSender;

const THRESHOLD_ACCURACY_FACTOR: f64 = 0.8;
const THRESHOLD_FLOOR_M: f64 = 3.0;
const THRESHOLD_CEIL_M: f64 = 10.0;
const STEADY_RUN_LEN: u32 = 3;
const STEADY_TIGHTEN_FACTOR: f64 = 0.6;
const STEADY_FLOOR_M: f64 = 2.0;

/// Typed notifications emitted synchronously while fixes are processed.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// An accepted fix became the current position.
    Position(PositionFix),
    /// The running total changed; carries the new total in meters.
    Distance(f64),
    /// A fix-source failure, categorized for the collaborator.
    Error {
        category: ErrorCategory,
        message: String,
    },
}

/// Minimum movement required before a segment is added directly.
///
/// Scales with the reported GPS accuracy; a run of more than three
/// consecutive small moves lowers the bar for steady slow walking. The
/// result is clamped to at most 10 m.
pub fn dynamic_threshold(accuracy_m: f64, consecutive_small_moves: u32) -> f64 {
    let mut base = (accuracy_m * THRESHOLD_ACCURACY_FACTOR).max(THRESHOLD_FLOOR_M);

    if consecutive_small_moves > STEADY_RUN_LEN {
        base = (base * STEADY_TIGHTEN_FACTOR).max(STEADY_FLOOR_M);
    }

    base.min(THRESHOLD_CEIL_M)
}

/// Converts a noisy stream of position fixes into a monotonically
/// increasing walked distance.
///
/// Single writer: one tracker instance owns all of this state for the
/// lifetime of a session.
pub struct DistanceTracker {
    config: TrackerConfig,
    current_position: Option<PositionFix>,
    previous_position: Option<PositionFix>,
    start_position: Option<PositionFix>,
    last_recorded_position: Option<PositionFix>,
    total_distance: f64,
    accumulated_distance: f64,
    consecutive_small_moves: u32,
    accumulation_flushes: u32,
    history: PositionHistory,
    events: Option<UnboundedSender<TrackerEvent>>,
}

impl DistanceTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let history = PositionHistory::new(
            config.history_window_ms,
            config.sustained_span_ms,
            config.sustained_distance_m,
        );
        Self {
            config,
            current_position: None,
            previous_position: None,
            start_position: None,
            last_recorded_position: None,
            total_distance: 0.0,
            accumulated_distance: 0.0,
            consecutive_small_moves: 0,
            accumulation_flushes: 0,
            history,
            events: None,
        }
    }

    /// Install the event sink. Replaces any previous sink.
    pub fn set_event_sink(&mut self, sink: UnboundedSender<TrackerEvent>) {
        self.events = Some(sink);
    }

    /// Process one incoming fix through the accuracy gate, speed gate, and
    /// distance classification.
    pub fn process_fix(&mut self, fix: PositionFix) {
        if fix.accuracy > self.config.accuracy_limit_m {
            debug!(
                "fix dropped: accuracy {:.1}m over {:.0}m limit",
                fix.accuracy, self.config.accuracy_limit_m
            );
            return;
        }

        let prev = match self.previous_position {
            Some(prev) => prev,
            None => {
                self.history.record(&fix);
                self.current_position = Some(fix);
                self.previous_position = Some(fix);
                self.last_recorded_position = Some(fix);
                if self.start_position.is_none() {
                    self.start_position = Some(fix);
                }
                debug!(
                    "first fix: {:.6}, {:.6} (accuracy {:.1}m)",
                    fix.latitude, fix.longitude, fix.accuracy
                );
                self.emit(TrackerEvent::Position(fix));
                return;
            }
        };

        let segment = geodesy::distance_between(&prev, &fix);
        let elapsed = fix.seconds_since(&prev);
        let speed_kmh = if elapsed > 0.0 {
            segment / elapsed * 3.6
        } else {
            0.0
        };

        if speed_kmh > self.config.max_speed_kmh {
            // Implausible teleport: drop the increment but trust the
            // position as the next baseline.
            debug!(
                "segment dropped: {:.1} km/h over {:.0} km/h limit",
                speed_kmh, self.config.max_speed_kmh
            );
            self.previous_position = Some(fix);
            self.current_position = Some(fix);
            self.emit(TrackerEvent::Position(fix));
            return;
        }

        self.history.record(&fix);
        self.current_position = Some(fix);
        self.emit(TrackerEvent::Position(fix));

        let threshold = dynamic_threshold(fix.accuracy, self.consecutive_small_moves);
        debug!(
            "segment {:.1}m, threshold {:.1}m, accumulated {:.1}m",
            segment, threshold, self.accumulated_distance
        );

        if segment >= threshold {
            self.total_distance += segment;
            self.accumulated_distance = 0.0;
            self.consecutive_small_moves = 0;
            self.last_recorded_position = Some(fix);
            debug!("direct add: +{:.1}m, total {:.1}m", segment, self.total_distance);
            self.emit(TrackerEvent::Distance(self.total_distance));
        } else if segment > self.config.micro_move_m {
            self.accumulated_distance += segment;
            self.consecutive_small_moves += 1;

            if self.accumulated_distance >= self.config.accumulation_flush_m {
                if self.history.has_sustained_movement() {
                    self.total_distance += self.accumulated_distance;
                    self.accumulation_flushes += 1;
                    self.last_recorded_position = Some(fix);
                    debug!(
                        "accumulated add: +{:.1}m, total {:.1}m",
                        self.accumulated_distance, self.total_distance
                    );
                    self.emit(TrackerEvent::Distance(self.total_distance));
                } else {
                    debug!(
                        "accumulated {:.1}m discarded as drift",
                        self.accumulated_distance
                    );
                }
                self.accumulated_distance = 0.0;
                self.consecutive_small_moves = 0;
            }
        } else {
            // Near-zero movement argues against a steady small-step pattern.
            self.consecutive_small_moves = self.consecutive_small_moves.saturating_sub(1);
            debug!("micro movement ignored: {:.2}m", segment);
        }

        self.previous_position = Some(fix);
    }

    /// Flush a meaningful pending accumulation when the session ends, so a
    /// near-complete bucket is not lost to timing.
    pub fn finalize(&mut self) {
        if self.accumulated_distance > self.config.final_flush_floor_m {
            self.total_distance += self.accumulated_distance;
            self.accumulation_flushes += 1;
            debug!(
                "final flush: +{:.1}m, total {:.1}m",
                self.accumulated_distance, self.total_distance
            );
            self.emit(TrackerEvent::Distance(self.total_distance));
        }
        self.accumulated_distance = 0.0;
        self.consecutive_small_moves = 0;
    }

    /// Clear all distance state; the next fix is treated as a first fix.
    pub fn reset(&mut self) {
        self.total_distance = 0.0;
        self.accumulated_distance = 0.0;
        self.consecutive_small_moves = 0;
        self.accumulation_flushes = 0;
        self.current_position = None;
        self.previous_position = None;
        self.start_position = None;
        self.last_recorded_position = None;
        self.history.clear();
        debug!("tracker reset");
    }

    /// Emit a categorized fix-source failure to the event sink.
    pub fn report_error(&self, category: ErrorCategory, message: &str) {
        warn!("fix source error ({}): {}", category, message);
        self.emit(TrackerEvent::Error {
            category,
            message: message.to_string(),
        });
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn current_position(&self) -> Option<PositionFix> {
        self.current_position
    }

    pub fn start_position(&self) -> Option<PositionFix> {
        self.start_position
    }

    pub fn previous_position(&self) -> Option<PositionFix> {
        self.previous_position
    }

    pub fn accumulated_distance(&self) -> f64 {
        self.accumulated_distance
    }

    pub fn consecutive_small_moves(&self) -> u32 {
        self.consecutive_small_moves
    }

    pub fn accumulation_flushes(&self) -> u32 {
        self.accumulation_flushes
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn emit(&self, event: TrackerEvent) {
        if let Some(sink) = &self.events {
            let _ = sink.send(event);
        }
    }
}
