// src/gps/replay.rs
//! Recorded-walk replay provider
//!
//! Reads JSON-lines fix recordings and plays them back with the original
//! timing, optionally scaled by a rate multiplier. Powers the demo binary
//! and deterministic session tests.

use super::data::PositionFix;
use crate::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use log::info;
use std::path::Path;
use std::time::Duration;

/// Load every fix from a JSON-lines recording. Blank lines and `#` comment
/// lines are skipped; any other unparsable line is an error.
pub fn load_fixes(path: &Path) -> Result<Vec<PositionFix>> {
    let contents = std::fs::read_to_string(path).map_err(TrackerError::Io)?;

    let mut fixes = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fix: PositionFix = serde_json::from_str(line)
            .map_err(|e| TrackerError::Parse(format!("{}:{}: {}", path.display(), idx + 1, e)))?;
        fixes.push(fix);
    }

    Ok(fixes)
}

/// Single-shot request: the first fix of the recording.
pub fn first_fix(path: &Path) -> Result<PositionFix> {
    load_fixes(path)?.into_iter().next().ok_or_else(|| {
        TrackerError::Unavailable(format!("{} contains no fixes", path.display()))
    })
}

/// Stream the recording, pacing fixes by their timestamp gaps divided by
/// `rate`. Returns normally at end of recording.
pub async fn stream_fixes(
    path: &Path,
    rate: f64,
    mut on_fix: impl FnMut(PositionFix),
) -> Result<()> {
    let fixes = load_fixes(path)?;
    let rate = if rate > 0.0 { rate } else { 1.0 };

    let mut last_ts: Option<DateTime<Utc>> = None;
    for fix in fixes {
        if let Some(last) = last_ts {
            let gap_ms = (fix.timestamp - last).num_milliseconds().max(0) as f64;
            let wait_ms = gap_ms / rate;
            if wait_ms >= 1.0 {
                tokio::time::sleep(Duration::from_millis(wait_ms as u64)).await;
            }
        }
        last_ts = Some(fix.timestamp);
        on_fix(fix);
    }

    info!("replay of {} finished", path.display());
    Ok(())
}
