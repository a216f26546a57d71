// src/gps/gpsd.rs
//! gpsd-backed position fix provider

use super::data::{FixRequest, PositionFix};
use crate::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::timeout,
};

/// Accuracy reported when gpsd omits an error estimate.
const DEFAULT_ACCURACY_M: f64 = 15.0;

#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    mode: Option<u8>,
    time: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    eph: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
}

/// Connect to a gpsd daemon and enable the JSON watch stream.
pub async fn connect(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| {
            TrackerError::Connection(format!(
                "Failed to connect to gpsd at {}:{}: {}",
                host, port, e
            ))
        })?;

    let watch_cmd = "?WATCH={\"enable\":true,\"json\":true}\n";
    stream
        .write_all(watch_cmd.as_bytes())
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Parse one line of gpsd JSON into a usable fix.
///
/// Returns `Ok(None)` for report classes other than TPV and for TPV reports
/// without at least a 2D fix and both coordinates.
pub fn fix_from_line(line: &str) -> Result<Option<PositionFix>> {
    let report: GpsdReport = serde_json::from_str(line)
        .map_err(|e| TrackerError::Parse(format!("Failed to parse gpsd JSON: {}", e)))?;

    if report.class != "TPV" {
        return Ok(None);
    }

    if report.mode.unwrap_or(0) < 2 {
        return Ok(None);
    }

    let (lat, lon) = match (report.lat, report.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Ok(None),
    };

    let accuracy = report
        .eph
        .or_else(|| match (report.epx, report.epy) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (Some(x), None) => Some(x),
            (None, Some(y)) => Some(y),
            (None, None) => None,
        })
        .unwrap_or(DEFAULT_ACCURACY_M);

    let timestamp = report
        .time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(Some(PositionFix::new(lat, lon, accuracy, timestamp)))
}

/// Request a single fix: connect, read until the first usable TPV report,
/// and give up at the request deadline.
pub async fn current_fix(host: &str, port: u16, request: &FixRequest) -> Result<PositionFix> {
    let attempt = async {
        let mut reader = connect(host, port).await?;
        let mut line = String::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await.map_err(TrackerError::Io)?;
            if n == 0 {
                return Err(TrackerError::Connection(
                    "gpsd closed the connection".to_string(),
                ));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match fix_from_line(trimmed) {
                Ok(Some(fix)) => return Ok(fix),
                Ok(None) => continue,
                Err(e) => {
                    debug!("skipping unparsable gpsd line: {}", e);
                    continue;
                }
            }
        }
    };

    timeout(request.timeout, attempt).await.map_err(|_| {
        TrackerError::Timeout(format!(
            "no fix from gpsd within {:.0}s",
            request.timeout.as_secs_f64()
        ))
    })?
}

/// Stream fixes continuously until the connection drops or a read stalls
/// past the request's fix-gap timeout.
pub async fn stream_fixes(
    host: &str,
    port: u16,
    request: &FixRequest,
    mut on_fix: impl FnMut(PositionFix),
) -> Result<()> {
    let mut reader = connect(host, port).await?;
    let mut line = String::new();

    loop {
        line.clear();
        let read = timeout(request.timeout, reader.read_line(&mut line))
            .await
            .map_err(|_| {
                TrackerError::Timeout(format!(
                    "no gpsd data for {:.0}s",
                    request.timeout.as_secs_f64()
                ))
            })?;

        let n = read.map_err(TrackerError::Io)?;
        if n == 0 {
            return Err(TrackerError::Connection(
                "gpsd closed the connection".to_string(),
            ));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match fix_from_line(trimmed) {
            Ok(Some(fix)) => on_fix(fix),
            Ok(None) => {}
            Err(e) => debug!("skipping unparsable gpsd line: {}", e),
        }
    }
}
