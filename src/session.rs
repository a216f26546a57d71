// src/session.rs
//! Tracking session lifecycle and fix-source management

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::gps::data::{FixRequest, PositionFix};
use crate::gps::{gpsd, replay};
use crate::mission::WalkSummary;
use crate::tracker::{DistanceTracker, TrackerEvent};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// Where position fixes come from.
#[derive(Debug, Clone)]
pub enum FixProvider {
    /// A gpsd daemon reachable over TCP.
    Gpsd { host: String, port: u16 },
    /// A JSON-lines recording played back at `rate` times real speed.
    Replay { path: PathBuf, rate: f64 },
}

impl FixProvider {
    /// Request a single fix now.
    pub async fn current_fix(&self, request: &FixRequest) -> Result<PositionFix> {
        match self {
            FixProvider::Gpsd { host, port } => gpsd::current_fix(host, *port, request).await,
            FixProvider::Replay { path, .. } => replay::first_fix(path),
        }
    }

    /// Probe whether location access is usable at all. Only an explicit
    /// permission refusal counts as unusable; transient failures do not.
    pub async fn check_location_access(&self) -> bool {
        let request = FixRequest {
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        !matches!(
            self.current_fix(&request).await,
            Err(TrackerError::PermissionDenied(_))
        )
    }
}

/// The one live fix source of a session.
///
/// Continuous observation and the polling fallback can never run at the
/// same time: swapping sources goes through `cancel`, which aborts every
/// task owned by the previous variant.
enum ActiveSource {
    Idle,
    Continuous {
        stream: JoinHandle<()>,
        watchdog: JoinHandle<()>,
    },
    Polling {
        timer: JoinHandle<()>,
    },
}

impl ActiveSource {
    fn cancel(&mut self) {
        match std::mem::replace(self, ActiveSource::Idle) {
            ActiveSource::Idle => {}
            ActiveSource::Continuous { stream, watchdog } => {
                stream.abort();
                watchdog.abort();
            }
            ActiveSource::Polling { timer } => {
                timer.abort();
            }
        }
    }

    fn mode(&self) -> SourceMode {
        match self {
            ActiveSource::Idle => SourceMode::Idle,
            ActiveSource::Continuous { .. } => SourceMode::Continuous,
            ActiveSource::Polling { .. } => SourceMode::Polling,
        }
    }
}

/// Which kind of fix source is currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Idle,
    Continuous,
    Polling,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceMode::Idle => "idle",
            SourceMode::Continuous => "continuous",
            SourceMode::Polling => "polling",
        };
        write!(f, "{}", name)
    }
}

/// Diagnostic snapshot of a session.
#[derive(Debug, Clone)]
pub struct SessionDebug {
    pub mode: SourceMode,
    pub fix_count: u64,
    pub total_distance_m: f64,
}

struct SessionShared {
    config: TrackerConfig,
    provider: FixProvider,
    tracker: Mutex<DistanceTracker>,
    active: Mutex<ActiveSource>,
    fix_count: AtomicU64,
    started_at: Mutex<Option<DateTime<Utc>>>,
    ended_at: Mutex<Option<DateTime<Utc>>>,
}

impl SessionShared {
    fn ingest(&self, fix: PositionFix) {
        self.fix_count.fetch_add(1, Ordering::Relaxed);
        self.tracker.lock().unwrap().process_fix(fix);
    }

    fn report_error(&self, error: &TrackerError) {
        self.tracker
            .lock()
            .unwrap()
            .report_error(error.category(), &error.to_string());
    }
}

/// Owns one walk's tracking lifecycle: the tracker, the live fix source,
/// and the continuous-to-polling fallback.
///
/// Cloning shares the underlying session.
#[derive(Clone)]
pub struct WalkSession {
    shared: Arc<SessionShared>,
}

impl WalkSession {
    pub fn new(provider: FixProvider, config: TrackerConfig) -> Self {
        let tracker = DistanceTracker::new(config.clone());
        Self {
            shared: Arc::new(SessionShared {
                config,
                provider,
                tracker: Mutex::new(tracker),
                active: Mutex::new(ActiveSource::Idle),
                fix_count: AtomicU64::new(0),
                started_at: Mutex::new(None),
                ended_at: Mutex::new(None),
            }),
        }
    }

    /// Install an event sink and return its receiver. Replaces any
    /// previous subscription.
    pub fn subscribe(&self) -> UnboundedReceiver<TrackerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.tracker.lock().unwrap().set_event_sink(tx);
        rx
    }

    /// Start tracking: obtain an initial fix, then observe continuously
    /// with a one-shot watchdog guarding the fallback to polling.
    ///
    /// Returns false (after reporting a categorized error event) when no
    /// initial fix can be obtained.
    pub async fn start_tracking(&self) -> bool {
        if self.is_tracking() {
            return true;
        }

        let request = self.shared.config.initial_request();
        let first = match self.shared.provider.current_fix(&request).await {
            Ok(fix) => fix,
            Err(e) => {
                self.shared.report_error(&e);
                return false;
            }
        };

        info!(
            "tracking started at {:.6}, {:.6} ({})",
            first.latitude,
            first.longitude,
            first.accuracy_grade()
        );

        self.shared.tracker.lock().unwrap().process_fix(first);
        *self.shared.started_at.lock().unwrap() = Some(Utc::now());
        *self.shared.ended_at.lock().unwrap() = None;
        self.shared.fix_count.store(0, Ordering::Relaxed);

        let stream = tokio::spawn(run_continuous(Arc::clone(&self.shared)));
        let watchdog = tokio::spawn(run_watchdog(Arc::clone(&self.shared)));

        let mut active = self.shared.active.lock().unwrap();
        active.cancel();
        *active = ActiveSource::Continuous { stream, watchdog };
        true
    }

    /// Stop tracking: cancel the live source and flush any meaningful
    /// pending accumulation.
    pub fn stop_tracking(&self) {
        self.shared.active.lock().unwrap().cancel();
        self.shared.tracker.lock().unwrap().finalize();
        *self.shared.ended_at.lock().unwrap() = Some(Utc::now());
        self.shared.fix_count.store(0, Ordering::Relaxed);
        info!(
            "tracking stopped, total {:.1} m",
            self.total_distance()
        );
    }

    pub fn is_tracking(&self) -> bool {
        self.shared.active.lock().unwrap().mode() != SourceMode::Idle
    }

    pub fn total_distance(&self) -> f64 {
        self.shared.tracker.lock().unwrap().total_distance()
    }

    pub fn current_position(&self) -> Option<PositionFix> {
        self.shared.tracker.lock().unwrap().current_position()
    }

    /// Zero the walked distance and all position baselines.
    pub fn reset_distance(&self) {
        self.shared.tracker.lock().unwrap().reset();
    }

    /// Probe location access via the session's provider.
    pub async fn check_location_access(&self) -> bool {
        self.shared.provider.check_location_access().await
    }

    pub fn debug_info(&self) -> SessionDebug {
        SessionDebug {
            mode: self.shared.active.lock().unwrap().mode(),
            fix_count: self.shared.fix_count.load(Ordering::Relaxed),
            total_distance_m: self.total_distance(),
        }
    }

    /// Build the end-of-walk record. `target_m` falls back to the
    /// configured mission target.
    pub fn summary(&self, target_m: Option<f64>) -> WalkSummary {
        let started = self
            .shared
            .started_at
            .lock()
            .unwrap()
            .unwrap_or_else(Utc::now);
        let ended = self.shared.ended_at.lock().unwrap().unwrap_or_else(Utc::now);
        let tracker = self.shared.tracker.lock().unwrap();
        WalkSummary::new(
            started,
            ended,
            tracker.total_distance(),
            target_m.or(Some(self.shared.config.default_target_m)),
            tracker.accumulation_flushes(),
        )
    }
}

/// Continuous observation task. On source failure the session degrades to
/// polling; a normal end of stream (replay exhausted) leaves the session
/// running until it is stopped.
async fn run_continuous(shared: Arc<SessionShared>) {
    let request = shared.config.watch_request();
    let result = match shared.provider.clone() {
        FixProvider::Gpsd { host, port } => {
            gpsd::stream_fixes(&host, port, &request, |fix| shared.ingest(fix)).await
        }
        FixProvider::Replay { path, rate } => {
            replay::stream_fixes(&path, rate, |fix| shared.ingest(fix)).await
        }
    };

    if let Err(e) = result {
        warn!("continuous observation failed, degrading to polling: {}", e);
        shared.report_error(&e);
        fall_back_to_polling(&shared);
    }
}

/// One-shot watchdog: if continuous observation has delivered nothing by
/// the deadline, swap it for the polling fallback.
async fn run_watchdog(shared: Arc<SessionShared>) {
    tokio::time::sleep(Duration::from_secs(shared.config.watchdog_secs)).await;
    if shared.fix_count.load(Ordering::Relaxed) == 0 {
        warn!(
            "no continuous fix within {}s, degrading to polling",
            shared.config.watchdog_secs
        );
        fall_back_to_polling(&shared);
    }
}

/// Replace a live continuous source with the polling fallback. A session
/// that is idle (stopped) or already polling is left untouched.
fn fall_back_to_polling(shared: &Arc<SessionShared>) {
    let mut active = shared.active.lock().unwrap();
    if !matches!(*active, ActiveSource::Continuous { .. }) {
        return;
    }
    active.cancel();
    let timer = tokio::spawn(run_polling(Arc::clone(shared)));
    *active = ActiveSource::Polling { timer };
}

/// Degraded mode: a single-shot fix request on a fixed interval.
async fn run_polling(shared: Arc<SessionShared>) {
    let request = shared.config.poll_request();
    let mut ticker =
        tokio::time::interval(Duration::from_secs(shared.config.poll_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match shared.provider.current_fix(&request).await {
            Ok(fix) => shared.ingest(fix),
            Err(e) => shared.report_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn write_recording(name: &str, lines: &[String]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn fix_line(meters_north: f64, at_ms: i64, accuracy: f64) -> String {
        format!(
            "{{\"latitude\":{},\"longitude\":139.0,\"accuracy\":{},\"timestamp\":{}}}",
            35.0 + meters_north / 111_194.93,
            accuracy,
            1_700_000_000_000i64 + at_ms
        )
    }

    fn fast_config() -> TrackerConfig {
        TrackerConfig {
            watchdog_secs: 1,
            poll_interval_secs: 1,
            initial_fix_timeout_secs: 5,
            watch_fix_timeout_secs: 30,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_replay_session_tracks_distance() {
        // 9 m every 4 s with accuracy 10 m: three direct adds.
        let path = write_recording(
            "walk_tracker_session_walk.jsonl",
            &[
                fix_line(0.0, 0, 10.0),
                fix_line(9.0, 4_000, 10.0),
                fix_line(18.0, 8_000, 10.0),
                fix_line(27.0, 12_000, 10.0),
            ],
        );

        let session = WalkSession::new(
            FixProvider::Replay { path, rate: 1000.0 },
            fast_config(),
        );
        let mut events = session.subscribe();

        assert!(session.start_tracking().await);
        assert!(session.is_tracking());

        let mut distance_updates = 0;
        while distance_updates < 3 {
            let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
                .await
                .expect("expected a distance update before the deadline")
                .expect("event channel closed");
            if let TrackerEvent::Distance(total) = event {
                distance_updates += 1;
                assert!(total > 0.0);
            }
        }

        assert!((session.total_distance() - 27.0).abs() < 0.1);
        assert!(session.current_position().is_some());

        session.stop_tracking();
        assert!(!session.is_tracking());
        assert_eq!(session.debug_info().mode, SourceMode::Idle);
    }

    #[tokio::test]
    async fn test_start_fails_without_source() {
        let missing = std::env::temp_dir().join("walk_tracker_session_missing.jsonl");
        let _ = std::fs::remove_file(&missing);

        let session = WalkSession::new(
            FixProvider::Replay {
                path: missing,
                rate: 1.0,
            },
            fast_config(),
        );
        let mut events = session.subscribe();

        assert!(!session.start_tracking().await);
        assert!(!session.is_tracking());

        match events.try_recv().expect("expected an error event") {
            TrackerEvent::Error { category, .. } => {
                assert_eq!(category, ErrorCategory::Unavailable);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_flushes_pending_accumulation() {
        // Two 1.5 m moves leave a 3 m bucket pending; stopping flushes it.
        let path = write_recording(
            "walk_tracker_session_flush.jsonl",
            &[
                fix_line(0.0, 0, 5.0),
                fix_line(1.5, 4_000, 5.0),
                fix_line(3.0, 8_000, 5.0),
            ],
        );

        let session = WalkSession::new(
            FixProvider::Replay { path, rate: 1000.0 },
            fast_config(),
        );
        assert!(session.start_tracking().await);

        // Let the short replay run to completion.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(session.total_distance(), 0.0);

        session.stop_tracking();
        assert!((session.total_distance() - 3.0).abs() < 0.05);

        let summary = session.summary(None);
        assert_eq!(summary.distance_m, 3.0);
        assert!(!summary.success);
        assert_eq!(summary.accumulated_segments, 1);
    }

    /// A gpsd stand-in that answers single-shot requests with one TPV
    /// report but never delivers anything on the continuous watch.
    async fn spawn_stalling_gpsd() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut connection = 0u32;
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                connection += 1;
                let stall = connection == 2;
                tokio::spawn(async move {
                    let mut buf = [0u8; 128];
                    let _ = socket.read(&mut buf).await;
                    if stall {
                        tokio::time::sleep(Duration::from_secs(20)).await;
                        return;
                    }
                    let tpv = format!(
                        "{{\"class\":\"TPV\",\"mode\":3,\"time\":\"{}\",\"lat\":35.6586,\"lon\":139.7454,\"eph\":8.0}}\n",
                        Utc::now().to_rfc3339()
                    );
                    let _ = socket.write_all(tpv.as_bytes()).await;
                    tokio::time::sleep(Duration::from_secs(2)).await;
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_watchdog_falls_back_to_polling() {
        let addr = spawn_stalling_gpsd().await;
        let session = WalkSession::new(
            FixProvider::Gpsd {
                host: addr.ip().to_string(),
                port: addr.port(),
            },
            fast_config(),
        );

        assert!(session.start_tracking().await);
        assert_eq!(session.debug_info().mode, SourceMode::Continuous);

        // Watchdog fires after 1 s; the first poll follows immediately.
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let debug = session.debug_info();
        assert_eq!(debug.mode, SourceMode::Polling);
        assert!(debug.fix_count >= 1);
        assert!(session.is_tracking());
        assert!(session.current_position().is_some());

        session.stop_tracking();
        assert_eq!(session.debug_info().mode, SourceMode::Idle);
    }
}
