// src/main.rs
//! Walk Tracker - GPS walk-distance tracking with drift filtering

use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{atomic::AtomicBool, Arc};
use walk_tracker::{
    config::TrackerConfig, display::WalkDisplay, session::FixProvider, TrackerEvent, WalkSession,
};

#[derive(Parser, Debug)]
#[command(name = "walk-tracker", about = "Track walked distance from a live GPS source")]
struct Args {
    /// gpsd endpoint as host:port
    #[arg(long, conflicts_with = "replay", default_value = "localhost:2947")]
    gpsd: String,

    /// Path to a JSON-lines fix recording to replay instead of gpsd
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Playback rate multiplier for --replay
    #[arg(long, default_value = "1.0")]
    rate: f64,

    /// Mission target distance in meters (defaults to the configured target)
    #[arg(long)]
    target: Option<f64>,
}

fn parse_endpoint(endpoint: &str) -> (String, u16) {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => (
            host.to_string(),
            port.parse().unwrap_or(2947),
        ),
        None => (endpoint.to_string(), 2947),
    }
}

#[tokio::main]
async fn main() -> walk_tracker::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = TrackerConfig::load().unwrap_or_default();

    let provider = match args.replay {
        Some(path) => FixProvider::Replay {
            path,
            rate: args.rate,
        },
        None => {
            let (host, port) = parse_endpoint(&args.gpsd);
            FixProvider::Gpsd { host, port }
        }
    };

    let session = WalkSession::new(provider, config);
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                TrackerEvent::Distance(total) => info!("distance update: {:.1} m", total),
                TrackerEvent::Error { category, message } => {
                    warn!("fix source error ({}): {}", category, message)
                }
                TrackerEvent::Position(_) => {}
            }
        }
    });

    println!("Starting walk tracking...");
    if !session.start_tracking().await {
        eprintln!("Could not obtain an initial position fix.");
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    WalkDisplay::new().run(&session, Arc::clone(&running)).await?;

    session.stop_tracking();

    let summary = session.summary(args.target);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
