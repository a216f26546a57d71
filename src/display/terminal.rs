// src/display/terminal.rs
//! Terminal status view for a live walk

use crate::error::{Result, TrackerError};
use crate::session::{SourceMode, WalkSession};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::sleep;

pub struct WalkDisplay;

impl WalkDisplay {
    pub fn new() -> Self {
        Self
    }

    /// Run the status view until Ctrl+C clears the running flag.
    pub async fn run(&self, session: &WalkSession, running: Arc<AtomicBool>) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap).map_err(TrackerError::Io)?;

        // Set up Ctrl+C handler
        let running_clone = Arc::clone(&running);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.unwrap();
            running_clone.store(false, Ordering::Relaxed);
        });

        while running.load(Ordering::Relaxed) {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0)).map_err(TrackerError::Io)?;
            self.render(&mut stdout, session)?;
            stdout.flush().map_err(TrackerError::Io)?;
            sleep(Duration::from_millis(500)).await;
        }

        execute!(stdout, Show, EnableLineWrap).map_err(TrackerError::Io)?;
        println!("\nFinishing walk...");
        Ok(())
    }

    fn render(&self, stdout: &mut impl Write, session: &WalkSession) -> Result<()> {
        let debug = session.debug_info();

        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print("Walk Tracker - GPS Walking Mission"),
            Print("\n"),
            Print("=".repeat(60)),
            Print("\n"),
            ResetColor
        )
        .map_err(TrackerError::Io)?;

        execute!(
            stdout,
            SetForegroundColor(Color::Yellow),
            Print("DISTANCE:\n"),
            ResetColor,
            Print(format!("  Walked:    {:>10.0} m\n\n", debug.total_distance_m))
        )
        .map_err(TrackerError::Io)?;

        execute!(
            stdout,
            SetForegroundColor(Color::Cyan),
            Print("POSITION:\n"),
            ResetColor
        )
        .map_err(TrackerError::Io)?;

        match session.current_position() {
            Some(fix) => {
                execute!(
                    stdout,
                    Print(format!("  Latitude:  {:>12.6}\n", fix.latitude)),
                    Print(format!("  Longitude: {:>12.6}\n", fix.longitude)),
                    Print(format!(
                        "  Accuracy:  {:>10.1} m ({})\n\n",
                        fix.accuracy,
                        fix.accuracy_grade()
                    ))
                )
                .map_err(TrackerError::Io)?;
            }
            None => {
                execute!(stdout, Print("  Waiting for a fix...\n\n")).map_err(TrackerError::Io)?;
            }
        }

        let mode_color = match debug.mode {
            SourceMode::Continuous => Color::Green,
            SourceMode::Polling => Color::Yellow,
            SourceMode::Idle => Color::Red,
        };
        execute!(
            stdout,
            SetForegroundColor(Color::Magenta),
            Print("SOURCE:\n"),
            ResetColor,
            Print("  Mode:      "),
            SetForegroundColor(mode_color),
            Print(format!("{:>10}\n", debug.mode)),
            ResetColor,
            Print(format!("  Fixes:     {:>10}\n\n", debug.fix_count))
        )
        .map_err(TrackerError::Io)?;

        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print("Press Ctrl+C to finish the walk"),
            Print("\n"),
            ResetColor
        )
        .map_err(TrackerError::Io)?;

        Ok(())
    }
}

impl Default for WalkDisplay {
    fn default() -> Self {
        Self::new()
    }
}
