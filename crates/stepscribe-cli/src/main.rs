//! stepscribe - headless tutorial recorder.
//!
//! Records clicks, key presses and manual captures, then synthesizes them into
//! narrated steps with screenshots when the session stops.

mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Command, HELP};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use stepscribe_core::{
    load_or_default, CoordinateSystem, FileStorage, InputMonitor, InputSink, SessionManager,
    SessionNotification, SessionState, SessionStatus,
};
use stepscribe_platform::{ocr, RdevInputMonitor, XcapCapture};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "stepscribe")]
#[command(about = "Record on-screen actions and turn them into tutorial steps")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Root directory for tutorials and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Debug-level logging
    #[arg(long)]
    debug: bool,
    /// Also write a daily rolling log file under the data directory
    #[arg(long)]
    log_file: bool,
    /// Record only on this monitor
    #[arg(long)]
    monitor: Option<u32>,
}

struct App {
    manager: Arc<SessionManager>,
    storage: Arc<FileStorage>,
    capture: XcapCapture,
    monitor: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref());
    if let Some(dir) = cli.data_dir.clone() {
        config.storage.data_dir = Some(dir);
    }
    let data_dir = config.storage.resolved_data_dir();
    let log_dir = cli.log_file.then(|| data_dir.join("logs"));
    logging::setup(cli.debug, log_dir.as_deref());

    stepscribe_platform::set_dpi_aware();

    let capture = XcapCapture::new();
    let monitors = capture.monitors().unwrap_or_else(|error| {
        warn!(%error, "Monitor enumeration failed, using fallback geometry");
        Vec::new()
    });
    let coords = Arc::new(CoordinateSystem::with_monitors(monitors));

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let storage = Arc::new(FileStorage::new(&data_dir, config.storage.screenshot_quality));
    let cascade = Arc::new(ocr::build_cascade(&config.recognition));

    let manager = Arc::new(SessionManager::new(
        &config,
        coords,
        Arc::new(capture),
        storage.clone(),
        cascade,
    ));

    let sink: Arc<dyn InputSink> = manager.clone();
    let input: Arc<dyn InputMonitor> = Arc::new(RdevInputMonitor::new(
        Arc::downgrade(&sink),
        config.gesture.clone(),
        stepscribe_platform::double_click_interval(),
        config.keyboard.manual_capture_hotkey.clone(),
    ));
    manager.set_input_monitor(input);

    let notifications = manager.subscribe();
    thread::Builder::new()
        .name("stepscribe-notify".into())
        .spawn(move || {
            for notification in notifications.iter() {
                print_notification(&notification);
            }
        })
        .context("spawning notification printer")?;

    info!(data_dir = %data_dir.display(), "stepscribe ready");
    let app = App {
        manager,
        storage,
        capture,
        monitor: cli.monitor,
    };
    app.run()
}

impl App {
    fn run(&self) -> Result<()> {
        println!("stepscribe ready. Type `help` for commands.");
        let stdin = io::stdin();
        prompt()?;
        for line in stdin.lock().lines() {
            let line = line.context("reading stdin")?;
            match commands::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => {
                    if let Err(e) = self.execute(command) {
                        println!("error: {e:#}");
                    }
                }
                Ok(None) => {}
                Err(message) => println!("{message}"),
            }
            prompt()?;
        }

        let active = self
            .manager
            .status()
            .state
            .is_some_and(|state| state != SessionState::Stopped);
        if active {
            info!("Stopping active recording before exit");
            self.stop();
        }
        Ok(())
    }

    fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::New { title } => {
                let metadata = self.storage.create_tutorial(&title)?;
                let status =
                    self.manager
                        .create_session(metadata.tutorial_id, metadata.title, self.monitor);
                print_status(&status);
            }
            Command::Start => {
                if !self.manager.start_recording() {
                    println!("cannot start: create a session with `new <title>` first");
                }
            }
            Command::Pause => {
                if !self.manager.pause_recording() {
                    println!("not recording");
                }
            }
            Command::Resume => {
                if !self.manager.resume_recording() {
                    println!("not paused");
                }
            }
            Command::Stop => self.stop(),
            Command::Status => print_status(&self.manager.status()),
            Command::Capture => {
                if !self.manager.capture_at_pointer() {
                    println!("capture ignored: not recording");
                }
            }
            Command::Keys => {
                let suppressed = self.manager.toggle_keystrokes();
                println!(
                    "keystrokes {}",
                    if suppressed { "suppressed" } else { "recorded" }
                );
            }
            Command::Monitors => {
                let monitors = self.capture.monitors()?;
                self.manager.coordinates().update_geometry(monitors.clone());
                for m in monitors {
                    println!(
                        "{:>4}  {}x{} at ({}, {}){}",
                        m.id,
                        m.width,
                        m.height,
                        m.left,
                        m.top,
                        if m.is_primary { "  primary" } else { "" }
                    );
                }
            }
            Command::List => {
                for tutorial in self.storage.list_tutorials()? {
                    println!(
                        "{}  {:<10} {:>3} steps  {}",
                        tutorial.tutorial_id,
                        format!("{:?}", tutorial.status).to_lowercase(),
                        tutorial.step_count,
                        tutorial.title
                    );
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }

    fn stop(&self) {
        match self.manager.stop_recording() {
            Some(tutorial_id) => {
                let report = self.manager.last_report().unwrap_or_default();
                println!(
                    "stopped {}: {} steps ({} skipped, {} errors)",
                    tutorial_id, report.steps_created, report.skipped, report.errors
                );
            }
            None => println!("not recording"),
        }
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush().context("flushing stdout")
}

fn print_status(status: &SessionStatus) {
    match (&status.tutorial_id, status.state) {
        (Some(id), Some(state)) => println!(
            "{} [{:?}] \"{}\"  {:.1}s  {} events",
            id,
            state,
            status.title.as_deref().unwrap_or(""),
            status.duration_ms as f64 / 1000.0,
            status.live_step_count
        ),
        _ => println!("no session"),
    }
}

fn print_notification(notification: &SessionNotification) {
    println!("\n* {}", notification.kind.as_str());
    print_status(&notification.status);
}
