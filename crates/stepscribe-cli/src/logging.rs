//! Logging setup with optional rolling file output.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn default_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Initialize logging with console output and, when `log_dir` is given, a
/// daily rolling file in that directory. `RUST_LOG` overrides the level.
pub fn setup(debug: bool, log_dir: Option<&Path>) {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(default_filter(debug));

    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Failed to create log directory {:?}: {}", dir, e);
            return None;
        }
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "stepscribe.log");
        Some(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file_appender)
                .with_filter(default_filter(debug)),
        )
    });

    match file_layer {
        Some(file_layer) => {
            tracing_subscriber::registry()
                .with(console_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry().with(console_layer).init();
        }
    }

    if let Some(dir) = log_dir {
        tracing::info!("File logging enabled: {:?}", dir);
    }
    let debug_enabled = debug;
    tracing::info!("Logging initialized (debug={})", debug_enabled);
}
