//! CLI command implementations

pub mod auto;
pub mod draw;
pub mod duplicates;
pub mod enter;
pub mod link;
pub mod logs;
pub mod merge;
pub mod setup;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use pinwheel_core::services::{EntryPoint, LogEvent, LoggingService};
use pinwheel_core::PinwheelContext;

/// Get the pinwheel directory from environment or default
pub fn get_pinwheel_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PINWHEEL_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .expect("Could not find home directory")
            .join(".pinwheel")
    }
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let pinwheel_dir = get_pinwheel_dir();
    std::fs::create_dir_all(&pinwheel_dir).ok()?;
    LoggingService::new(&pinwheel_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get or create the pinwheel context
pub fn get_context() -> Result<PinwheelContext> {
    let pinwheel_dir = get_pinwheel_dir();

    std::fs::create_dir_all(&pinwheel_dir)
        .with_context(|| format!("Failed to create pinwheel directory: {:?}", pinwheel_dir))?;

    PinwheelContext::new(&pinwheel_dir).context("Failed to initialize pinwheel context")
}
