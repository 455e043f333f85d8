//! Tracing setup for host applications.
//!
//! The library itself only emits `tracing` events (request/reply lines at
//! trace level, sickness and rebuild at warn/info). This module is a small
//! convenience for hosts that have no subscriber of their own: stderr
//! output, text or JSON, with `RUST_LOG` taking precedence when set.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Error, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

/// Install a stderr subscriber for this crate's events.
///
/// `verbosity` maps 0..=4 to error..=trace for the `sam_bridge` target;
/// a `RUST_LOG` value overrides it. Debug and trace runs also annotate
/// events with file and line.
pub fn init_logging(verbosity: u8, format: LogFormat) -> Result<()> {
    let level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sam_bridge={level}")));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(verbosity >= 3)
                    .with_line_number(verbosity >= 3),
            )
            .try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
}

/// Initialize logging with defaults for testing.
///
/// Info level, text format. Silently ignores errors (a subscriber may
/// already be installed).
pub fn init_test_logging() {
    let _ = init_logging(2, LogFormat::Text);
}
