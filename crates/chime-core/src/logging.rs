//! Structured logging for the alert engine.
//!
//! Built on `tracing` with two output formats: pretty for interactive use,
//! JSON lines for ops.  Events carry consistent correlation fields
//! (`token`, `state`, `reason`, `focus`) so a single alert's life can be
//! followed across threads.
//!
//! Initialize once at startup:
//!
//! ```ignore
//! use chime_core::logging::{init_logging, LogConfig, LogFormat};
//!
//! init_logging(&LogConfig {
//!     level: "info".to_string(),
//!     format: LogFormat::Pretty,
//! })?;
//! ```

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Global flag so a second initialization is a no-op instead of a panic.
static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Output format for log events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-friendly output for interactive use.
    #[default]
    Pretty,
    /// Machine-parseable JSON lines.
    Json,
}

/// Logging configuration.
///
/// ```toml
/// [logging]
/// level = "info"
/// format = "pretty"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level filter (overridden by `RUST_LOG` when set).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber.  Returns `Ok` without side
/// effects when logging was already initialized (including by a test
/// harness).
pub fn init_logging(config: &LogConfig) -> Result<()> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Logging(format!("invalid level filter: {e}")))?;

    let result = match config.format {
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init(),
    };

    match result {
        Ok(()) => {
            let _ = LOGGING_INITIALIZED.set(true);
            Ok(())
        }
        // Another subscriber won the race; treat as initialized.
        Err(_) => {
            let _ = LOGGING_INITIALIZED.set(true);
            Ok(())
        }
    }
}
