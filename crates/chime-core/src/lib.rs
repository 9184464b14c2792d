//! chime-core: persistent single-active alert scheduling engine.
//!
//! The engine accepts, persists, updates, and deletes user-scheduled
//! alerts (alarms, timers, reminders), keeps at most one alert rendering
//! at a time, and coordinates activation with an external audio-focus
//! authority.
//!
//! # Architecture
//!
//! ```text
//! callers ──► AlertScheduler ──► AlertStorage (SQLite)
//!                 │  ▲
//!                 │  └── state changes ◄── Alert ◄── Renderer
//!                 ├──► DelayTimer (one-shot toward the earliest alert)
//!                 └──► Executor ──► AlertObserver (upstream)
//! ```
//!
//! # Modules
//!
//! - `scheduler`: the core engine (scheduled set, active slot, focus
//!   handling, timer arming, callback serialization)
//! - `alert`: the alert entity and its rendering state machine
//! - `storage`: durable alert CRUD over SQLite
//! - `renderer`: audible-rendering seam
//! - `observer`: lifecycle notification types and seams
//! - `clock`: wall-clock seam (`SystemClock`, `ManualClock`)
//! - `timer`: cancellable one-shot delay timer
//! - `executor`: single-worker FIFO task executor
//! - `config`: scheduler configuration
//! - `logging`: tracing subscriber setup
//! - `error`: error types
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod alert;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod observer;
pub mod renderer;
pub mod scheduler;
pub mod storage;
pub mod timer;

pub use error::{Error, Result, StorageError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
