//! Shared fixtures for scheduler tests: recording observer, mock renderer,
//! failure-injecting storage, and a harness wiring them together around a
//! `ManualClock`.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use chime_core::alert::format_rfc3339;
use chime_core::clock::ManualClock;
use chime_core::config::SchedulerConfig;
use chime_core::observer::{AlertLifecycleState, AlertObserver, LifecycleChange};
use chime_core::renderer::{Renderer, RendererEvent, RendererObserver};
use chime_core::scheduler::AlertScheduler;
use chime_core::storage::{AlertStorage, SqliteAlertStorage, StorageResult, StoredAlert};
use chime_core::StorageError;

/// Default past-due tolerance used by the harness (seconds).
pub const TOLERANCE_SECS: u64 = 30;

/// RFC 3339 text for a Unix epoch second.
pub fn iso(unix: i64) -> String {
    format_rfc3339(unix).unwrap()
}

// ────────────────────────────────────────────────────────────────────
// Recording observer
// ────────────────────────────────────────────────────────────────────

/// Observer that records every notification and lets tests wait for a
/// condition instead of sleeping.
#[derive(Default)]
pub struct RecordingObserver {
    changes: Mutex<Vec<LifecycleChange>>,
    cv: Condvar,
}

impl RecordingObserver {
    pub fn changes(&self) -> Vec<LifecycleChange> {
        self.changes.lock().unwrap().clone()
    }

    /// Count of notifications with the given state for the given token.
    pub fn count_for(&self, token: &str, state: AlertLifecycleState) -> usize {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.token == token && c.state == state)
            .count()
    }

    /// Block until `pred` holds over the recorded notifications, or fail
    /// after `timeout`.
    pub fn wait_until(
        &self,
        timeout: Duration,
        pred: impl Fn(&[LifecycleChange]) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut changes = self.changes.lock().unwrap();
        while !pred(&changes) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.cv.wait_timeout(changes, deadline - now).unwrap();
            changes = guard;
        }
        true
    }

    /// Wait until a notification with this token and state has arrived.
    pub fn wait_for(&self, token: &str, state: AlertLifecycleState) -> bool {
        self.wait_until(Duration::from_secs(5), |changes| {
            changes.iter().any(|c| c.token == token && c.state == state)
        })
    }
}

impl AlertObserver for RecordingObserver {
    fn on_alert_state_change(&self, change: LifecycleChange) {
        self.changes.lock().unwrap().push(change);
        self.cv.notify_all();
    }
}

// ────────────────────────────────────────────────────────────────────
// Mock renderer
// ────────────────────────────────────────────────────────────────────

/// Renderer that records start/stop requests and lets the test fire the
/// asynchronous acknowledgements by hand.
#[derive(Default)]
pub struct MockRenderer {
    observers: Mutex<Vec<Arc<dyn RendererObserver>>>,
    starts: Mutex<usize>,
    stops: Mutex<usize>,
}

impl MockRenderer {
    pub fn start_count(&self) -> usize {
        *self.starts.lock().unwrap()
    }

    pub fn stop_count(&self) -> usize {
        *self.stops.lock().unwrap()
    }

    fn current_observer(&self) -> Arc<dyn RendererObserver> {
        self.observers
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("renderer was never started")
    }

    /// Acknowledge the start request.
    pub fn ack_started(&self) {
        self.current_observer()
            .on_renderer_state_change(RendererEvent::Started, "");
    }

    /// Acknowledge a stop request.
    pub fn ack_stopped(&self) {
        self.current_observer()
            .on_renderer_state_change(RendererEvent::Stopped, "");
    }

    /// Report natural completion.
    pub fn ack_completed(&self) {
        self.current_observer()
            .on_renderer_state_change(RendererEvent::Completed, "");
    }

    /// Report a rendering failure.
    pub fn fail(&self, reason: &str) {
        self.current_observer()
            .on_renderer_state_change(RendererEvent::Error, reason);
    }
}

impl Renderer for MockRenderer {
    fn start(&self, observer: Arc<dyn RendererObserver>) {
        self.observers.lock().unwrap().push(observer);
        *self.starts.lock().unwrap() += 1;
    }

    fn stop(&self) {
        *self.stops.lock().unwrap() += 1;
    }
}

// ────────────────────────────────────────────────────────────────────
// Failure-injecting storage
// ────────────────────────────────────────────────────────────────────

/// SQLite storage with per-operation failure switches.
pub struct ScriptedStorage {
    inner: SqliteAlertStorage,
    pub fail_store: AtomicBool,
    pub fail_modify: AtomicBool,
    pub fail_erase: AtomicBool,
    pub fail_bulk_erase: AtomicBool,
}

impl ScriptedStorage {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            inner: SqliteAlertStorage::new(db_path.as_ref().to_path_buf()),
            fail_store: AtomicBool::new(false),
            fail_modify: AtomicBool::new(false),
            fail_erase: AtomicBool::new(false),
            fail_bulk_erase: AtomicBool::new(false),
        }
    }

    fn injected(flag: &AtomicBool) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StorageError::Database("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl AlertStorage for ScriptedStorage {
    fn open(&self) -> StorageResult<()> {
        self.inner.open()
    }

    fn create_database(&self) -> StorageResult<()> {
        self.inner.create_database()
    }

    fn load(&self) -> StorageResult<Vec<StoredAlert>> {
        self.inner.load()
    }

    fn store(&self, alert: &StoredAlert) -> StorageResult<()> {
        Self::injected(&self.fail_store)?;
        self.inner.store(alert)
    }

    fn modify(&self, alert: &StoredAlert) -> StorageResult<()> {
        Self::injected(&self.fail_modify)?;
        self.inner.modify(alert)
    }

    fn erase(&self, token: &str) -> StorageResult<()> {
        Self::injected(&self.fail_erase)?;
        self.inner.erase(token)
    }

    fn bulk_erase(&self, tokens: &[String]) -> StorageResult<()> {
        Self::injected(&self.fail_bulk_erase)?;
        self.inner.bulk_erase(tokens)
    }

    fn clear_database(&self) -> StorageResult<()> {
        self.inner.clear_database()
    }
}

// ────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────

pub struct Harness {
    pub scheduler: AlertScheduler,
    pub observer: Arc<RecordingObserver>,
    pub renderer: Arc<MockRenderer>,
    pub storage: Arc<ScriptedStorage>,
    pub clock: Arc<ManualClock>,
    dir: tempfile::TempDir,
}

impl Harness {
    /// Build an engine around a `ManualClock` pinned at `now`.  Storage is
    /// not opened until [`Harness::init`] so tests can seed the database
    /// first (see [`Harness::seed`]).
    pub fn new(now: i64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(ScriptedStorage::new(dir.path().join("alerts.db")));
        let renderer = Arc::new(MockRenderer::default());
        let clock = Arc::new(ManualClock::new(now));
        let config = SchedulerConfig {
            past_due_limit_secs: TOLERANCE_SECS,
        };
        let scheduler = AlertScheduler::new(
            Arc::clone(&storage) as Arc<dyn AlertStorage>,
            Arc::clone(&renderer) as Arc<dyn Renderer>,
            Arc::clone(&clock) as Arc<dyn chime_core::clock::Clock>,
            &config,
        );
        Self {
            scheduler,
            observer: Arc::new(RecordingObserver::default()),
            renderer,
            storage,
            clock,
            dir,
        }
    }

    /// Write rows into the backing database before the engine opens it.
    pub fn seed(&self, rows: &[StoredAlert]) {
        let seed_storage = SqliteAlertStorage::new(self.dir.path().join("alerts.db"));
        seed_storage.create_database().unwrap();
        for row in rows {
            seed_storage.store(row).unwrap();
        }
    }

    pub fn init(&self) {
        assert!(self
            .scheduler
            .initialize(Arc::clone(&self.observer) as Arc<dyn AlertObserver>));
    }

    /// Persisted rows, for post-condition checks.
    pub fn persisted(&self) -> Vec<StoredAlert> {
        self.storage.load().unwrap()
    }
}

/// A stored row in the idle state.
pub fn stored(token: &str, type_name: &str, unix: i64) -> StoredAlert {
    StoredAlert {
        token: token.to_string(),
        type_name: type_name.to_string(),
        scheduled_time_iso8601: iso(unix),
        scheduled_time_unix: unix,
        state: chime_core::alert::AlertState::Idle,
    }
}
