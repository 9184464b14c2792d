//! Cancellable one-shot delay timer.
//!
//! At most one shot is pending at a time: arming the timer supersedes any
//! earlier shot, and [`DelayTimer::stop`] cancels without firing.  Each
//! shot gets its own waiter thread parked on a condvar; a generation
//! counter tells a woken waiter whether it is still the current shot.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// One-shot timer with cancellation.
pub struct DelayTimer {
    shared: Arc<TimerShared>,
}

struct TimerShared {
    state: Mutex<TimerState>,
    cv: Condvar,
}

struct TimerState {
    /// Bumped on every arm/cancel; a waiter only fires if its generation
    /// is still current when the deadline passes.
    generation: u64,
    armed: bool,
}

impl TimerShared {
    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DelayTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayTimer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(TimerShared {
                state: Mutex::new(TimerState {
                    generation: 0,
                    armed: false,
                }),
                cv: Condvar::new(),
            }),
        }
    }

    /// Arm the timer to run `task` after `delay`.  Any pending shot is
    /// cancelled first.  The task runs on the waiter thread.
    pub fn start<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = {
            let mut state = self.shared.lock_state();
            state.generation += 1;
            state.armed = true;
            self.shared.cv.notify_all();
            state.generation
        };

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("chime-timer".to_string())
            .spawn(move || {
                let deadline = Instant::now() + delay;
                let mut state = shared.lock_state();
                loop {
                    if state.generation != generation {
                        // Superseded by a later arm or a cancel.
                        return;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    state = shared
                        .cv
                        .wait_timeout(state, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|e| e.into_inner().0);
                }
                state.armed = false;
                drop(state);
                task();
            });
        if spawned.is_err() {
            debug!("failed to spawn timer waiter; shot dropped");
            self.shared.lock_state().armed = false;
        }
    }

    /// Cancel the pending shot, if any.
    pub fn stop(&self) {
        let mut state = self.shared.lock_state();
        if state.armed {
            debug!("cancelling pending timer shot");
        }
        state.generation += 1;
        state.armed = false;
        self.shared.cv.notify_all();
    }

    /// True while a shot is armed and has not yet fired or been cancelled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.lock_state().armed
    }
}
