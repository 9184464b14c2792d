//! Single-worker FIFO task executor.
//!
//! Callbacks from the renderer and the delay timer are re-queued here so
//! they run serialized, in submission order, and off the caller's thread.
//! The observer also only ever hears from this thread, which is what makes
//! notification ordering deterministic.

use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::debug;

/// Boxed unit of work.
pub type TaskFn = Box<dyn FnOnce() + Send>;

/// FIFO executor with exactly one worker thread.
pub struct Executor {
    inner: Mutex<ExecutorInner>,
}

struct ExecutorInner {
    tx: Option<Sender<TaskFn>>,
    worker: Option<JoinHandle<()>>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<TaskFn>();
        let worker = thread::Builder::new()
            .name("chime-executor".to_string())
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    task();
                }
            })
            .expect("failed to spawn executor worker");

        Self {
            inner: Mutex::new(ExecutorInner {
                tx: Some(tx),
                worker: Some(worker),
            }),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, ExecutorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a task behind all previously submitted work.  Tasks submitted
    /// after [`Executor::shutdown`] are dropped.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let inner = self.lock_inner();
        match &inner.tx {
            Some(tx) => {
                if tx.send(Box::new(task)).is_err() {
                    debug!("executor worker is gone; task dropped");
                }
            }
            None => debug!("submit after shutdown; task dropped"),
        }
    }

    /// Stop accepting tasks, run everything already queued, and join the
    /// worker.  Idempotent.
    pub fn shutdown(&self) {
        let (tx, worker) = {
            let mut inner = self.lock_inner();
            (inner.tx.take(), inner.worker.take())
        };
        // Closing the channel lets the worker drain the queue and exit.
        drop(tx);
        if let Some(worker) = worker {
            if worker.thread().id() == thread::current().id() {
                // Shut down from inside a task (e.g. the last owner was
                // dropped by the worker).  The queue is already draining;
                // joining here would deadlock.
                return;
            }
            let _ = worker.join();
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
