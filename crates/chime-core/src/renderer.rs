//! Audible rendering seam.
//!
//! The engine drives at most one rendering at a time, so the renderer
//! carries no per-alert identity: `start` begins rendering for the observer
//! it is handed, `stop` ends the current rendering.  All acknowledgements
//! arrive asynchronously through [`RendererObserver`].

use std::sync::Arc;

/// Raw renderer transitions, before the alert maps them into lifecycle
/// states (a stop while snoozing becomes `Snoozed`, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererEvent {
    /// Rendering has audibly begun.
    Started,
    /// Rendering stopped in response to a stop request.
    Stopped,
    /// Rendering ran to completion on its own.
    Completed,
    /// Rendering failed; the reason string carries the detail.
    Error,
}

/// Callback target for renderer transitions.  Implemented by the alert
/// entity, which owns the mapping into lifecycle states.
pub trait RendererObserver: Send + Sync {
    fn on_renderer_state_change(&self, event: RendererEvent, reason: &str);
}

/// Begins and ends audible rendering.
///
/// `start` may invoke the observer synchronously from the calling thread;
/// the scheduler tolerates this because inbound transitions are re-queued
/// onto its executor before any state is touched.
pub trait Renderer: Send + Sync {
    /// Begin rendering, reporting transitions to `observer`.
    fn start(&self, observer: Arc<dyn RendererObserver>);

    /// Request that the current rendering stop.  Acknowledged
    /// asynchronously with [`RendererEvent::Stopped`].
    fn stop(&self);
}
