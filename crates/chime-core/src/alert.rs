//! Alert entity: identity, schedule, and rendering state machine.
//!
//! An [`Alert`] is shared (`Arc`) between the scheduler's scheduled set or
//! active slot, the renderer callback path, and callers, so its mutable
//! fields live behind a mutex.  The entity owns the mapping from raw
//! [`RendererEvent`]s to lifecycle transitions: a stop that lands while the
//! alert is snoozing is reported as `Snoozed`, a requested stop carries the
//! stored stop reason, and so on.  Transitions are forwarded to the
//! attached [`AlertStateListener`] (the scheduler).

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::observer::{AlertLifecycleState, AlertStateListener, LifecycleChange};
use crate::renderer::{Renderer, RendererEvent, RendererObserver};

// =============================================================================
// Enums
// =============================================================================

/// Rendering lifecycle state of a single alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// Scheduled, waiting for its trigger time.
    Idle,
    /// Trigger time arrived; waiting on focus.
    Ready,
    /// Promoted to the active slot; renderer asked to start.
    Activating,
    /// Renderer confirmed rendering.
    Active,
    /// Snooze requested; waiting for the renderer to stop.
    Snoozing,
    /// Stop requested; waiting for the renderer to stop.
    Stopping,
    /// Rendering finished.
    Completed,
}

impl AlertState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Snoozing => "snoozing",
            Self::Stopping => "stopping",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "ready" => Ok(Self::Ready),
            "activating" => Ok(Self::Activating),
            "active" => Ok(Self::Active),
            "snoozing" => Ok(Self::Snoozing),
            "stopping" => Ok(Self::Stopping),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown alert state: {other}")),
        }
    }
}

/// Why an active alert is being deactivated.  Carried through the renderer
/// and back out to the observer as the reason string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The remote service asked for the alert to stop (e.g. a delete
    /// directive).
    RemoteStop,
    /// The device user stopped the alert locally.
    LocalStop,
    /// The engine is shutting down.
    Shutdown,
}

impl StopReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteStop => "remote_stop",
            Self::LocalStop => "local_stop",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StopReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "remote_stop" => Ok(Self::RemoteStop),
            "local_stop" => Ok(Self::LocalStop),
            "shutdown" => Ok(Self::Shutdown),
            other => Err(format!("unknown stop reason: {other}")),
        }
    }
}

/// Externally arbitrated permission to render audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusState {
    /// No permission to render.
    #[default]
    None,
    /// Attenuated rendering permitted.
    Background,
    /// Full rendering permitted.
    Foreground,
}

impl FocusState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Background => "background",
            Self::Foreground => "foreground",
        }
    }
}

impl fmt::Display for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Schedule time helpers
// =============================================================================

/// Parse an RFC 3339 timestamp into Unix epoch seconds.
pub fn parse_rfc3339(s: &str) -> Result<i64> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map_err(|e| Error::InvalidTime(format!("{s:?}: {e}")))?;
    Ok(parsed.timestamp())
}

/// Format Unix epoch seconds as an RFC 3339 timestamp in UTC.
pub fn format_rfc3339(unix: i64) -> Result<String> {
    let time = DateTime::from_timestamp(unix, 0)
        .ok_or_else(|| Error::InvalidTime(format!("epoch {unix} out of range")))?;
    Ok(time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

// =============================================================================
// Context snapshot
// =============================================================================

/// Snapshot of one alert, reported upstream in context queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertContext {
    pub token: String,
    pub type_name: String,
    pub scheduled_time_iso8601: String,
    pub scheduled_time_unix: i64,
    pub state: AlertState,
}

// =============================================================================
// Entity
// =============================================================================

#[derive(Debug)]
struct AlertData {
    scheduled_time_iso: String,
    scheduled_time_unix: i64,
    state: AlertState,
    focus: FocusState,
    stop_reason: Option<StopReason>,
}

/// A user-scheduled alarm, timer, or reminder.
pub struct Alert {
    token: String,
    type_name: String,
    data: Mutex<AlertData>,
    renderer: Mutex<Option<Arc<dyn Renderer>>>,
    listener: Mutex<Option<Weak<dyn AlertStateListener>>>,
}

impl fmt::Debug for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.lock_data();
        f.debug_struct("Alert")
            .field("token", &self.token)
            .field("type_name", &self.type_name)
            .field("scheduled_time_iso", &data.scheduled_time_iso)
            .field("state", &data.state)
            .finish_non_exhaustive()
    }
}

impl Alert {
    /// Create a new alert from an RFC 3339 scheduled time.
    pub fn new(
        token: impl Into<String>,
        type_name: impl Into<String>,
        scheduled_time_iso8601: &str,
    ) -> Result<Self> {
        let unix = parse_rfc3339(scheduled_time_iso8601)?;
        Ok(Self::from_parts(
            token,
            type_name,
            scheduled_time_iso8601,
            unix,
            AlertState::Idle,
        ))
    }

    /// Rebuild an alert from already-validated parts (e.g. a storage row).
    #[must_use]
    pub fn from_parts(
        token: impl Into<String>,
        type_name: impl Into<String>,
        scheduled_time_iso8601: impl Into<String>,
        scheduled_time_unix: i64,
        state: AlertState,
    ) -> Self {
        Self {
            token: token.into(),
            type_name: type_name.into(),
            data: Mutex::new(AlertData {
                scheduled_time_iso: scheduled_time_iso8601.into(),
                scheduled_time_unix,
                state,
                focus: FocusState::None,
                stop_reason: None,
            }),
            renderer: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    fn lock_data(&self) -> MutexGuard<'_, AlertData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn state(&self) -> AlertState {
        self.lock_data().state
    }

    #[must_use]
    pub fn scheduled_time_unix(&self) -> i64 {
        self.lock_data().scheduled_time_unix
    }

    #[must_use]
    pub fn scheduled_time_iso8601(&self) -> String {
        self.lock_data().scheduled_time_iso.clone()
    }

    #[must_use]
    pub fn focus_state(&self) -> FocusState {
        self.lock_data().focus
    }

    /// True when the scheduled time lies more than `tolerance` in the past.
    #[must_use]
    pub fn is_past_due(&self, now_unix: i64, tolerance: Duration) -> bool {
        let scheduled = self.lock_data().scheduled_time_unix;
        now_unix > scheduled.saturating_add(tolerance.as_secs() as i64)
    }

    /// Wire the alert to its renderer and the scheduler's listener seam.
    pub fn attach(&self, renderer: Arc<dyn Renderer>, listener: Weak<dyn AlertStateListener>) {
        *self
            .renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(renderer);
        *self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Move the scheduled time.  The state is left untouched so the caller
    /// can decide what the move means (update vs. snooze).
    pub fn update_scheduled_time(&self, new_time_iso8601: &str) -> Result<()> {
        let unix = parse_rfc3339(new_time_iso8601)?;
        let mut data = self.lock_data();
        data.scheduled_time_iso = new_time_iso8601.to_string();
        data.scheduled_time_unix = unix;
        Ok(())
    }

    /// Begin rendering: transition to `Activating` and start the renderer.
    /// Confirmation arrives asynchronously as a `Started` transition.
    pub fn activate(self: &Arc<Self>) {
        {
            let mut data = self.lock_data();
            if matches!(data.state, AlertState::Activating | AlertState::Active) {
                warn!(token = %self.token, state = %data.state, "activate ignored");
                return;
            }
            data.state = AlertState::Activating;
            data.stop_reason = None;
        }
        if let Some(renderer) = self.current_renderer() {
            renderer.start(Arc::clone(self) as Arc<dyn RendererObserver>);
        } else {
            warn!(token = %self.token, "activate with no renderer attached");
        }
    }

    /// Request deactivation for `reason`.  The renderer acknowledges with a
    /// stop, which is then reported as `Stopped` carrying the reason.
    pub fn deactivate(&self, reason: StopReason) {
        debug!(token = %self.token, reason = %reason, "deactivate");
        {
            let mut data = self.lock_data();
            data.state = AlertState::Stopping;
            data.stop_reason = Some(reason);
        }
        if let Some(renderer) = self.current_renderer() {
            renderer.stop();
        }
    }

    /// Snooze to a new scheduled time.  The renderer's stop acknowledgement
    /// is reported as `Snoozed`, at which point the scheduler reschedules.
    pub fn snooze(&self, new_time_iso8601: &str) -> bool {
        let unix = match parse_rfc3339(new_time_iso8601) {
            Ok(unix) => unix,
            Err(err) => {
                warn!(token = %self.token, error = %err, "snooze time rejected");
                return false;
            }
        };
        {
            let mut data = self.lock_data();
            data.scheduled_time_iso = new_time_iso8601.to_string();
            data.scheduled_time_unix = unix;
            data.state = AlertState::Snoozing;
            data.stop_reason = None;
        }
        if let Some(renderer) = self.current_renderer() {
            renderer.stop();
        }
        true
    }

    /// Reset to a clean scheduled state (used when recovering an alert that
    /// was active at shutdown).
    pub fn reset(&self) {
        let mut data = self.lock_data();
        data.state = AlertState::Idle;
        data.stop_reason = None;
    }

    /// Record the renderer's confirmation; only meaningful from
    /// `Activating`.
    pub fn set_state_active(&self) {
        self.lock_data().state = AlertState::Active;
    }

    /// Propagate the current focus grant.
    pub fn set_focus_state(&self, focus: FocusState) {
        self.lock_data().focus = focus;
    }

    /// Snapshot for context reporting.
    #[must_use]
    pub fn context_info(&self) -> AlertContext {
        let data = self.lock_data();
        AlertContext {
            token: self.token.clone(),
            type_name: self.type_name.clone(),
            scheduled_time_iso8601: data.scheduled_time_iso.clone(),
            scheduled_time_unix: data.scheduled_time_unix,
            state: data.state,
        }
    }

    fn current_renderer(&self) -> Option<Arc<dyn Renderer>> {
        self.renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn notify(&self, state: AlertLifecycleState, reason: &str) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(listener) = listener.and_then(|weak| weak.upgrade()) else {
            debug!(token = %self.token, state = %state, "transition with no listener attached");
            return;
        };
        listener.on_alert_state_change(
            LifecycleChange::new(self.token.clone(), self.type_name.clone(), state)
                .with_reason(reason),
        );
    }
}

impl RendererObserver for Alert {
    fn on_renderer_state_change(&self, event: RendererEvent, reason: &str) {
        let mapped = {
            let mut data = self.lock_data();
            match event {
                RendererEvent::Started => {
                    // Confirmation is only meaningful while activating; the
                    // scheduler performs the Activating -> Active move.
                    if data.state == AlertState::Activating {
                        Some((AlertLifecycleState::Started, reason.to_string()))
                    } else {
                        debug!(token = %self.token, state = %data.state, "spurious renderer start");
                        None
                    }
                }
                RendererEvent::Stopped => match data.state {
                    AlertState::Snoozing => {
                        data.state = AlertState::Idle;
                        Some((AlertLifecycleState::Snoozed, reason.to_string()))
                    }
                    _ => {
                        let reason = data
                            .stop_reason
                            .take()
                            .map_or_else(|| reason.to_string(), |r| r.as_str().to_string());
                        Some((AlertLifecycleState::Stopped, reason))
                    }
                },
                RendererEvent::Completed => {
                    data.state = AlertState::Completed;
                    Some((AlertLifecycleState::Completed, reason.to_string()))
                }
                RendererEvent::Error => Some((AlertLifecycleState::Error, reason.to_string())),
            }
        };

        if let Some((state, reason)) = mapped {
            self.notify(state, &reason);
        }
    }
}
