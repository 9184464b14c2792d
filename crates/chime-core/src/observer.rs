//! Outbound lifecycle notifications and the internal state-change seam.
//!
//! The scheduler reports every alert transition to exactly one
//! [`AlertObserver`] (the upstream consumer).  Alerts and the renderer feed
//! transitions back into the scheduler through [`AlertStateListener`]; both
//! directions carry the same [`LifecycleChange`] payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle states reported to the observer.
///
/// `PastDue`, `FocusEnteredForeground`, `FocusEnteredBackground`, and
/// `Deleted` are generated by the scheduler itself; an alert never sources
/// them (see [`AlertLifecycleState::is_scheduler_generated`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLifecycleState {
    /// The alert's scheduled time has arrived; awaiting focus.
    Ready,
    /// The renderer confirmed it has begun rendering.
    Started,
    /// Rendering stopped on request.
    Stopped,
    /// Rendering ran to natural completion.
    Completed,
    /// The alert was snoozed and rescheduled.
    Snoozed,
    /// The alert was discovered too far past its scheduled time.
    PastDue,
    /// Audio focus moved to the foreground while the alert was active.
    FocusEnteredForeground,
    /// Audio focus moved to the background while the alert was active.
    FocusEnteredBackground,
    /// The alert was deleted.
    Deleted,
    /// The renderer reported a failure for this alert.
    Error,
}

impl AlertLifecycleState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Snoozed => "snoozed",
            Self::PastDue => "past_due",
            Self::FocusEnteredForeground => "focus_entered_foreground",
            Self::FocusEnteredBackground => "focus_entered_background",
            Self::Deleted => "deleted",
            Self::Error => "error",
        }
    }

    /// True for states only the scheduler may emit.  If one of these
    /// arrives on the inbound callback path it is ignored.
    #[must_use]
    pub fn is_scheduler_generated(&self) -> bool {
        matches!(
            self,
            Self::PastDue
                | Self::FocusEnteredForeground
                | Self::FocusEnteredBackground
                | Self::Deleted
        )
    }
}

impl fmt::Display for AlertLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertLifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "started" => Ok(Self::Started),
            "stopped" => Ok(Self::Stopped),
            "completed" => Ok(Self::Completed),
            "snoozed" => Ok(Self::Snoozed),
            "past_due" => Ok(Self::PastDue),
            "focus_entered_foreground" => Ok(Self::FocusEnteredForeground),
            "focus_entered_background" => Ok(Self::FocusEnteredBackground),
            "deleted" => Ok(Self::Deleted),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown lifecycle state: {other}")),
        }
    }
}

/// A single lifecycle transition for one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleChange {
    /// Token of the alert the transition belongs to.
    pub token: String,
    /// Alert category ("alarm", "timer", "reminder", ...).
    pub type_name: String,
    /// The transition itself.
    pub state: AlertLifecycleState,
    /// Free-form reason, e.g. the stop reason or a renderer error message.
    pub reason: String,
}

impl LifecycleChange {
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        type_name: impl Into<String>,
        state: AlertLifecycleState,
    ) -> Self {
        Self {
            token: token.into(),
            type_name: type_name.into(),
            state,
            reason: String::new(),
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// Upstream consumer of alert lifecycle transitions.
///
/// Notifications are delivered on the scheduler's executor thread, in the
/// order the scheduler decided to emit them, and never while the scheduler
/// mutex is held.
pub trait AlertObserver: Send + Sync {
    fn on_alert_state_change(&self, change: LifecycleChange);
}

/// Inbound seam for transitions sourced by alerts and the renderer.
///
/// Implemented by the scheduler; safe to invoke from any thread, including
/// re-entrantly from inside `Renderer::start`.
pub trait AlertStateListener: Send + Sync {
    fn on_alert_state_change(&self, change: LifecycleChange);
}
