//! Persistent single-active alert scheduling engine.
//!
//! ```text
//! callers ──► AlertScheduler ──► AlertStorage (SQLite)
//!                 │  ▲
//!                 │  └── on_alert_state_change ◄── Alert ◄── Renderer
//!                 ├──► DelayTimer ──► ready signal
//!                 └──► Executor ──► AlertObserver
//! ```
//!
//! One mutex guards the scheduled set, the active slot, the focus state,
//! and timer arming.  Callbacks from the renderer and timer threads are
//! re-queued onto a single-worker executor before touching that state, so
//! handling is serialized with public mutators and observer notifications
//! come out in a deterministic order.
//!
//! The engine keeps exactly one alert active.  When idle, the earliest
//! scheduled alert drives the delay timer; when the timer fires the
//! observer hears `Ready`, arbitrates audio focus, and hands the grant
//! back through [`AlertScheduler::update_focus`], which promotes the alert
//! into the active slot and starts the renderer.  Deactivation is
//! asynchronous: the `Stopped`/`Completed` callback is the sole authority
//! that clears the active slot.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::alert::{Alert, AlertContext, AlertState, FocusState, StopReason};
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::executor::Executor;
use crate::observer::{AlertLifecycleState, AlertObserver, AlertStateListener, LifecycleChange};
use crate::renderer::Renderer;
use crate::storage::{AlertStorage, StoredAlert};
use crate::timer::DelayTimer;

/// Ordering key for the scheduled set: earliest time first, token as the
/// deterministic tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ScheduleKey {
    scheduled_time_unix: i64,
    token: String,
}

impl ScheduleKey {
    fn for_alert(alert: &Alert) -> Self {
        Self {
            scheduled_time_unix: alert.scheduled_time_unix(),
            token: alert.token().to_string(),
        }
    }
}

/// Context snapshot reported upstream.  The active alert is still
/// "scheduled" conceptually, so it appears in both lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertsContextInfo {
    pub scheduled_alerts: Vec<AlertContext>,
    pub active_alerts: Vec<AlertContext>,
}

struct SchedulerState {
    scheduled: BTreeMap<ScheduleKey, Arc<Alert>>,
    active: Option<Arc<Alert>>,
    focus: FocusState,
}

impl SchedulerState {
    fn alert_for_token(&self, token: &str) -> Option<Arc<Alert>> {
        // Linear scan; the fleet stays well under a hundred alerts.
        self.scheduled
            .values()
            .find(|alert| alert.token() == token)
            .cloned()
    }

    fn active_matches(&self, token: &str) -> bool {
        self.active
            .as_ref()
            .is_some_and(|alert| alert.token() == token)
    }
}

struct SchedulerInner {
    storage: Arc<dyn AlertStorage>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    past_due_limit: Duration,
    state: Mutex<SchedulerState>,
    observer: Mutex<Option<Arc<dyn AlertObserver>>>,
    executor: Executor,
    timer: DelayTimer,
    stopped: AtomicBool,
    self_ref: Weak<SchedulerInner>,
}

/// The alert scheduling engine.
pub struct AlertScheduler {
    inner: Arc<SchedulerInner>,
}

impl AlertScheduler {
    #[must_use]
    pub fn new(
        storage: Arc<dyn AlertStorage>,
        renderer: Arc<dyn Renderer>,
        clock: Arc<dyn Clock>,
        config: &SchedulerConfig,
    ) -> Self {
        let inner = Arc::new_cyclic(|self_ref| SchedulerInner {
            storage,
            renderer,
            clock,
            past_due_limit: config.past_due_limit(),
            state: Mutex::new(SchedulerState {
                scheduled: BTreeMap::new(),
                active: None,
                focus: FocusState::None,
            }),
            observer: Mutex::new(None),
            executor: Executor::new(),
            timer: DelayTimer::new(),
            stopped: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        });
        Self { inner }
    }

    /// Register the observer, reconcile persisted alerts against the
    /// clock, and arm the timer for the next alert.
    pub fn initialize(&self, observer: Arc<dyn AlertObserver>) -> bool {
        self.inner.initialize(observer)
    }

    /// Schedule a new alert, or move an existing one (same token) to the
    /// incoming scheduled time.
    pub fn schedule_alert(&self, alert: Arc<Alert>) -> bool {
        self.inner.schedule_alert(alert)
    }

    /// Snooze the active alert to a new time.  Fails unless `token` names
    /// the active alert.
    pub fn snooze_alert(&self, token: &str, new_time_iso8601: &str) -> bool {
        self.inner.snooze_alert(token, new_time_iso8601)
    }

    /// Delete one alert.  Deleting an unknown token succeeds.
    pub fn delete_alert(&self, token: &str) -> bool {
        self.inner.delete_alert(token)
    }

    /// Delete a batch of alerts atomically.
    pub fn delete_alerts(&self, tokens: &[String]) -> bool {
        self.inner.delete_alerts(tokens)
    }

    /// Apply an audio-focus decision.
    pub fn update_focus(&self, focus: FocusState) {
        self.inner.update_focus(focus);
    }

    /// Stop the active alert on behalf of the device user.
    pub fn on_local_stop(&self) {
        self.inner.on_local_stop();
    }

    /// Delete every alert and clear storage.
    pub fn clear_data(&self, reason: StopReason) {
        self.inner.clear_data(reason);
    }

    /// Snapshot of scheduled and active alert contexts.
    #[must_use]
    pub fn context_info(&self) -> AlertsContextInfo {
        self.inner.context_info()
    }

    /// True iff `alert` is the active alert and is activating or active.
    #[must_use]
    pub fn is_alert_active(&self, alert: &Alert) -> bool {
        self.inner.is_alert_active(alert)
    }

    /// Snapshot of all owned alerts (scheduled plus active).
    #[must_use]
    pub fn all_alerts(&self) -> Vec<Arc<Alert>> {
        self.inner.all_alerts()
    }

    /// Current focus state.
    #[must_use]
    pub fn focus_state(&self) -> FocusState {
        self.inner.lock_state().focus
    }

    /// True while a delay-timer shot is armed for the next alert.
    #[must_use]
    pub fn is_timer_armed(&self) -> bool {
        self.inner.timer.is_active()
    }

    /// Inbound lifecycle callback (also reachable through the
    /// [`AlertStateListener`] seam handed to alerts).
    pub fn on_alert_state_change(&self, change: LifecycleChange) {
        AlertStateListener::on_alert_state_change(&*self.inner, change);
    }

    /// Drain callbacks, cancel the timer, and drop the observer and all
    /// alerts.  No observer notification fires after this returns.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl SchedulerInner {
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener(&self) -> Weak<dyn AlertStateListener> {
        self.self_ref.clone()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Public operation bodies
    // =========================================================================

    fn initialize(&self, observer: Arc<dyn AlertObserver>) -> bool {
        if self.is_stopped() {
            error!("initialize after shutdown");
            return false;
        }
        *self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);

        if let Err(open_err) = self.storage.open() {
            info!(error = %open_err, "could not open alert database; creating");
            if let Err(create_err) = self.storage.create_database() {
                error!(error = %create_err, "could not create alert database");
                return false;
            }
        }

        let now = match self.clock.now_unix() {
            Ok(now) => now,
            Err(err) => {
                error!(error = %err, "could not read current time");
                return false;
            }
        };

        let persisted = match self.storage.load() {
            Ok(rows) => rows,
            Err(err) => {
                error!(error = %err, "could not load persisted alerts");
                Vec::new()
            }
        };

        {
            let mut state = self.lock_state();
            for row in persisted {
                let was_active = row.state == AlertState::Active;
                let alert = Arc::new(Alert::from_parts(
                    row.token,
                    row.type_name,
                    row.scheduled_time_iso8601,
                    row.scheduled_time_unix,
                    row.state,
                ));

                if alert.is_past_due(now, self.past_due_limit) {
                    info!(token = %alert.token(), "dropping past-due alert found at startup");
                    self.notify_observer(LifecycleChange::new(
                        alert.token(),
                        alert.type_name(),
                        AlertLifecycleState::PastDue,
                    ));
                    self.erase_alert(&alert);
                    continue;
                }

                // Active when the system last powered down: back to a clean
                // scheduled state so it can fire again.
                if was_active {
                    alert.reset();
                    if let Err(err) = self.storage.modify(&StoredAlert::from(&*alert)) {
                        warn!(token = %alert.token(), error = %err, "could not persist reset state");
                    }
                }

                alert.attach(Arc::clone(&self.renderer), self.listener());
                state.scheduled.insert(ScheduleKey::for_alert(&alert), alert);
            }
        }

        self.set_timer_for_next_alert();
        true
    }

    fn schedule_alert(&self, alert: Arc<Alert>) -> bool {
        debug!(token = %alert.token(), "schedule alert");
        if self.is_stopped() {
            error!(token = %alert.token(), "schedule after shutdown");
            return false;
        }
        let now = match self.clock.now_unix() {
            Ok(now) => now,
            Err(err) => {
                error!(error = %err, "could not read current time");
                return false;
            }
        };

        let mut state = self.lock_state();

        if alert.is_past_due(now, self.past_due_limit) {
            error!(token = %alert.token(), "alert is past due; rejecting");
            return false;
        }

        if let Some(existing) = state.alert_for_token(alert.token()) {
            debug!(token = %alert.token(), "token already scheduled; updating its time");
            return self.update_alert_locked(&mut state, &existing, &alert.scheduled_time_iso8601());
        }

        if let Err(err) = self.storage.store(&StoredAlert::from(&*alert)) {
            error!(token = %alert.token(), error = %err, "could not store alert");
            return false;
        }

        alert.attach(Arc::clone(&self.renderer), self.listener());
        state
            .scheduled
            .insert(ScheduleKey::for_alert(&alert), Arc::clone(&alert));

        if state.active.is_none() {
            self.set_timer_for_next_alert_locked(&state);
        }
        true
    }

    /// Move an already-scheduled alert to a new time, atomically on
    /// failure.  The alert is removed first so the re-insert picks up the
    /// new ordering key; re-insert and timer re-arm happen on every exit
    /// path, success or failure.
    fn update_alert_locked(
        &self,
        state: &mut SchedulerState,
        alert: &Arc<Alert>,
        new_time_iso8601: &str,
    ) -> bool {
        state.scheduled.remove(&ScheduleKey::for_alert(alert));

        let updated = self.apply_schedule_update(alert, new_time_iso8601);

        state
            .scheduled
            .insert(ScheduleKey::for_alert(alert), Arc::clone(alert));
        if state.active.is_none() {
            self.set_timer_for_next_alert_locked(state);
        }
        updated
    }

    fn apply_schedule_update(&self, alert: &Arc<Alert>, new_time_iso8601: &str) -> bool {
        let previous = alert.scheduled_time_iso8601();

        if let Err(err) = alert.update_scheduled_time(new_time_iso8601) {
            error!(token = %alert.token(), error = %err, "could not update scheduled time");
            return false;
        }

        if let Err(err) = self.storage.modify(&StoredAlert::from(&**alert)) {
            error!(token = %alert.token(), error = %err, "could not persist new time; reverting");
            if let Err(revert_err) = alert.update_scheduled_time(&previous) {
                // The previous value parsed once already.
                error!(token = %alert.token(), error = %revert_err, "could not revert time");
            }
            return false;
        }

        true
    }

    fn snooze_alert(&self, token: &str, new_time_iso8601: &str) -> bool {
        if self.is_stopped() {
            return false;
        }
        let state = self.lock_state();
        let Some(active) = state.active.as_ref() else {
            error!(token, "snooze failed; no active alert");
            return false;
        };
        if active.token() != token {
            error!(token, active = %active.token(), "snooze failed; alert is not active");
            return false;
        }
        active.snooze(new_time_iso8601)
    }

    fn delete_alert(&self, token: &str) -> bool {
        debug!(token, "delete alert");
        if self.is_stopped() {
            return false;
        }
        let mut state = self.lock_state();

        if state.active_matches(token) {
            // Asynchronous: removal completes when the renderer reports the
            // stop.
            self.deactivate_active_locked(&state, StopReason::RemoteStop);
            return true;
        }

        let Some(alert) = state.alert_for_token(token) else {
            warn!(token, "alert does not exist; treating delete as done");
            return true;
        };

        self.erase_alert(&alert);
        state.scheduled.remove(&ScheduleKey::for_alert(&alert));
        self.set_timer_for_next_alert_locked(&state);
        true
    }

    fn delete_alerts(&self, tokens: &[String]) -> bool {
        debug!(count = tokens.len(), "bulk delete");
        if self.is_stopped() {
            return false;
        }
        let mut state = self.lock_state();

        let mut delete_active = false;
        let mut targets: Vec<Arc<Alert>> = Vec::new();

        for token in tokens {
            if let Some(active) = state.active.as_ref().filter(|a| a.token() == token) {
                delete_active = true;
                targets.push(Arc::clone(active));
                continue;
            }
            match state.alert_for_token(token) {
                Some(alert) => targets.push(alert),
                None => warn!(token = %token, "alert is missing; skipping"),
            }
        }

        let erase_tokens: Vec<String> = targets
            .iter()
            .map(|alert| alert.token().to_string())
            .collect();
        if let Err(err) = self.storage.bulk_erase(&erase_tokens) {
            error!(error = %err, "could not erase alerts from database");
            return false;
        }

        if delete_active {
            self.deactivate_active_locked(&state, StopReason::RemoteStop);
            state.active = None;
        }

        for alert in &targets {
            state.scheduled.remove(&ScheduleKey::for_alert(alert));
            self.notify_observer(LifecycleChange::new(
                alert.token(),
                alert.type_name(),
                AlertLifecycleState::Deleted,
            ));
        }

        self.set_timer_for_next_alert_locked(&state);
        true
    }

    fn update_focus(&self, focus: FocusState) {
        debug!(focus = %focus, "update focus");
        if self.is_stopped() {
            return;
        }
        let mut state = self.lock_state();

        if state.focus == focus {
            return;
        }
        state.focus = focus;

        match focus {
            FocusState::Foreground | FocusState::Background => {
                let entered = if focus == FocusState::Foreground {
                    AlertLifecycleState::FocusEnteredForeground
                } else {
                    AlertLifecycleState::FocusEnteredBackground
                };
                if let Some(active) = state.active.as_ref() {
                    active.set_focus_state(focus);
                    self.notify_observer(LifecycleChange::new(
                        active.token(),
                        active.type_name(),
                        entered,
                    ));
                } else {
                    self.activate_next_alert_locked(&mut state);
                }
            }
            FocusState::None => {
                // Timer re-arm happens when the stop is acknowledged.
                self.deactivate_active_locked(&state, StopReason::LocalStop);
            }
        }
    }

    fn on_local_stop(&self) {
        debug!("local stop");
        if self.is_stopped() {
            return;
        }
        let state = self.lock_state();
        self.deactivate_active_locked(&state, StopReason::LocalStop);
    }

    fn clear_data(&self, reason: StopReason) {
        debug!(reason = %reason, "clear data");
        if self.is_stopped() {
            return;
        }
        let mut state = self.lock_state();

        self.deactivate_active_locked(&state, reason);
        self.timer.stop();

        for alert in state.scheduled.values() {
            self.notify_observer(LifecycleChange::new(
                alert.token(),
                alert.type_name(),
                AlertLifecycleState::Deleted,
            ));
        }
        state.scheduled.clear();

        if let Err(err) = self.storage.clear_database() {
            error!(error = %err, "could not clear alert database");
        }
    }

    fn context_info(&self) -> AlertsContextInfo {
        let state = self.lock_state();
        let mut info = AlertsContextInfo::default();
        for alert in state.scheduled.values() {
            info.scheduled_alerts.push(alert.context_info());
        }
        if let Some(active) = state.active.as_ref() {
            info.scheduled_alerts.push(active.context_info());
            info.active_alerts.push(active.context_info());
        }
        info
    }

    fn is_alert_active(&self, alert: &Alert) -> bool {
        let state = self.lock_state();
        let Some(active) = state.active.as_ref() else {
            return false;
        };
        if active.token() != alert.token() {
            return false;
        }
        matches!(
            active.state(),
            AlertState::Activating | AlertState::Active
        )
    }

    fn all_alerts(&self) -> Vec<Arc<Alert>> {
        let state = self.lock_state();
        let mut alerts: Vec<Arc<Alert>> = state.scheduled.values().cloned().collect();
        if let Some(active) = state.active.as_ref() {
            alerts.push(Arc::clone(active));
        }
        alerts
    }

    fn shutdown(&self) {
        info!("alert scheduler shutting down");
        self.stopped.store(true, Ordering::SeqCst);

        // Drain callbacks before tearing down so no task observes a
        // half-dismantled engine; the executor drops anything submitted
        // afterwards.
        self.executor.shutdown();
        self.timer.stop();

        *self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;

        let mut state = self.lock_state();
        state.active = None;
        state.scheduled.clear();
    }

    // =========================================================================
    // Callback handling
    // =========================================================================

    fn execute_on_alert_state_change(&self, change: LifecycleChange) {
        let mut state = self.lock_state();

        match change.state {
            AlertLifecycleState::Ready => {
                self.notify_observer(change);
            }

            AlertLifecycleState::Started => {
                if let Some(active) = state
                    .active
                    .as_ref()
                    .filter(|a| a.state() == AlertState::Activating)
                {
                    active.set_state_active();
                    if let Err(err) = self.storage.modify(&StoredAlert::from(&**active)) {
                        warn!(token = %active.token(), error = %err, "could not persist active state");
                    }
                    self.notify_observer(change);
                }
            }

            AlertLifecycleState::Stopped | AlertLifecycleState::Completed => {
                self.notify_observer(change.clone());
                match state.active.take() {
                    Some(active) => self.erase_alert(&active),
                    None => warn!(token = %change.token, "stop reported with no active alert"),
                }
                self.set_timer_for_next_alert_locked(&state);
            }

            AlertLifecycleState::Snoozed => {
                if let Some(active) = state.active.take() {
                    if let Err(err) = self.storage.modify(&StoredAlert::from(&*active)) {
                        warn!(token = %active.token(), error = %err, "could not persist snoozed time");
                    }
                    state
                        .scheduled
                        .insert(ScheduleKey::for_alert(&active), active);
                }
                self.notify_observer(change);
                self.set_timer_for_next_alert_locked(&state);
            }

            AlertLifecycleState::Error => {
                // Clear out the failing alert so it cannot misbehave again.
                if state.active_matches(&change.token) {
                    if let Some(active) = state.active.take() {
                        self.erase_alert(&active);
                    }
                    self.set_timer_for_next_alert_locked(&state);
                } else if let Some(alert) = state.alert_for_token(&change.token) {
                    self.erase_alert(&alert);
                    state.scheduled.remove(&ScheduleKey::for_alert(&alert));
                    self.set_timer_for_next_alert_locked(&state);
                }
                self.notify_observer(change);
            }

            // Scheduler-generated states; an alert never sources these.
            AlertLifecycleState::PastDue
            | AlertLifecycleState::FocusEnteredForeground
            | AlertLifecycleState::FocusEnteredBackground
            | AlertLifecycleState::Deleted => {
                debug!(state = %change.state, "ignoring scheduler-generated state on callback path");
            }
        }
    }

    // =========================================================================
    // Helpers (scheduler mutex held unless noted)
    // =========================================================================

    /// Queue an observer notification on the executor.  Safe to call with
    /// the scheduler mutex held; the observer runs without it.
    fn notify_observer(&self, change: LifecycleChange) {
        debug!(
            token = %change.token,
            state = %change.state,
            reason = %change.reason,
            "notify observer"
        );
        let observer = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(observer) = observer else {
            debug!(token = %change.token, "no observer registered; notification dropped");
            return;
        };
        self.executor
            .submit(move || observer.on_alert_state_change(change));
    }

    fn deactivate_active_locked(&self, state: &SchedulerState, reason: StopReason) {
        if let Some(active) = state.active.as_ref() {
            active.deactivate(reason);
        }
    }

    /// Erase from storage; only a successful erase produces a `Deleted`
    /// notification.
    fn erase_alert(&self, alert: &Arc<Alert>) {
        if let Err(err) = self.storage.erase(alert.token()) {
            error!(token = %alert.token(), error = %err, "could not erase alert from database");
            return;
        }
        self.notify_observer(LifecycleChange::new(
            alert.token(),
            alert.type_name(),
            AlertLifecycleState::Deleted,
        ));
    }

    fn set_timer_for_next_alert(&self) {
        let state = self.lock_state();
        self.set_timer_for_next_alert_locked(&state);
    }

    fn set_timer_for_next_alert_locked(&self, state: &SchedulerState) {
        self.timer.stop();

        if state.active.is_some() {
            debug!("an alert is active; leaving the timer idle");
            return;
        }

        let Some(next) = state.scheduled.values().next() else {
            debug!("no scheduled alerts; leaving the timer idle");
            return;
        };

        let now = match self.clock.now_unix() {
            Ok(now) => now,
            Err(err) => {
                error!(error = %err, "could not read current time; timer not armed");
                return;
            }
        };

        let delay = next.scheduled_time_unix().saturating_sub(now).max(0);
        let token = next.token().to_string();
        let type_name = next.type_name().to_string();

        if delay == 0 {
            self.notify_observer(LifecycleChange::new(
                token,
                type_name,
                AlertLifecycleState::Ready,
            ));
        } else {
            let weak = self.self_ref.clone();
            self.timer.start(Duration::from_secs(delay as u64), move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_alert_ready(&token, &type_name);
                }
            });
        }
    }

    /// Runs on the timer thread, without the scheduler mutex.
    fn on_alert_ready(&self, token: &str, type_name: &str) {
        debug!(token, type_name, "alert ready");
        self.notify_observer(LifecycleChange::new(
            token,
            type_name,
            AlertLifecycleState::Ready,
        ));
    }

    fn activate_next_alert_locked(&self, state: &mut SchedulerState) {
        if state.active.is_some() {
            error!("an alert is already active; not activating another");
            return;
        }
        let Some((_, alert)) = state.scheduled.pop_first() else {
            return;
        };

        debug!(token = %alert.token(), "activating next alert");
        self.timer.stop();
        alert.set_focus_state(state.focus);
        state.active = Some(Arc::clone(&alert));
        alert.activate();
    }
}

impl AlertStateListener for SchedulerInner {
    fn on_alert_state_change(&self, change: LifecycleChange) {
        debug!(
            token = %change.token,
            state = %change.state,
            reason = %change.reason,
            "alert state change"
        );
        let Some(inner) = self.self_ref.upgrade() else {
            return;
        };
        self.executor
            .submit(move || inner.execute_on_alert_state_change(change));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(unix: i64, token: &str) -> ScheduleKey {
        ScheduleKey {
            scheduled_time_unix: unix,
            token: token.to_string(),
        }
    }

    #[test]
    fn schedule_key_orders_by_time_then_token() {
        let mut keys = vec![key(200, "a"), key(100, "z"), key(100, "a"), key(300, "m")];
        keys.sort();
        let tokens: Vec<&str> = keys.iter().map(|k| k.token.as_str()).collect();
        assert_eq!(tokens, ["a", "z", "a", "m"]);
        assert_eq!(keys[0].scheduled_time_unix, 100);
        assert_eq!(keys[3].scheduled_time_unix, 300);
    }

    #[test]
    fn schedule_key_for_alert_matches_fields() {
        let alert = Alert::new("tok-1", "alarm", "1970-01-01T00:05:00Z").unwrap();
        let key = ScheduleKey::for_alert(&alert);
        assert_eq!(key.scheduled_time_unix, 300);
        assert_eq!(key.token, "tok-1");
    }

    #[test]
    fn context_info_serializes() {
        let info = AlertsContextInfo::default();
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("scheduled_alerts"));
        assert!(json.contains("active_alerts"));
    }
}
