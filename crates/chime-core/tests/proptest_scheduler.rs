//! Property-based tests for scheduler invariants.
//!
//! Verifies, across generated token/time fleets:
//! - no token ever appears twice across scheduled + active
//! - at most one alert is active, no matter how many are due
//! - schedule of an existing token keeps one alert with the newest time
//! - timer/ready discipline: after any schedule batch, either the set is
//!   empty, an alert is active, or a timer is armed / READY was emitted
//! - delete is idempotent with at most one DELETED per token

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use chime_core::alert::{Alert, AlertState, FocusState};
use chime_core::observer::AlertLifecycleState;

use common::{iso, Harness};

const NOW: i64 = 100_000;

fn alert_at(token: &str, unix: i64) -> Arc<Alert> {
    Arc::new(Alert::new(token, "alarm", &iso(unix)).unwrap())
}

// ────────────────────────────────────────────────────────────────────
// Strategies
// ────────────────────────────────────────────────────────────────────

/// Unique tokens, 1..6 of them.
fn arb_tokens() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{3,8}", 1..6)
        .prop_map(|set| set.into_iter().collect())
}

/// Future offsets from NOW, one per alert.
fn arb_offsets(len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..=50_000, len)
}

// ────────────────────────────────────────────────────────────────────
// Uniqueness and single-active
// ────────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Scheduling a unique-token fleet keeps every token exactly once,
    /// and the timer/ready discipline holds.
    #[test]
    fn prop_fleet_tokens_unique(tokens in arb_tokens()) {
        let h = Harness::new(NOW);
        h.init();

        for (i, token) in tokens.iter().enumerate() {
            prop_assert!(h.scheduler.schedule_alert(alert_at(token, NOW + 10 + i as i64)));
        }

        let alerts = h.scheduler.all_alerts();
        prop_assert_eq!(alerts.len(), tokens.len());

        let unique: BTreeSet<&str> = alerts.iter().map(|a| a.token()).collect();
        prop_assert_eq!(unique.len(), tokens.len());

        // Nothing is active, alerts exist, so the timer must be armed.
        prop_assert!(h.scheduler.is_timer_armed());
        h.scheduler.shutdown();
    }

    /// However many alerts are due at once, a focus grant activates
    /// exactly one.
    #[test]
    fn prop_at_most_one_active(tokens in arb_tokens()) {
        let h = Harness::new(NOW);
        h.init();

        // All due immediately.
        for token in &tokens {
            prop_assert!(h.scheduler.schedule_alert(alert_at(token, NOW)));
        }

        h.scheduler.update_focus(FocusState::Foreground);

        let info = h.scheduler.context_info();
        prop_assert_eq!(info.active_alerts.len(), 1);

        let activating = h
            .scheduler
            .all_alerts()
            .iter()
            .filter(|a| matches!(a.state(), AlertState::Activating | AlertState::Active))
            .count();
        prop_assert_eq!(activating, 1);

        // The active alert is the earliest by (time, token): equal times,
        // so the lexicographically smallest token wins.
        let earliest = tokens.iter().min().unwrap();
        prop_assert_eq!(&info.active_alerts[0].token, earliest);
        h.scheduler.shutdown();
    }

    /// Re-scheduling the same token any number of times leaves one alert
    /// carrying the last time.
    #[test]
    fn prop_reschedule_keeps_last_time(offsets in arb_offsets(4)) {
        let h = Harness::new(NOW);
        h.init();

        for offset in &offsets {
            prop_assert!(h.scheduler.schedule_alert(alert_at("tok", NOW + offset)));
        }

        let alerts = h.scheduler.all_alerts();
        prop_assert_eq!(alerts.len(), 1);
        prop_assert_eq!(
            alerts[0].scheduled_time_unix(),
            NOW + offsets.last().unwrap()
        );
        prop_assert_eq!(h.persisted().len(), 1);
        prop_assert_eq!(
            h.persisted()[0].scheduled_time_unix,
            NOW + offsets.last().unwrap()
        );
        // Re-arm is idempotent: one armed timer after the whole batch.
        prop_assert!(h.scheduler.is_timer_armed());
        h.scheduler.shutdown();
    }

    /// Deleting twice always reports success, with at most one DELETED
    /// notification per token.
    #[test]
    fn prop_delete_idempotent(tokens in arb_tokens()) {
        let h = Harness::new(NOW);
        h.init();

        for (i, token) in tokens.iter().enumerate() {
            prop_assert!(h.scheduler.schedule_alert(alert_at(token, NOW + 10 + i as i64)));
        }

        for token in &tokens {
            prop_assert!(h.scheduler.delete_alert(token));
            prop_assert!(h.scheduler.delete_alert(token));
        }

        prop_assert!(h.scheduler.all_alerts().is_empty());
        prop_assert!(h.persisted().is_empty());

        // Wait for the notifications to drain, then check counts.
        let expected = tokens.len();
        let deleted_count_reached = |changes: &[chime_core::observer::LifecycleChange]| {
            changes
                .iter()
                .filter(|c| c.state == AlertLifecycleState::Deleted)
                .count()
                >= expected
        };
        prop_assert!(h.observer.wait_until(Duration::from_secs(5), deleted_count_reached));
        for token in &tokens {
            prop_assert_eq!(
                h.observer.count_for(token, AlertLifecycleState::Deleted),
                1
            );
        }
        h.scheduler.shutdown();
    }

    /// After any schedule batch: empty set, active alert, or armed
    /// timer / READY emitted for the earliest alert.
    #[test]
    fn prop_timer_or_ready_after_mutation(
        tokens in arb_tokens(),
        due_now in prop::bool::ANY,
    ) {
        let h = Harness::new(NOW);
        h.init();

        let when = if due_now { NOW } else { NOW + 500 };
        for token in &tokens {
            prop_assert!(h.scheduler.schedule_alert(alert_at(token, when)));
        }

        if due_now {
            // READY must have been emitted for the earliest alert.
            let earliest = tokens.iter().min().unwrap();
            prop_assert!(h.observer.wait_for(earliest, AlertLifecycleState::Ready));
            prop_assert!(!h.scheduler.is_timer_armed());
        } else {
            prop_assert!(h.scheduler.is_timer_armed());
        }
        h.scheduler.shutdown();
    }
}
