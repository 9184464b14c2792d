//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Behavior knobs for the alert scheduler.
///
/// ```toml
/// [scheduler]
/// past_due_limit_secs = 1800
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// An alert whose scheduled time is more than this many seconds in the
    /// past is dropped as past-due instead of firing late.
    pub past_due_limit_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            past_due_limit_secs: 1800, // 30 m
        }
    }
}

impl SchedulerConfig {
    /// The past-due tolerance as a `Duration`.
    #[must_use]
    pub fn past_due_limit(&self) -> Duration {
        Duration::from_secs(self.past_due_limit_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tolerance_is_thirty_minutes() {
        let config = SchedulerConfig::default();
        assert_eq!(config.past_due_limit(), Duration::from_secs(1800));
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let config: SchedulerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.past_due_limit_secs, 1800);
    }

    #[test]
    fn serde_roundtrip() {
        let config = SchedulerConfig {
            past_due_limit_secs: 60,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SchedulerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.past_due_limit_secs, 60);
    }
}
