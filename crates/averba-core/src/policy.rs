//! Polling and retry policy.
//!
//! The cadence constants (15s initial delay, 6s steady interval, 20 attempt
//! ceiling, 3-attempt grace window, 30s resend cooldown) are product-tuned
//! reference values, not invariants. Everything here deserializes from
//! configuration so deployments can retune without a code change.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and retry policy for one authorization session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingPolicy {
    /// Delay before the first automatic status check. Longer than the steady
    /// interval so the user has realistic time to answer the out-of-band
    /// message.
    #[serde(default = "default_initial_delay")]
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Interval between subsequent automatic status checks.
    #[serde(default = "default_check_interval")]
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,

    /// Maximum number of status checks before the session resolves to a
    /// timeout error.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Attempt count at or below which ambiguous or failed gateway responses
    /// are treated as still-pending rather than final.
    #[serde(default = "default_grace_attempts")]
    pub grace_attempts: u32,

    /// Minimum time between consecutive code-request calls.
    #[serde(default = "default_resend_cooldown")]
    #[serde(with = "humantime_serde")]
    pub resend_cooldown: Duration,
}

const fn default_initial_delay() -> Duration {
    Duration::from_secs(15)
}

const fn default_check_interval() -> Duration {
    Duration::from_secs(6)
}

const fn default_max_attempts() -> u32 {
    20
}

const fn default_grace_attempts() -> u32 {
    3
}

const fn default_resend_cooldown() -> Duration {
    Duration::from_secs(30)
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            check_interval: default_check_interval(),
            max_attempts: default_max_attempts(),
            grace_attempts: default_grace_attempts(),
            resend_cooldown: default_resend_cooldown(),
        }
    }
}

impl PollingPolicy {
    /// Returns the delay the scheduler should wait before the given attempt
    /// number (1-based).
    #[must_use]
    pub const fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.initial_delay
        } else {
            self.check_interval
        }
    }

    /// Sets the attempt ceiling.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the grace window.
    #[must_use]
    pub const fn with_grace_attempts(mut self, grace_attempts: u32) -> Self {
        self.grace_attempts = grace_attempts;
        self
    }

    /// Sets the resend cooldown.
    #[must_use]
    pub const fn with_resend_cooldown(mut self, cooldown: Duration) -> Self {
        self.resend_cooldown = cooldown;
        self
    }
}

pub(crate) mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
