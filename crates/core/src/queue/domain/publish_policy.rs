use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the delay between publish attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles after every failed attempt.
    Exponential,
}

/// What happens once every publish attempt has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExhausted {
    /// Drop the update silently; the task keeps running.
    Drop,
    /// Return the last storage error to the caller.
    Propagate,
}

/// Retry policy for replace-in-place writes (progress records).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub backoff: Backoff,
    pub on_exhausted: OnExhausted,
}

impl PublishPolicy {
    /// Delay to wait after `attempt` (0-based) failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = self.delay_ms;
        let ms = match self.backoff {
            Backoff::Fixed => base,
            Backoff::Exponential => base.saturating_mul(1u64 << attempt.min(16)),
        };
        Duration::from_millis(ms)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 200,
            backoff: Backoff::Fixed,
            on_exhausted: OnExhausted::Drop,
        }
    }
}
