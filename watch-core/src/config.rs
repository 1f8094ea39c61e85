//! Timing configuration for watchers and expectation verification.

use serde::Deserialize;
use std::time::Duration;

/// Polling and window settings shared by every watcher in a suite.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchConfig {
    /// Interval between buffer scans in `verify` and `await` (default: 100ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Window applied to expectations that don't declare one (default: 2000ms).
    #[serde(default = "default_window_ms")]
    pub default_window_ms: u64,
    /// Pause before re-subscribing after a stream failure (default: 0, immediate).
    #[serde(default)]
    pub resubscribe_delay_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_window_ms() -> u64 {
    2000
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_window_ms: default_window_ms(),
            resubscribe_delay_ms: 0,
        }
    }
}

impl WatchConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Default expectation window as a [`Duration`].
    pub fn default_window(&self) -> Duration {
        Duration::from_millis(self.default_window_ms)
    }

    /// Re-subscription delay as a [`Duration`].
    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_delay_ms)
    }
}
