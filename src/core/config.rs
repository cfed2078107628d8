//! # Lifecycle configuration.
//!
//! Provides [`Config`] — settings for one [`Lifecycle`](crate::Lifecycle).
//!
//! ## Sentinel values
//! - `straggler_interval = 0s` → never report runners still pending during shutdown

use std::time::Duration;

/// Configuration for the lifecycle coordinator.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `straggler_interval`: how often shutdown logs runners it is still waiting for (`0s` = never)
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Interval between "still waiting for runners" reports during shutdown.
    ///
    /// Shutdown never gives up on a runner; this only makes a hung runner visible.
    pub straggler_interval: Duration,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the straggler report interval as an `Option`.
    ///
    /// - `None` → reporting disabled
    /// - `Some(d)` → report every `d` while runners are outstanding
    #[inline]
    pub fn straggler_report(&self) -> Option<Duration> {
        if self.straggler_interval == Duration::ZERO {
            None
        } else {
            Some(self.straggler_interval)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `straggler_interval = 30s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            straggler_interval: Duration::from_secs(30),
        }
    }
}
