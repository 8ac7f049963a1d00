//! # Connectivity Monitor
//!
//! Tracks link state and bounds how often reconnection is attempted. However
//! often [`ConnectivityMonitor::poll`] is called, a down link is retried at
//! most once per reconnect interval. The attempt time is stamped whether or
//! not the attempt succeeds.

use std::time::Duration;

use tracing::{debug, info};

use super::link::{Link, LinkState};
use crate::clock::Clock;

/// Result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: LinkState,
    /// True when this poll brought the link from down to up
    pub reconnected: bool,
}

impl LinkStatus {
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.state == LinkState::Up
    }
}

/// Rate-limited link supervisor
pub struct ConnectivityMonitor {
    link: Box<dyn Link>,
    clock: Box<dyn Clock>,
    reconnect_interval_ms: u64,
    last_attempt_ms: Option<u64>,
    reconnect_attempts: u64,
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("reconnect_interval_ms", &self.reconnect_interval_ms)
            .field("last_attempt_ms", &self.last_attempt_ms)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .finish_non_exhaustive()
    }
}

impl ConnectivityMonitor {
    pub fn new(link: Box<dyn Link>, clock: Box<dyn Clock>, reconnect_interval: Duration) -> Self {
        Self {
            link,
            clock,
            reconnect_interval_ms: reconnect_interval.as_millis() as u64,
            last_attempt_ms: None,
            reconnect_attempts: 0,
        }
    }

    /// Boot-time connection attempt. Counts as an attempt for rate limiting.
    pub fn start(&mut self) -> LinkStatus {
        if self.link.is_up() {
            return LinkStatus {
                state: LinkState::Up,
                reconnected: false,
            };
        }
        info!("Connecting...");
        self.attempt()
    }

    /// Reports the current link state, attempting a reconnect first if the
    /// link is down and the reconnect interval has elapsed.
    pub fn poll(&mut self) -> LinkStatus {
        if self.link.is_up() {
            return LinkStatus {
                state: LinkState::Up,
                reconnected: false,
            };
        }

        let now = self.clock.now_ms();
        let due = self
            .last_attempt_ms
            .map_or(true, |last| now.saturating_sub(last) >= self.reconnect_interval_ms);

        if !due {
            return LinkStatus {
                state: LinkState::Down,
                reconnected: false,
            };
        }

        info!("Link disconnected. Attempting to reconnect...");
        self.attempt()
    }

    fn attempt(&mut self) -> LinkStatus {
        self.last_attempt_ms = Some(self.clock.now_ms());
        self.reconnect_attempts += 1;

        if self.link.reconnect() {
            LinkStatus {
                state: LinkState::Up,
                reconnected: true,
            }
        } else {
            debug!("Reconnect attempt {} failed", self.reconnect_attempts);
            LinkStatus {
                state: LinkState::Down,
                reconnected: false,
            }
        }
    }

    /// Marks the link down after a failed delivery. The next reconnect is
    /// held back for a full interval from now.
    pub fn report_failure(&mut self) {
        self.link.mark_down();
        self.last_attempt_ms = Some(self.clock.now_ms());
    }

    /// Current state without side effects
    #[must_use]
    pub fn state(&self) -> LinkState {
        if self.link.is_up() {
            LinkState::Up
        } else {
            LinkState::Down
        }
    }

    /// Total reconnect attempts made so far
    #[must_use]
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts
    }
}
