use crate::timebase::TimeBase;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No recognized command has arrived yet.
    #[default]
    Idle,
    Fresh,
    /// Timed out; cleared by the next recognized command.
    Stale,
}

/// Staleness timeout on the command link.
///
/// With no timeout configured the last command persists forever. With one,
/// a silent link while the vehicle is moving yields a single stop request.
#[derive(Debug, Clone)]
pub struct CommandWatchdog {
    timeout: Option<Duration>,
    last_command_us: Option<u64>,
    state: LinkState,
}

impl CommandWatchdog {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            last_command_us: None,
            state: LinkState::Idle,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn feed(&mut self, received_us: u64) {
        self.last_command_us = Some(received_us);
        self.state = LinkState::Fresh;
    }

    /// Returns true exactly once per stale period, and only while the
    /// vehicle is active.
    pub fn check(&mut self, now_us: u64, vehicle_active: bool) -> bool {
        let Some(timeout) = self.timeout else {
            return false;
        };
        if self.state == LinkState::Stale || !vehicle_active {
            return false;
        }
        let Some(last) = self.last_command_us else {
            return false;
        };
        if TimeBase::age(last, now_us) > timeout {
            self.state = LinkState::Stale;
            return true;
        }
        false
    }
}
