use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Clock shared by the control thread, the command bridge and telemetry.
///
/// Monotonic microseconds stamp staged tokens and snapshots, so command
/// staleness is measured on the same axis as the tick timestamps. Wall-clock
/// time is only attached to telemetry and audit entries.
#[derive(Debug, Clone, Copy)]
pub struct TimeBase {
    start: Instant,
}

impl TimeBase {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Monotonic microseconds since start.
    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Wall-clock microseconds since Unix epoch (for logs and telemetry only).
    pub fn unix_us(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64
    }

    pub fn age(since_us: u64, now_us: u64) -> Duration {
        Duration::from_micros(now_us.saturating_sub(since_us))
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}
