use crate::ramp::Direction;
use crate::turret::TurretDirection;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// State published by the control thread after every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct VehicleSnapshot {
    pub timestamp_us: u64,
    pub cycle_count: u64,
    pub cycles_missed: u64,
    pub current_speed: u16,
    pub target_speed: u16,
    pub direction: Direction,
    pub forward_duty: u16,
    pub reverse_duty: u16,
    pub driver_enabled: bool,
    pub turret: TurretDirection,
    pub servo_angle: u8,
    pub cycle_jitter_us: u32,
    pub commands_applied: u64,
    pub commands_ignored: u64,
    /// Tokens discarded because the inbox was full.
    pub commands_dropped: u64,
    pub watchdog_stops: u64,
}

/// A raw control token as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedToken {
    pub received_us: u64,
    pub token: String,
}

/// Hand-off point between transport threads and the control thread.
///
/// Transports only stage tokens here; the control thread drains them at the
/// start of a tick and is the only party that touches actuator state.
pub struct CommandExchange {
    inbox: Mutex<VecDeque<StagedToken>>,
    capacity: usize,
    dropped: AtomicU64,
    snapshot: Mutex<VehicleSnapshot>,
}

// A panicked holder cannot leave a token queue or a Copy snapshot half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl CommandExchange {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inbox: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
            snapshot: Mutex::new(VehicleSnapshot::default()),
        }
    }

    /// Called by transport threads. When the inbox is full the oldest token
    /// is discarded so the newest command always gets through.
    pub fn submit_token(&self, token: &str, received_us: u64) {
        let mut inbox = lock(&self.inbox);
        if inbox.len() >= self.capacity {
            inbox.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        inbox.push_back(StagedToken {
            received_us,
            token: token.to_owned(),
        });
    }

    /// Called by the control thread every tick.
    pub fn drain(&self) -> Vec<StagedToken> {
        lock(&self.inbox).drain(..).collect()
    }

    pub fn dropped_tokens(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Called by the control thread every tick. The lock is held only for
    /// the copy, so readers never see a partially written snapshot.
    pub fn publish(&self, snapshot: VehicleSnapshot) {
        *lock(&self.snapshot) = snapshot;
    }

    pub fn read_snapshot(&self) -> VehicleSnapshot {
        *lock(&self.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drains_in_arrival_order() {
        let exchange = CommandExchange::new(8);
        exchange.submit_token("f", 10);
        exchange.submit_token("servo:30", 20);
        let drained = exchange.drain();
        let tokens: Vec<&str> = drained.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(tokens, vec!["f", "servo:30"]);
        assert_eq!(drained[1].received_us, 20);
        assert!(exchange.drain().is_empty());
    }

    #[test]
    fn full_inbox_drops_oldest() {
        let exchange = CommandExchange::new(2);
        exchange.submit_token("f", 1);
        exchange.submit_token("l", 2);
        exchange.submit_token("s", 3);
        let tokens: Vec<String> = exchange.drain().into_iter().map(|t| t.token).collect();
        assert_eq!(tokens, vec!["l".to_string(), "s".to_string()]);
        assert_eq!(exchange.dropped_tokens(), 1);
    }

    #[test]
    fn snapshot_round_trip() {
        let exchange = CommandExchange::new(1);
        assert_eq!(exchange.read_snapshot().cycle_count, 0);
        exchange.publish(VehicleSnapshot {
            cycle_count: 7,
            servo_angle: 45,
            ..Default::default()
        });
        let snap = exchange.read_snapshot();
        assert_eq!(snap.cycle_count, 7);
        assert_eq!(snap.servo_angle, 45);
    }

    #[test]
    fn concurrent_readers_never_see_torn_snapshots() {
        let exchange = Arc::new(CommandExchange::new(1));
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let exchange = Arc::clone(&exchange);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let snap = exchange.read_snapshot();
                        assert_eq!(snap.timestamp_us, snap.cycle_count * 10);
                        assert_eq!(snap.commands_applied, snap.cycle_count);
                    }
                })
            })
            .collect();

        for cycle in 1..=20_000u64 {
            exchange.publish(VehicleSnapshot {
                timestamp_us: cycle * 10,
                cycle_count: cycle,
                commands_applied: cycle,
                ..Default::default()
            });
        }
        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(exchange.read_snapshot().cycle_count, 20_000);
    }
}
