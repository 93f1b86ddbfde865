use crate::infra::audit::{AuditEventType, AuditLogger, WatchdogStopDetails};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use turret_core::{CommandExchange, TimeBase};
use turret_io::metrics::{
    init_metrics, serve_metrics, COMMANDS_APPLIED, COMMANDS_DROPPED, COMMANDS_IGNORED,
    CURRENT_SPEED, CYCLES_EXECUTED, CYCLES_MISSED, CYCLE_JITTER_US, DRIVER_ENABLED,
    FORWARD_DUTY, REVERSE_DUTY, SERVO_ANGLE, TARGET_SPEED, TURRET_DIRECTION, WATCHDOG_STOPS,
};

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

/// Mirrors published snapshots into metrics and records watchdog stops in the
/// audit trail.
pub fn start_metrics_updater(
    exchange: Arc<CommandExchange>,
    timebase: TimeBase,
    audit: Option<Arc<AuditLogger>>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last = exchange.read_snapshot();
        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let snapshot = exchange.read_snapshot();

            CURRENT_SPEED.set(snapshot.current_speed as f64);
            TARGET_SPEED.set(snapshot.target_speed as f64);
            FORWARD_DUTY.set(snapshot.forward_duty as f64);
            REVERSE_DUTY.set(snapshot.reverse_duty as f64);
            DRIVER_ENABLED.set(if snapshot.driver_enabled { 1.0 } else { 0.0 });
            TURRET_DIRECTION.set(snapshot.turret.code() as f64);
            SERVO_ANGLE.set(snapshot.servo_angle as f64);
            CYCLE_JITTER_US.observe(snapshot.cycle_jitter_us as f64);

            CYCLES_EXECUTED.inc_by(snapshot.cycle_count.saturating_sub(last.cycle_count));
            CYCLES_MISSED.inc_by(snapshot.cycles_missed.saturating_sub(last.cycles_missed));
            COMMANDS_APPLIED.inc_by(
                snapshot
                    .commands_applied
                    .saturating_sub(last.commands_applied),
            );
            COMMANDS_IGNORED.inc_by(
                snapshot
                    .commands_ignored
                    .saturating_sub(last.commands_ignored),
            );
            COMMANDS_DROPPED.inc_by(
                snapshot
                    .commands_dropped
                    .saturating_sub(last.commands_dropped),
            );
            if snapshot.commands_dropped > last.commands_dropped {
                warn!(
                    commands_dropped = snapshot.commands_dropped,
                    "Command inbox overflowed, oldest tokens discarded"
                );
            }

            if snapshot.watchdog_stops > last.watchdog_stops {
                WATCHDOG_STOPS.inc_by(snapshot.watchdog_stops - last.watchdog_stops);
                warn!(
                    watchdog_stops = snapshot.watchdog_stops,
                    "Command link stale, vehicle stopped"
                );
                if let Some(logger) = &audit {
                    let details = WatchdogStopDetails {
                        cycle_count: snapshot.cycle_count,
                        watchdog_stops: snapshot.watchdog_stops,
                        current_speed: snapshot.current_speed,
                        turret: snapshot.turret.as_str(),
                    };
                    let result = serde_json::to_value(&details)
                        .map_err(std::io::Error::from)
                        .and_then(|details| {
                            logger.log_event(
                                timebase.now_us(),
                                timebase.unix_us(),
                                AuditEventType::WatchdogStop,
                                details,
                            )
                        });
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to write audit entry");
                    }
                }
            }

            last = snapshot;
            thread::sleep(Duration::from_millis(100));
        }
    })
}
