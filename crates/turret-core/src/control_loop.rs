use crate::dispatch::CommandDispatcher;
use crate::hal::{ActuatorIO, OutputFrame};
use crate::sync::{CommandExchange, VehicleSnapshot};
use crate::timebase::TimeBase;
use crate::vehicle::VehicleState;
use crate::watchdog::CommandWatchdog;
use log::{info, warn};
use std::sync::{atomic::AtomicBool, Arc};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct ControlConfig {
    pub tick_period: Duration,
    pub max_speed: u16,
    pub step_size: u16,
    pub pwm_resolution_bits: u8,
    pub neutral_angle: u8,
    /// `None` keeps the last command in force indefinitely.
    pub command_timeout: Option<Duration>,
    pub overrun_warn_threshold: Duration,
    pub inbox_capacity: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(10),
            max_speed: 200,
            step_size: 5,
            pwm_resolution_bits: 8,
            neutral_angle: 90,
            command_timeout: None,
            overrun_warn_threshold: Duration::from_millis(50),
            inbox_capacity: 64,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tick period must be non-zero")]
    ZeroTickPeriod,
    #[error("ramp step size must be non-zero")]
    ZeroStepSize,
    #[error("pwm resolution of {0} bits is outside 1..=16")]
    Resolution(u8),
    #[error("max speed {max_speed} exceeds duty ceiling {ceiling}")]
    MaxSpeedAboveCeiling { max_speed: u16, ceiling: u16 },
    #[error("neutral angle {0} is outside 0..=180")]
    NeutralAngle(u8),
    #[error("command inbox capacity must be non-zero")]
    ZeroInbox,
}

impl ControlConfig {
    /// Largest duty value the PWM peripheral accepts.
    pub fn duty_ceiling(&self) -> u16 {
        ((1u32 << self.pwm_resolution_bits.min(16)) - 1) as u16
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period.is_zero() {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if self.step_size == 0 {
            return Err(ConfigError::ZeroStepSize);
        }
        if !(1..=16).contains(&self.pwm_resolution_bits) {
            return Err(ConfigError::Resolution(self.pwm_resolution_bits));
        }
        if self.max_speed > self.duty_ceiling() {
            return Err(ConfigError::MaxSpeedAboveCeiling {
                max_speed: self.max_speed,
                ceiling: self.duty_ceiling(),
            });
        }
        if self.neutral_angle > crate::servo::MAX_ANGLE {
            return Err(ConfigError::NeutralAngle(self.neutral_angle));
        }
        if self.inbox_capacity == 0 {
            return Err(ConfigError::ZeroInbox);
        }
        Ok(())
    }
}

#[derive(Clone, Default, Debug)]
pub struct ExecutionStats {
    pub cycles_executed: u64,
    pub cycles_missed: u64,
    pub max_jitter_us: u64,
    pub commands_applied: u64,
    pub commands_ignored: u64,
    pub watchdog_stops: u64,
}

/// The cooperative control loop.
///
/// Each tick drains staged tokens, dispatches them, advances the drive ramp,
/// re-derives driver power and writes one [`OutputFrame`]. The tick period
/// is the only clock the ramp sees.
pub struct TickScheduler<IO: ActuatorIO> {
    io: IO,
    config: ControlConfig,
    exchange: Arc<CommandExchange>,
    vehicle: VehicleState,
    watchdog: CommandWatchdog,
    stats: ExecutionStats,
    last_jitter_us: u32,
    timebase: TimeBase,
}

impl<IO: ActuatorIO> TickScheduler<IO> {
    pub fn new(
        io: IO,
        config: ControlConfig,
        exchange: Arc<CommandExchange>,
        timebase: TimeBase,
    ) -> Self {
        let vehicle = VehicleState::new(&config);
        let watchdog = CommandWatchdog::new(config.command_timeout);
        Self {
            io,
            config,
            exchange,
            vehicle,
            watchdog,
            stats: ExecutionStats::default(),
            last_jitter_us: 0,
            timebase,
        }
    }

    pub fn run(&mut self, stop: &AtomicBool) {
        let mut next_cycle = Instant::now();

        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let now = Instant::now();
            if now < next_cycle {
                std::thread::sleep(next_cycle - now);
            } else if now > next_cycle + self.config.tick_period {
                self.stats.cycles_missed += 1;
                let overrun = now.duration_since(next_cycle);
                if overrun > self.config.overrun_warn_threshold {
                    warn!("control tick overran by {} us", overrun.as_micros());
                }
                // Re-anchor rather than burst through the missed ticks.
                next_cycle = now;
            }

            // Lateness of this tick against its deadline.
            let jitter_us = Instant::now().saturating_duration_since(next_cycle).as_micros() as u64;
            self.stats.max_jitter_us = self.stats.max_jitter_us.max(jitter_us);
            self.last_jitter_us = jitter_us.min(u32::MAX as u64) as u32;

            let timestamp_us = self.timebase.now_us();
            self.run_once(timestamp_us);

            next_cycle += self.config.tick_period;
        }

        self.shutdown();
    }

    /// One full tick at `timestamp_us`, without any waiting.
    pub fn run_once(&mut self, timestamp_us: u64) -> OutputFrame {
        for staged in self.exchange.drain() {
            match CommandDispatcher::dispatch(&mut self.vehicle, &staged.token) {
                Some(_) => {
                    self.watchdog.feed(staged.received_us);
                    self.stats.commands_applied += 1;
                }
                None => self.stats.commands_ignored += 1,
            }
        }

        if self.watchdog.check(timestamp_us, self.vehicle.is_active()) {
            warn!(
                "no command for {:?}, stopping vehicle",
                self.watchdog.timeout().unwrap_or_default()
            );
            self.vehicle.stop();
            self.stats.watchdog_stops += 1;
        }

        let frame = self.vehicle.tick();
        self.io.apply(&frame);
        self.stats.cycles_executed += 1;

        self.publish(timestamp_us, &frame);
        frame
    }

    fn publish(&self, timestamp_us: u64, frame: &OutputFrame) {
        let motor = self.vehicle.motor();
        self.exchange.publish(VehicleSnapshot {
            timestamp_us,
            cycle_count: self.stats.cycles_executed,
            cycles_missed: self.stats.cycles_missed,
            current_speed: motor.current_speed,
            target_speed: motor.target_speed,
            direction: motor.direction,
            forward_duty: frame.forward_duty,
            reverse_duty: frame.reverse_duty,
            driver_enabled: frame.driver_enabled,
            turret: self.vehicle.turret_direction(),
            servo_angle: frame.servo_angle,
            cycle_jitter_us: self.last_jitter_us,
            commands_applied: self.stats.commands_applied,
            commands_ignored: self.stats.commands_ignored,
            commands_dropped: self.exchange.dropped_tokens(),
            watchdog_stops: self.stats.watchdog_stops,
        });
    }

    /// Leaves every output de-energized on exit.
    fn shutdown(&mut self) {
        let frame = OutputFrame {
            forward_duty: 0,
            reverse_duty: 0,
            driver_enabled: false,
            turret_pins: Default::default(),
            servo_angle: self.vehicle.servo().angle(),
        };
        self.io.apply(&frame);
        info!(
            "control loop stopped after {} cycles",
            self.stats.cycles_executed
        );
    }

    pub fn vehicle(&self) -> &VehicleState {
        &self.vehicle
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::PinLevel;
    use crate::hal_sim::SimulatedActuators;

    fn scheduler(
        config: ControlConfig,
    ) -> (TickScheduler<SimulatedActuators>, Arc<CommandExchange>) {
        let exchange = Arc::new(CommandExchange::new(config.inbox_capacity));
        let sched = TickScheduler::new(
            SimulatedActuators::new(),
            config,
            Arc::clone(&exchange),
            TimeBase::new(),
        );
        (sched, exchange)
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ControlConfig::default().validate(), Ok(()));
        assert_eq!(ControlConfig::default().duty_ceiling(), 255);
    }

    #[test]
    fn rejects_bad_config() {
        let cfg = ControlConfig {
            step_size: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroStepSize));

        let cfg = ControlConfig {
            max_speed: 300,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MaxSpeedAboveCeiling {
                max_speed: 300,
                ceiling: 255
            })
        );

        let cfg = ControlConfig {
            pwm_resolution_bits: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Resolution(0)));
    }

    #[test]
    fn staged_tokens_apply_on_next_tick() {
        let (mut sched, exchange) = scheduler(ControlConfig::default());
        exchange.submit_token("f", 0);
        exchange.submit_token("bogus", 0);
        exchange.submit_token("servo:45", 0);

        let frame = sched.run_once(10_000);
        assert_eq!(frame.forward_duty, 5);
        assert_eq!(frame.servo_angle, 45);
        assert!(frame.driver_enabled);
        assert_eq!(sched.stats().commands_applied, 2);
        assert_eq!(sched.stats().commands_ignored, 1);

        let snap = exchange.read_snapshot();
        assert_eq!(snap.cycle_count, 1);
        assert_eq!(snap.target_speed, 200);
        assert_eq!(snap.forward_duty, 5);
    }

    #[test]
    fn ramp_rate_is_tick_based_not_command_based() {
        let (mut sched, exchange) = scheduler(ControlConfig::default());
        for _ in 0..10 {
            exchange.submit_token("f", 0);
        }
        let frame = sched.run_once(0);
        assert_eq!(frame.forward_duty, 5);
    }

    #[test]
    fn turret_command_reaches_outputs() {
        let (mut sched, exchange) = scheduler(ControlConfig::default());
        exchange.submit_token("l", 0);
        let frame = sched.run_once(0);
        assert_eq!(frame.turret_pins, (PinLevel::High, PinLevel::Low));
        assert!(frame.driver_enabled);
        assert_eq!(sched.io().frames_applied(), 1);
    }

    #[test]
    fn watchdog_stops_stale_vehicle() {
        let config = ControlConfig {
            command_timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        };
        let (mut sched, exchange) = scheduler(config);
        exchange.submit_token("f", 0);
        exchange.submit_token("r", 0);
        sched.run_once(0);
        sched.run_once(50_000);
        assert_eq!(sched.vehicle().motor().target_speed, 200);

        sched.run_once(150_000);
        assert_eq!(sched.stats().watchdog_stops, 1);
        assert_eq!(sched.vehicle().motor().target_speed, 0);
        assert!(!sched.vehicle().turret().is_active());

        sched.run_once(300_000);
        assert_eq!(sched.stats().watchdog_stops, 1);
        assert_eq!(exchange.read_snapshot().watchdog_stops, 1);
    }

    #[test]
    fn unrecognized_tokens_do_not_refresh_watchdog() {
        let config = ControlConfig {
            command_timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        };
        let (mut sched, exchange) = scheduler(config);
        exchange.submit_token("f", 0);
        sched.run_once(0);

        for tick in 1..=15u64 {
            let now = tick * 10_000;
            exchange.submit_token("zzz", now);
            sched.run_once(now);
        }
        assert_eq!(sched.stats().commands_ignored, 15);
        assert_eq!(sched.stats().watchdog_stops, 1);
        assert_eq!(sched.vehicle().motor().target_speed, 0);
    }

    #[test]
    fn inbox_overflow_is_published() {
        let config = ControlConfig {
            inbox_capacity: 2,
            ..Default::default()
        };
        let (mut sched, exchange) = scheduler(config);
        for token in ["f", "l", "servo:10", "s"] {
            exchange.submit_token(token, 0);
        }
        sched.run_once(0);
        let snap = exchange.read_snapshot();
        assert_eq!(snap.commands_dropped, 2);
        assert_eq!(snap.servo_angle, 10);
        assert_eq!(sched.vehicle().motor().target_speed, 0);
    }

    #[test]
    fn without_timeout_last_command_persists() {
        let (mut sched, exchange) = scheduler(ControlConfig::default());
        exchange.submit_token("b", 0);
        for i in 0..100 {
            sched.run_once(i * 1_000_000);
        }
        assert_eq!(sched.vehicle().motor().target_speed, 200);
        assert_eq!(sched.io().last_frame().map(|f| f.reverse_duty), Some(200));
    }

    #[test]
    fn run_exits_with_outputs_off() {
        let config = ControlConfig {
            tick_period: Duration::from_millis(1),
            ..Default::default()
        };
        let (mut sched, exchange) = scheduler(config);
        exchange.submit_token("f", 0);
        exchange.submit_token("l", 0);
        let stop = AtomicBool::new(true);
        sched.run(&stop);
        let last = sched.io().last_frame().copied();
        assert_eq!(
            last.map(|f| (f.forward_duty, f.driver_enabled)),
            Some((0, false))
        );
    }
}
