use crate::control_loop::ControlConfig;
use crate::hal::OutputFrame;
use crate::power_gate::{PowerDemand, PowerGate};
use crate::ramp::{Direction, MotorState, RampController};
use crate::servo::AngleActuator;
use crate::turret::{DiscreteActuator, TurretDirection};

/// All actuator state of the vehicle, owned by the control thread.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub(crate) drive: RampController,
    pub(crate) turret: DiscreteActuator,
    pub(crate) servo: AngleActuator,
    gate: PowerGate,
}

impl VehicleState {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            drive: RampController::new(config.step_size, config.max_speed),
            turret: DiscreteActuator::new(),
            servo: AngleActuator::new(config.neutral_angle),
            gate: PowerGate::new(),
        }
    }

    pub fn drive(&self) -> &RampController {
        &self.drive
    }

    pub fn turret(&self) -> &DiscreteActuator {
        &self.turret
    }

    pub fn turret_mut(&mut self) -> &mut DiscreteActuator {
        &mut self.turret
    }

    pub fn servo(&self) -> &AngleActuator {
        &self.servo
    }

    pub fn servo_mut(&mut self) -> &mut AngleActuator {
        &mut self.servo
    }

    pub fn motor(&self) -> MotorState {
        self.drive.state()
    }

    pub fn turret_direction(&self) -> TurretDirection {
        self.turret.direction()
    }

    pub fn demand(&self) -> PowerDemand {
        PowerDemand {
            motor_active: self.drive.state().is_active(),
            turret_active: self.turret.is_active(),
        }
    }

    /// Driver power as derived from the current state, without waiting for
    /// the next tick.
    pub fn energized(&self) -> bool {
        PowerGate::derive(self.demand())
    }

    /// Whether anything is moving or about to move.
    pub fn is_active(&self) -> bool {
        let demand = self.demand();
        demand.motor_active || demand.turret_active
    }

    pub fn forward(&mut self) {
        self.drive.set_target(Direction::Forward, self.drive.max_speed());
    }

    pub fn backward(&mut self) {
        self.drive.set_target(Direction::Reverse, self.drive.max_speed());
    }

    /// Ramp the drive down and stop the turret.
    pub fn stop(&mut self) {
        self.drive.stop();
        self.turret.stop();
    }

    /// One control tick: advance the ramp, re-derive driver power and
    /// produce the frame to write out.
    pub fn tick(&mut self) -> OutputFrame {
        let duty = self.drive.advance_one_tick();
        let energized = self.gate.recompute(self.demand());
        OutputFrame {
            forward_duty: duty.forward,
            reverse_duty: duty.reverse,
            driver_enabled: energized,
            turret_pins: self.turret.pins(),
            servo_angle: self.servo.angle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::PinLevel;

    fn vehicle() -> VehicleState {
        VehicleState::new(&ControlConfig::default())
    }

    #[test]
    fn starts_at_rest() {
        let mut v = vehicle();
        assert!(!v.energized());
        let frame = v.tick();
        assert_eq!(frame.forward_duty, 0);
        assert_eq!(frame.reverse_duty, 0);
        assert!(!frame.driver_enabled);
        assert_eq!(frame.turret_pins, (PinLevel::Low, PinLevel::Low));
        assert_eq!(frame.servo_angle, 90);
    }

    #[test]
    fn forward_reaches_max_after_forty_ticks() {
        let mut v = vehicle();
        v.forward();
        let mut frame = v.tick();
        for _ in 1..40 {
            frame = v.tick();
        }
        assert_eq!(v.motor().current_speed, 200);
        assert_eq!(frame.forward_duty, 200);
        assert_eq!(frame.reverse_duty, 0);
        assert!(frame.driver_enabled);
    }

    #[test]
    fn stop_de_energizes_on_the_tick_speed_reaches_zero() {
        let mut v = vehicle();
        v.forward();
        for _ in 0..40 {
            v.tick();
        }
        v.stop();
        for tick in 1..=40 {
            let frame = v.tick();
            if tick < 40 {
                assert!(frame.driver_enabled, "tick {}", tick);
            } else {
                assert_eq!(frame.forward_duty, 0);
                assert!(!frame.driver_enabled);
            }
        }
    }

    #[test]
    fn turret_stop_keeps_power_while_drive_is_active() {
        let mut v = vehicle();
        v.forward();
        v.turret_mut().left();
        v.tick();
        v.turret_mut().stop();
        assert!(v.tick().driver_enabled);
    }

    #[test]
    fn turret_alone_holds_power_across_ticks() {
        let mut v = vehicle();
        v.turret_mut().right();
        for _ in 0..5 {
            let frame = v.tick();
            assert!(frame.driver_enabled);
            assert_eq!(frame.turret_pins, (PinLevel::Low, PinLevel::High));
        }
        v.turret_mut().stop();
        assert!(!v.tick().driver_enabled);
    }
}
