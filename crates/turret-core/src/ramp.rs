use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// Duty values for the two H-bridge channels of the traction motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveDuty {
    pub forward: u16,
    pub reverse: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorState {
    pub current_speed: u16,
    pub target_speed: u16,
    pub direction: Direction,
}

impl MotorState {
    pub fn is_active(&self) -> bool {
        self.target_speed > 0 || self.current_speed > 0
    }
}

/// Soft-ramp speed controller for the traction motor.
///
/// Commands only move the target. The current duty follows it by at most
/// `step_size` per tick, so the tick cadence alone bounds acceleration.
#[derive(Debug, Clone)]
pub struct RampController {
    state: MotorState,
    step_size: u16,
    max_speed: u16,
}

impl RampController {
    pub fn new(step_size: u16, max_speed: u16) -> Self {
        Self {
            state: MotorState::default(),
            step_size,
            max_speed,
        }
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn max_speed(&self) -> u16 {
        self.max_speed
    }

    /// Changing direction while moving keeps the current magnitude; the
    /// output swaps channel on the next tick without passing through zero.
    pub fn set_target(&mut self, direction: Direction, speed: u16) {
        self.state.direction = direction;
        self.state.target_speed = speed.min(self.max_speed);
    }

    pub fn stop(&mut self) {
        self.state.target_speed = 0;
    }

    /// Moves one step toward the target and returns the duty for this tick.
    pub fn advance_one_tick(&mut self) -> DriveDuty {
        let MotorState {
            current_speed,
            target_speed,
            ..
        } = self.state;

        self.state.current_speed = if current_speed < target_speed {
            current_speed.saturating_add(self.step_size).min(target_speed)
        } else if current_speed > target_speed {
            current_speed.saturating_sub(self.step_size).max(target_speed)
        } else {
            current_speed
        };

        self.duty()
    }

    /// Output for the current state; the inactive channel is always zero.
    pub fn duty(&self) -> DriveDuty {
        match self.state.direction {
            Direction::Forward => DriveDuty {
                forward: self.state.current_speed,
                reverse: 0,
            },
            Direction::Reverse => DriveDuty {
                forward: 0,
                reverse: self.state.current_speed,
            },
        }
    }
}
