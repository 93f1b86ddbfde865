use crate::hal::PinLevel;
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurretDirection {
    #[default]
    Stopped,
    Left,
    Right,
}

impl TurretDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TurretDirection::Stopped => "stopped",
            TurretDirection::Left => "left",
            TurretDirection::Right => "right",
        }
    }

    /// Numeric code used for gauges: 0 stopped, 1 left, 2 right.
    pub fn code(self) -> u8 {
        match self {
            TurretDirection::Stopped => 0,
            TurretDirection::Left => 1,
            TurretDirection::Right => 2,
        }
    }
}

/// Rotation motor: full power one way, the other, or off. No ramp.
#[derive(Debug, Clone, Default)]
pub struct DiscreteActuator {
    direction: TurretDirection,
}

impl DiscreteActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left(&mut self) {
        debug!("turret rotating left");
        self.direction = TurretDirection::Left;
    }

    pub fn right(&mut self) {
        debug!("turret rotating right");
        self.direction = TurretDirection::Right;
    }

    /// Drops both pins. Power is left to the gate's next recompute.
    pub fn stop(&mut self) {
        self.direction = TurretDirection::Stopped;
    }

    pub fn direction(&self) -> TurretDirection {
        self.direction
    }

    /// A turning turret requests driver power regardless of the drive ramp.
    pub fn is_active(&self) -> bool {
        self.direction != TurretDirection::Stopped
    }

    pub fn pins(&self) -> (PinLevel, PinLevel) {
        match self.direction {
            TurretDirection::Stopped => (PinLevel::Low, PinLevel::Low),
            TurretDirection::Left => (PinLevel::High, PinLevel::Low),
            TurretDirection::Right => (PinLevel::Low, PinLevel::High),
        }
    }
}
