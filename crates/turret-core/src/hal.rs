use serde::Serialize;

/// Logic level of a digital output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinLevel {
    #[default]
    Low,
    High,
}

/// Everything the core drives on the peripherals for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputFrame {
    pub forward_duty: u16,
    pub reverse_duty: u16,
    pub driver_enabled: bool,
    pub turret_pins: (PinLevel, PinLevel),
    pub servo_angle: u8,
}

impl OutputFrame {
    /// Drive outputs are exclusive: at most one direction channel carries duty.
    pub fn drive_exclusive(&self) -> bool {
        self.forward_duty == 0 || self.reverse_duty == 0
    }
}

pub trait ActuatorIO: Send {
    fn apply(&mut self, frame: &OutputFrame);
    fn is_healthy(&self) -> bool;
}
