use crate::hal::{ActuatorIO, OutputFrame};

/// Host-side stand-in for the PWM, GPIO and servo peripherals.
///
/// Records what the control loop wrote so runs without hardware can be
/// inspected, and flags any frame that would have driven both bridge
/// channels at once.
#[derive(Debug, Clone, Default)]
pub struct SimulatedActuators {
    last_frame: Option<OutputFrame>,
    frames_applied: u64,
    exclusion_faults: u64,
    enable_edges: u64,
}

impl SimulatedActuators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&OutputFrame> {
        self.last_frame.as_ref()
    }

    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    pub fn exclusion_faults(&self) -> u64 {
        self.exclusion_faults
    }

    /// Number of times the driver enable line changed level.
    pub fn enable_edges(&self) -> u64 {
        self.enable_edges
    }
}

impl ActuatorIO for SimulatedActuators {
    fn apply(&mut self, frame: &OutputFrame) {
        if !frame.drive_exclusive() {
            self.exclusion_faults += 1;
        }
        let was_enabled = self.last_frame.map(|f| f.driver_enabled).unwrap_or(false);
        if was_enabled != frame.driver_enabled {
            self.enable_edges += 1;
        }
        self.last_frame = Some(*frame);
        self.frames_applied += 1;
    }

    fn is_healthy(&self) -> bool {
        self.exclusion_faults == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::PinLevel;

    fn frame(forward: u16, reverse: u16, enabled: bool) -> OutputFrame {
        OutputFrame {
            forward_duty: forward,
            reverse_duty: reverse,
            driver_enabled: enabled,
            turret_pins: (PinLevel::Low, PinLevel::Low),
            servo_angle: 90,
        }
    }

    #[test]
    fn records_frames_and_enable_edges() {
        let mut io = SimulatedActuators::new();
        io.apply(&frame(0, 0, false));
        io.apply(&frame(5, 0, true));
        io.apply(&frame(10, 0, true));
        io.apply(&frame(0, 0, false));

        assert_eq!(io.frames_applied(), 4);
        assert_eq!(io.enable_edges(), 2);
        assert_eq!(io.last_frame().map(|f| f.forward_duty), Some(0));
        assert!(io.is_healthy());
    }

    #[test]
    fn overlapping_drive_marks_unhealthy() {
        let mut io = SimulatedActuators::new();
        io.apply(&frame(10, 10, true));
        assert_eq!(io.exclusion_faults(), 1);
        assert!(!io.is_healthy());
    }
}
