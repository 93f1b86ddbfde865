use log::warn;

pub const MIN_ANGLE: u8 = 0;
pub const MAX_ANGLE: u8 = 180;

/// Gimbal servo. Angles apply immediately; out-of-range requests are clamped.
#[derive(Debug, Clone)]
pub struct AngleActuator {
    angle: u8,
}

impl AngleActuator {
    pub fn new(neutral: u8) -> Self {
        Self {
            angle: neutral.min(MAX_ANGLE),
        }
    }

    pub fn set_angle(&mut self, requested: i64) -> u8 {
        let clamped = requested.clamp(MIN_ANGLE as i64, MAX_ANGLE as i64) as u8;
        if clamped as i64 != requested {
            warn!("servo angle {} out of range, clamped to {}", requested, clamped);
        }
        self.angle = clamped;
        clamped
    }

    pub fn angle(&self) -> u8 {
        self.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range() {
        let mut servo = AngleActuator::new(90);
        assert_eq!(servo.set_angle(45), 45);
        assert_eq!(servo.set_angle(-20), 0);
        assert_eq!(servo.set_angle(720), 180);
        assert_eq!(servo.set_angle(180), 180);
        assert_eq!(servo.angle(), 180);
    }

    #[test]
    fn neutral_is_bounded() {
        assert_eq!(AngleActuator::new(250).angle(), 180);
    }
}
