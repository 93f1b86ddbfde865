use crate::command::Command;
use crate::vehicle::VehicleState;
use log::{debug, trace};

/// Maps control tokens onto actuator operations.
///
/// Holds no state. Unknown or garbled tokens are dropped without touching the
/// vehicle and without reporting an error to the sender.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Returns the command that was applied, if any.
    pub fn dispatch(vehicle: &mut VehicleState, token: &str) -> Option<Command> {
        let Some(command) = Command::parse(token) else {
            trace!("ignoring token {:?}", token);
            return None;
        };
        Self::apply(vehicle, command);
        Some(command)
    }

    pub fn apply(vehicle: &mut VehicleState, command: Command) {
        debug!("dispatch {:?}", command);
        match command {
            Command::Forward => vehicle.forward(),
            Command::Backward => vehicle.backward(),
            Command::Left => vehicle.turret_mut().left(),
            Command::Right => vehicle.turret_mut().right(),
            Command::Stop => vehicle.stop(),
            Command::Servo(angle) => {
                vehicle.servo_mut().set_angle(angle);
            }
        }
    }
}
