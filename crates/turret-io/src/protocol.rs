use serde::Serialize;
use turret_core::tags;
use turret_core::{Direction, TurretDirection, VehicleSnapshot};

pub const STATE_TAGS: &[tags::Tag] = &[
    tags::CURRENT_SPEED,
    tags::TARGET_SPEED,
    tags::FORWARD_DUTY,
    tags::REVERSE_DUTY,
    tags::DRIVER_ENABLED,
    tags::TURRET,
    tags::SERVO_ANGLE,
    tags::CYCLE_JITTER_US,
    tags::TIMESTAMP_US,
];

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    pub const fn v1() -> Self {
        Self { major: 1, minor: 0 }
    }
}

/// Turns one inbound text frame into a control token.
///
/// Frames are decoded leniently (invalid UTF-8 becomes U+FFFD) and only the
/// line terminator is stripped, so token matching stays exact. Empty frames
/// yield `None`.
pub fn decode_frame(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let token = text.trim_end_matches(['\r', '\n']);
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

/// Telemetry line pushed to connected clients.
#[derive(Debug, Serialize)]
pub struct StateMsg {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub protocol_version: ProtocolVersion,
    pub sequence: u64,
    pub timestamp_us: u64,
    pub cycle_count: u64,
    pub unix_us: u64,
    pub current_speed: u16,
    pub target_speed: u16,
    pub direction: Direction,
    pub forward_duty: u16,
    pub reverse_duty: u16,
    pub driver_enabled: bool,
    pub turret: TurretDirection,
    pub servo_angle: u8,
    pub cycle_jitter_us: u32,
}

impl StateMsg {
    pub fn from_snapshot(snapshot: &VehicleSnapshot, sequence: u64, unix_us: u64) -> Self {
        Self {
            msg_type: "state",
            protocol_version: ProtocolVersion::v1(),
            sequence,
            timestamp_us: snapshot.timestamp_us,
            cycle_count: snapshot.cycle_count,
            unix_us,
            current_speed: snapshot.current_speed,
            target_speed: snapshot.target_speed,
            direction: snapshot.direction,
            forward_duty: snapshot.forward_duty,
            reverse_duty: snapshot.reverse_duty,
            driver_enabled: snapshot.driver_enabled,
            turret: snapshot.turret,
            servo_angle: snapshot.servo_angle,
            cycle_jitter_us: snapshot.cycle_jitter_us,
        }
    }

    /// Newline-terminated JSON line.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}
