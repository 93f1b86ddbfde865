/// Names a published signal carries in telemetry and in metrics.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub metric: &'static str,
}

pub const CURRENT_SPEED: Tag = Tag {
    key: "current_speed",
    metric: "turret_rover_drive_current_speed",
};

pub const TARGET_SPEED: Tag = Tag {
    key: "target_speed",
    metric: "turret_rover_drive_target_speed",
};

pub const FORWARD_DUTY: Tag = Tag {
    key: "forward_duty",
    metric: "turret_rover_drive_forward_duty",
};

pub const REVERSE_DUTY: Tag = Tag {
    key: "reverse_duty",
    metric: "turret_rover_drive_reverse_duty",
};

pub const DRIVER_ENABLED: Tag = Tag {
    key: "driver_enabled",
    metric: "turret_rover_driver_enabled",
};

pub const TURRET: Tag = Tag {
    key: "turret",
    metric: "turret_rover_turret_direction",
};

pub const SERVO_ANGLE: Tag = Tag {
    key: "servo_angle",
    metric: "turret_rover_servo_angle_degrees",
};

pub const CYCLE_JITTER_US: Tag = Tag {
    key: "cycle_jitter_us",
    metric: "turret_rover_cycle_jitter_microseconds",
};

pub const TIMESTAMP_US: Tag = Tag {
    key: "timestamp_us",
    metric: "turret_rover_timestamp_us",
};
