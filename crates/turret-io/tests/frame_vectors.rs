use turret_core::{TurretDirection, VehicleSnapshot};
use turret_io::protocol::{decode_frame, StateMsg, STATE_TAGS};

#[test]
fn strips_line_terminators_only() {
    assert_eq!(decode_frame(b"f\n").as_deref(), Some("f"));
    assert_eq!(decode_frame(b"servo:45\r\n").as_deref(), Some("servo:45"));
    assert_eq!(decode_frame(b" f").as_deref(), Some(" f"));
    assert_eq!(decode_frame(b"\r\n"), None);
    assert_eq!(decode_frame(b""), None);
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let token = decode_frame(&[b's', 0xff]).expect("non-empty frame");
    assert_eq!(token, "s\u{fffd}");
}

#[test]
fn state_message_carries_every_tag() {
    let snapshot = VehicleSnapshot {
        cycle_count: 12,
        current_speed: 60,
        target_speed: 200,
        forward_duty: 60,
        driver_enabled: true,
        turret: TurretDirection::Left,
        servo_angle: 45,
        ..Default::default()
    };
    let line = StateMsg::from_snapshot(&snapshot, 3, 1_700_000_000_000_000)
        .to_line()
        .expect("state serializes");
    assert_eq!(line.last(), Some(&b'\n'));

    let value: serde_json::Value = serde_json::from_slice(&line).expect("valid json");
    assert_eq!(value["type"], "state");
    assert_eq!(value["sequence"], 3);
    assert_eq!(value["turret"], "left");
    assert_eq!(value["direction"], "forward");
    assert_eq!(value["forward_duty"], 60);
    assert_eq!(value["reverse_duty"], 0);
    for tag in STATE_TAGS {
        assert!(value.get(tag.key).is_some(), "missing {}", tag.key);
    }
}
