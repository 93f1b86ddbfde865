/// Control tokens understood by the dispatcher.
///
/// Tokens are matched exactly and case-sensitively:
///
/// | token         | command             |
/// |---------------|---------------------|
/// | `f`           | [`Command::Forward`]  |
/// | `b`           | [`Command::Backward`] |
/// | `l`           | [`Command::Left`]     |
/// | `r`           | [`Command::Right`]    |
/// | `s`           | [`Command::Stop`]     |
/// | `servo:<int>` | [`Command::Servo`]    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
    /// Raw requested angle, not yet clamped.
    Servo(i64),
}

pub const SERVO_PREFIX: &str = "servo:";

impl Command {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "f" => Some(Command::Forward),
            "b" => Some(Command::Backward),
            "l" => Some(Command::Left),
            "r" => Some(Command::Right),
            "s" => Some(Command::Stop),
            _ => token
                .strip_prefix(SERVO_PREFIX)
                .map(|arg| Command::Servo(leading_int(arg))),
        }
    }
}

/// Lenient integer read: skips leading whitespace, takes an optional sign and
/// as many digits as follow. Anything unparsable reads as 0. Saturates
/// instead of overflowing.
pub fn leading_int(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    if negative {
        -value
    } else {
        value
    }
}
