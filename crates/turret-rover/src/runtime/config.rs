use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use turret_core::{ConfigError, ControlConfig};
use turret_io::BridgeConfig;

#[derive(Debug, Error)]
pub enum RuntimeConfigError {
    #[error("{flag} expects a value")]
    MissingValue { flag: String },
    #[error("invalid value {value:?} for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error(transparent)]
    Control(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub bind_addr: String,
    pub bridge_enabled: bool,
    pub max_clients: usize,
    /// Telemetry push period; 0 disables pushes.
    pub publish_ms: u64,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub audit_path: Option<PathBuf>,
    pub tick_ms: u64,
    pub max_speed: u16,
    pub step_size: u16,
    pub pwm_bits: u8,
    pub command_timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let control = ControlConfig::default();
        let bridge = BridgeConfig::default();
        Self {
            show_help: false,
            run_seconds: None,
            bind_addr: bridge.bind_addr,
            bridge_enabled: true,
            max_clients: bridge.max_clients,
            publish_ms: bridge
                .publish_interval
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            json_logs: false,
            log_dir: None,
            metrics_addr: None,
            audit_path: None,
            tick_ms: control.tick_period.as_millis() as u64,
            max_speed: control.max_speed,
            step_size: control.step_size,
            pwm_bits: control.pwm_resolution_bits,
            command_timeout_ms: None,
        }
    }
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, RuntimeConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| RuntimeConfigError::MissingValue {
            flag: flag.to_string(),
        })
}

fn parse<T: FromStr>(flag: &str, raw: &str) -> Result<T, RuntimeConfigError> {
    raw.parse().map_err(|_| RuntimeConfigError::InvalidValue {
        flag: flag.to_string(),
        value: raw.to_string(),
    })
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, RuntimeConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Result<Self, RuntimeConfigError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--run-seconds" => {
                    cfg.run_seconds = Some(parse(flag, value(args, i, flag)?)?);
                    i += 1;
                }
                "--bind" => {
                    cfg.bind_addr = value(args, i, flag)?.to_string();
                    i += 1;
                }
                "--no-bridge" => {
                    cfg.bridge_enabled = false;
                }
                "--max-clients" => {
                    cfg.max_clients = parse(flag, value(args, i, flag)?)?;
                    i += 1;
                }
                "--publish-ms" => {
                    cfg.publish_ms = parse(flag, value(args, i, flag)?)?;
                    i += 1;
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--log-dir" => {
                    cfg.log_dir = Some(PathBuf::from(value(args, i, flag)?));
                    i += 1;
                }
                "--metrics-addr" => {
                    cfg.metrics_addr = Some(value(args, i, flag)?.to_string());
                    i += 1;
                }
                "--audit-log" => {
                    cfg.audit_path = Some(PathBuf::from(value(args, i, flag)?));
                    i += 1;
                }
                "--tick-ms" => {
                    cfg.tick_ms = parse(flag, value(args, i, flag)?)?;
                    i += 1;
                }
                "--max-speed" => {
                    cfg.max_speed = parse(flag, value(args, i, flag)?)?;
                    i += 1;
                }
                "--step-size" => {
                    cfg.step_size = parse(flag, value(args, i, flag)?)?;
                    i += 1;
                }
                "--pwm-bits" => {
                    cfg.pwm_bits = parse(flag, value(args, i, flag)?)?;
                    i += 1;
                }
                "--command-timeout-ms" => {
                    let ms: u64 = parse(flag, value(args, i, flag)?)?;
                    cfg.command_timeout_ms = (ms > 0).then_some(ms);
                    i += 1;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        if !cfg.show_help {
            cfg.control_config().validate()?;
        }
        Ok(cfg)
    }

    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            tick_period: Duration::from_millis(self.tick_ms),
            max_speed: self.max_speed,
            step_size: self.step_size,
            pwm_resolution_bits: self.pwm_bits,
            command_timeout: self.command_timeout_ms.map(Duration::from_millis),
            ..ControlConfig::default()
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            bind_addr: self.bind_addr.clone(),
            publish_interval: (self.publish_ms > 0).then(|| Duration::from_millis(self.publish_ms)),
            max_clients: self.max_clients,
            ..BridgeConfig::default()
        }
    }

    pub fn print_help() {
        println!(
            r#"turret-rover - Soft-ramp drive, turret and gimbal control over a text command link

USAGE:
    turret-rover [OPTIONS]

OPTIONS:
    --bind <ADDR>             Command bridge TCP bind address [default: 0.0.0.0:8080]
    --no-bridge               Disable the command bridge
    --max-clients <N>         Simultaneous command clients [default: 4]
    --publish-ms <MS>         Telemetry push period, 0 disables [default: 100]
    --run-seconds <SECS>      Run for a fixed duration then exit
    --tick-ms <MS>            Control tick period [default: 10]
    --max-speed <DUTY>        Drive duty for f/b commands [default: 200]
    --step-size <DUTY>        Ramp step per tick [default: 5]
    --pwm-bits <BITS>         Drive PWM resolution [default: 8]
    --command-timeout-ms <MS> Stop when no command arrives for this long, 0 disables [default: 0]
    --json-logs               Output logs in JSON format
    --log-dir <PATH>          Also write daily-rolling JSON logs to this directory
    --metrics-addr <ADDR>     Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --audit-log <PATH>        Enable audit logging to specified JSONL file
    -h, --help                Print this help message

COMMANDS (one per line):
    f | b                     Ramp drive forward / backward to max speed
    l | r                     Rotate turret left / right
    s                         Ramp drive to rest and stop the turret
    servo:<ANGLE>             Move gimbal, clamped to 0..=180

ENVIRONMENT VARIABLES:
    RUST_LOG                  Set log filter (e.g., RUST_LOG=debug,turret_core=trace)

EXAMPLES:
    # Drive with metrics and a 500 ms link timeout
    turret-rover --metrics-addr 0.0.0.0:9090 --command-timeout-ms 500

    # Short local run
    turret-rover --bind 127.0.0.1:8080 --run-seconds 10
"#
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("turret-rover")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_match_control_defaults() {
        let cfg = RuntimeConfig::from_args(&args(&[])).unwrap();
        let control = cfg.control_config();
        assert_eq!(control.tick_period, Duration::from_millis(10));
        assert_eq!(control.max_speed, 200);
        assert_eq!(control.step_size, 5);
        assert_eq!(control.command_timeout, None);
        assert!(cfg.bridge_enabled);
        assert_eq!(
            cfg.bridge_config().publish_interval,
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn parses_flags() {
        let cfg = RuntimeConfig::from_args(&args(&[
            "--bind",
            "127.0.0.1:9000",
            "--tick-ms",
            "20",
            "--command-timeout-ms",
            "500",
            "--publish-ms",
            "0",
            "--run-seconds",
            "3",
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.run_seconds, Some(3));
        assert_eq!(
            cfg.control_config().command_timeout,
            Some(Duration::from_millis(500))
        );
        assert_eq!(cfg.bridge_config().publish_interval, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            RuntimeConfig::from_args(&args(&["--tick-ms", "fast"])),
            Err(RuntimeConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_args(&args(&["--bind"])),
            Err(RuntimeConfigError::MissingValue { .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_args(&args(&["--max-speed", "300"])),
            Err(RuntimeConfigError::Control(
                ConfigError::MaxSpeedAboveCeiling { .. }
            ))
        ));
    }

    #[test]
    fn help_skips_validation() {
        let cfg = RuntimeConfig::from_args(&args(&["--step-size", "0", "-h"])).unwrap();
        assert!(cfg.show_help);
    }
}
