use crate::infra::audit::{AuditEventType, AuditLogger};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use turret_core::{
    ActuatorIO, CommandExchange, ExecutionStats, SimulatedActuators, TickScheduler, TimeBase,
};
use turret_io::bridge::run_bridge;

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("turret-rover: {}", e);
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }
    run(config)
}

pub fn run(config: RuntimeConfig) -> ExitCode {
    let _log_guard = init_tracing(config.json_logs, config.log_dir.as_deref());

    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let control_config = config.control_config();
    let exchange = Arc::new(CommandExchange::new(control_config.inbox_capacity));
    let timebase = TimeBase::new();

    let audit_logger = match init_audit_logger(config.audit_path.as_ref()) {
        Ok(logger) => logger,
        Err(code) => return code,
    };

    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            timebase.now_us(),
            timebase.unix_us(),
            AuditEventType::SystemStart,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "tick_ms": control_config.tick_period.as_millis() as u64,
                "max_speed": control_config.max_speed,
                "step_size": control_config.step_size,
                "command_timeout_ms": control_config.command_timeout.map(|d| d.as_millis() as u64),
                "bridge_enabled": config.bridge_enabled,
            }),
        );
    }

    let stop = Arc::new(AtomicBool::new(false));

    info!(
        tick_ms = control_config.tick_period.as_millis() as u64,
        max_speed = control_config.max_speed,
        step_size = control_config.step_size,
        command_timeout_ms = ?control_config.command_timeout.map(|d| d.as_millis()),
        "Starting control loop"
    );

    let scheduler_handle = {
        let exchange = Arc::clone(&exchange);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut scheduler =
                TickScheduler::new(SimulatedActuators::new(), control_config, exchange, timebase);
            scheduler.run(&stop);
            if !scheduler.io().is_healthy() {
                error!(
                    faults = scheduler.io().exclusion_faults(),
                    "Drive outputs overlapped during run"
                );
            }
            scheduler.stats().clone()
        })
    };

    let bridge_handle = if config.bridge_enabled {
        let exchange = Arc::clone(&exchange);
        let stop = Arc::clone(&stop);
        let audit = audit_logger.clone();
        let bridge_config = config.bridge_config();
        info!(addr = %bridge_config.bind_addr, "Starting command bridge");
        Some(thread::spawn(move || {
            if let Err(e) = run_bridge(exchange, timebase, bridge_config, Arc::clone(&stop)) {
                error!(error = %e, "Command bridge failed");
                if let Some(logger) = audit {
                    let _ = logger.log_event(
                        timebase.now_us(),
                        timebase.unix_us(),
                        AuditEventType::BridgeFailure,
                        serde_json::json!({ "error": e.to_string() }),
                    );
                }
                stop.store(true, Ordering::Relaxed);
                return false;
            }
            true
        }))
    } else {
        info!("Command bridge disabled");
        None
    };

    let updater_handle = telemetry::start_metrics_updater(
        Arc::clone(&exchange),
        timebase,
        audit_logger.clone(),
        Arc::clone(&stop),
    );

    info!("Turret rover running. Send f/b/l/r/s or servo:<angle>, one per line.");

    if let Some(seconds) = config.run_seconds {
        info!(seconds, "Running for limited duration");
        let deadline = std::time::Instant::now() + Duration::from_secs(seconds);
        while std::time::Instant::now() < deadline && !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(50));
        }
        stop.store(true, Ordering::Relaxed);
    }

    let stats = match scheduler_handle.join() {
        Ok(stats) => stats,
        Err(_) => {
            error!("Control loop thread panicked");
            stop.store(true, Ordering::Relaxed);
            ExecutionStats::default()
        }
    };
    let bridge_ok = bridge_handle
        .map(|handle| handle.join().unwrap_or(false))
        .unwrap_or(true);
    let _ = updater_handle.join();

    info!(
        cycles_executed = stats.cycles_executed,
        cycles_missed = stats.cycles_missed,
        commands_applied = stats.commands_applied,
        commands_ignored = stats.commands_ignored,
        watchdog_stops = stats.watchdog_stops,
        max_jitter_us = stats.max_jitter_us,
        "Run complete"
    );

    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            timebase.now_us(),
            timebase.unix_us(),
            AuditEventType::SystemShutdown,
            serde_json::json!({
                "cycles_executed": stats.cycles_executed,
                "cycles_missed": stats.cycles_missed,
                "commands_applied": stats.commands_applied,
                "commands_ignored": stats.commands_ignored,
                "watchdog_stops": stats.watchdog_stops,
            }),
        );
    }

    if bridge_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_audit_logger(audit_path: Option<&PathBuf>) -> Result<Option<Arc<AuditLogger>>, ExitCode> {
    let Some(path) = audit_path else {
        return Ok(None);
    };
    match AuditLogger::new(path) {
        Ok(logger) => {
            info!(path = %path.display(), "Audit logging enabled");
            Ok(Some(Arc::new(logger)))
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to initialize audit logger");
            Err(ExitCode::FAILURE)
        }
    }
}
