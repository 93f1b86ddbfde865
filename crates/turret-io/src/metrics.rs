//! Prometheus metrics for the rover.
//!
//! Covers the control tick, the command path and the actuator outputs.

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};
use turret_core::tags;

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Control Loop Metrics
// ============================================================================

/// Total control ticks executed
pub static CYCLES_EXECUTED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "turret_rover_cycles_executed_total",
        "Total control ticks executed",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Control ticks missed (overruns)
pub static CYCLES_MISSED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "turret_rover_cycles_missed_total",
        "Control ticks missed due to timing overruns",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Control loop jitter distribution in microseconds
pub static CYCLE_JITTER_US: LazyLock<Histogram> = LazyLock::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            tags::CYCLE_JITTER_US.metric,
            "Control loop jitter distribution in microseconds",
        )
        .buckets(vec![
            10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ]),
    )
    .unwrap();
    REGISTRY.register(Box::new(histogram.clone())).unwrap();
    histogram
});

// ============================================================================
// Command Metrics
// ============================================================================

/// Tokens that decoded to a command and were applied
pub static COMMANDS_APPLIED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "turret_rover_commands_applied_total",
        "Control tokens decoded and applied",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Tokens that matched no command
pub static COMMANDS_IGNORED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "turret_rover_commands_ignored_total",
        "Control tokens silently dropped as unrecognized",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Staged tokens discarded because the inbox was full
pub static COMMANDS_DROPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "turret_rover_commands_dropped_total",
        "Control tokens discarded on inbox overflow",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Frames received by the bridge
pub static FRAMES_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "turret_rover_frames_received_total",
        "Text frames received from transport clients",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Stops forced by the command watchdog
pub static WATCHDOG_STOPS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "turret_rover_watchdog_stops_total",
        "Stops forced because the command link went stale",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Connected bridge clients
pub static BRIDGE_CLIENTS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        "turret_rover_bridge_clients",
        "Number of connected command clients",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Actuator Metrics
// ============================================================================

/// Current drive speed (duty units)
pub static CURRENT_SPEED: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(tags::CURRENT_SPEED.metric, "Current drive duty magnitude").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Target drive speed (duty units)
pub static TARGET_SPEED: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(tags::TARGET_SPEED.metric, "Target drive duty magnitude").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Forward channel duty
pub static FORWARD_DUTY: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(tags::FORWARD_DUTY.metric, "Forward channel duty").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Reverse channel duty
pub static REVERSE_DUTY: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(tags::REVERSE_DUTY.metric, "Reverse channel duty").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Motor driver enable line (1 = energized)
pub static DRIVER_ENABLED: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        tags::DRIVER_ENABLED.metric,
        "Motor driver enable line (1=energized, 0=asleep)",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Turret direction (0=stopped,1=left,2=right)
pub static TURRET_DIRECTION: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        tags::TURRET.metric,
        "Turret direction (0=stopped,1=left,2=right)",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Commanded servo angle
pub static SERVO_ANGLE: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(tags::SERVO_ANGLE.metric, "Commanded servo angle in degrees").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            let path = request.url();

            match path {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let metric_families = REGISTRY.gather();
                    let mut buffer = Vec::new();

                    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                        tracing::warn!("Failed to encode metrics: {}", e);
                        let _ = request.respond(
                            Response::from_string("Internal Server Error").with_status_code(500),
                        );
                        continue;
                    }

                    let response = Response::from_data(buffer).with_header(
                        tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/plain; version=0.0.4"[..],
                        )
                        .unwrap(),
                    );
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    // Ready once the control loop has ticked
                    if CYCLES_EXECUTED.get() > 0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = CYCLES_EXECUTED.get();
    let _ = CYCLES_MISSED.get();
    let _ = CYCLE_JITTER_US.get_sample_count();
    let _ = COMMANDS_APPLIED.get();
    let _ = COMMANDS_IGNORED.get();
    let _ = COMMANDS_DROPPED.get();
    let _ = FRAMES_RECEIVED.get();
    let _ = WATCHDOG_STOPS.get();
    let _ = BRIDGE_CLIENTS.get();
    let _ = CURRENT_SPEED.get();
    let _ = TARGET_SPEED.get();
    let _ = FORWARD_DUTY.get();
    let _ = REVERSE_DUTY.get();
    let _ = DRIVER_ENABLED.get();
    let _ = TURRET_DIRECTION.get();
    let _ = SERVO_ANGLE.get();
}
