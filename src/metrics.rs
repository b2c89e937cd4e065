// Prometheus metrics definitions for the Poddo bot.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Characters with a read-modify-write cycle in flight.
    pub static ref CHARACTER_LOCKS_ACTIVE: IntGauge =
        IntGauge::new("poddo_character_locks_active", "Characters currently locked for update").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Commands handled, by qualified command name.
    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("poddo_commands_total", "Total commands handled"),
        &["command"],
    )
    .unwrap();

    /// Command failures, by error category.
    pub static ref COMMAND_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("poddo_command_errors_total", "Total command errors"),
        &["kind"],
    )
    .unwrap();

    /// Level changes caused by experience grants, by direction.
    pub static ref LEVEL_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("poddo_level_transitions_total", "Level transitions"),
        &["direction"],
    )
    .unwrap();

    /// Guild prefix lookups, by cache result (hit/miss).
    pub static ref PREFIX_LOOKUPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("poddo_prefix_lookups_total", "Guild prefix lookups"),
        &["result"],
    )
    .unwrap();

    pub static ref CHARACTERS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "poddo_characters_created_total",
        "Characters created",
    )
    .unwrap();

    pub static ref DELETED_MESSAGES_LOGGED_TOTAL: IntCounter = IntCounter::new(
        "poddo_deleted_messages_logged_total",
        "Deleted messages written to the log",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Request duration in seconds, by endpoint.
    pub static ref REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "poddo_request_duration_seconds",
            "Request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(CHARACTER_LOCKS_ACTIVE.clone()),
            Box::new(COMMANDS_TOTAL.clone()),
            Box::new(COMMAND_ERRORS_TOTAL.clone()),
            Box::new(LEVEL_TRANSITIONS_TOTAL.clone()),
            Box::new(PREFIX_LOOKUPS_TOTAL.clone()),
            Box::new(CHARACTERS_CREATED_TOTAL.clone()),
            Box::new(DELETED_MESSAGES_LOGGED_TOTAL.clone()),
            Box::new(REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            REGISTRY.register(c).expect("failed to register metric");
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Normalize a URL path for metric labels: replace numeric path segments with `:id`
/// to prevent cardinality explosion.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<i64>().is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
