//! Prometheus metrics for the delivery pipeline.
//!
//! - `switchboard_serialize_cache_total{result}` - cache hits and misses
//! - `switchboard_lines_sent_total` - lines handed to outbound queues
//! - `switchboard_deliveries_vetoed_total` - recipients denied by a hook
//! - `switchboard_delivery_errors_total{error}` - per-recipient failures
//! - `switchboard_tags_rejected_total` - incoming client tags dropped
//! - `switchboard_capability_bits` / `switchboard_running_batches` - bit tables
//!
//! Every `record_*` helper is a no-op until [`init`] has run.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Serialization cache lookups by result (`hit` / `miss`).
pub static SERIALIZE_CACHE: OnceLock<IntCounterVec> = OnceLock::new();

/// Total lines successfully queued to connections.
pub static LINES_SENT: OnceLock<IntCounter> = OnceLock::new();

/// Total per-recipient deliveries suppressed by a hook.
pub static DELIVERIES_VETOED: OnceLock<IntCounter> = OnceLock::new();

/// Per-recipient delivery failures by error code.
pub static DELIVERY_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Incoming client tags rejected by arbitration.
pub static TAGS_REJECTED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Capability bits currently allocated.
pub static CAPABILITY_BITS: OnceLock<IntGauge> = OnceLock::new();

/// Batches currently running.
pub static RUNNING_BATCHES: OnceLock<IntGauge> = OnceLock::new();

/// Initialize all metrics and register them with the global registry.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(SERIALIZE_CACHE, IntCounterVec::new(Opts::new("switchboard_serialize_cache_total", "Serialization cache lookups"), &["result"]));
    register!(LINES_SENT, IntCounter::new("switchboard_lines_sent_total", "Lines queued to connections"));
    register!(DELIVERIES_VETOED, IntCounter::new("switchboard_deliveries_vetoed_total", "Deliveries denied by a hook"));
    register!(DELIVERY_ERRORS, IntCounterVec::new(Opts::new("switchboard_delivery_errors_total", "Per-recipient delivery failures"), &["error"]));
    register!(TAGS_REJECTED, IntCounter::new("switchboard_tags_rejected_total", "Incoming client tags rejected"));
    register!(CAPABILITY_BITS, IntGauge::new("switchboard_capability_bits", "Capability bits allocated"));
    register!(RUNNING_BATCHES, IntGauge::new("switchboard_running_batches", "Batches currently running"));
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recording helpers
// ============================================================================

#[inline]
pub fn record_cache(hit: bool) {
    if let Some(c) = SERIALIZE_CACHE.get() {
        c.with_label_values(&[if hit { "hit" } else { "miss" }]).inc();
    }
}

#[inline]
pub fn record_lines_sent(count: usize) {
    if let Some(c) = LINES_SENT.get() {
        c.inc_by(count as u64);
    }
}

#[inline]
pub fn record_vetoed() {
    if let Some(c) = DELIVERIES_VETOED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_delivery_error(code: &str) {
    if let Some(c) = DELIVERY_ERRORS.get() {
        c.with_label_values(&[code]).inc();
    }
}

#[inline]
pub fn record_tag_rejected() {
    if let Some(c) = TAGS_REJECTED.get() {
        c.inc();
    }
}

#[inline]
pub fn set_capability_bits(count: usize) {
    if let Some(g) = CAPABILITY_BITS.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn set_running_batches(count: usize) {
    if let Some(g) = RUNNING_BATCHES.get() {
        g.set(count as i64);
    }
}
