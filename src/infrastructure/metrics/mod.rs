//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket session gauge
//! - Dispatched message counter
//! - Recorded read-receipt counter
//! - Push hand-off outcomes

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket sessions
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("sessions_active", "Number of active WebSocket sessions")
            .namespace("support_chat"),
    )
    .expect("Failed to create SESSIONS_ACTIVE metric")
});

/// Messages dispatched to rooms
pub static MESSAGES_DISPATCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("messages_dispatched_total", "Total messages dispatched to rooms")
            .namespace("support_chat"),
    )
    .expect("Failed to create MESSAGES_DISPATCHED metric")
});

/// Read receipts recorded (first-time inserts only)
pub static RECEIPTS_RECORDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("read_receipts_recorded_total", "Total read receipts recorded")
            .namespace("support_chat"),
    )
    .expect("Failed to create RECEIPTS_RECORDED metric")
});

/// Push hand-off outcomes by result
pub static PUSH_HANDOFFS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("push_handoffs_total", "Push notification hand-off outcomes")
            .namespace("support_chat"),
        &["outcome"], // "delivered", "skipped", "failed"
    )
    .expect("Failed to create PUSH_HANDOFFS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .expect("Failed to register SESSIONS_ACTIVE");
    registry
        .register(Box::new(MESSAGES_DISPATCHED.clone()))
        .expect("Failed to register MESSAGES_DISPATCHED");
    registry
        .register(Box::new(RECEIPTS_RECORDED.clone()))
        .expect("Failed to register RECEIPTS_RECORDED");
    registry
        .register(Box::new(PUSH_HANDOFFS.clone()))
        .expect("Failed to register PUSH_HANDOFFS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}
