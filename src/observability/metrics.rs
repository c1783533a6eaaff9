//! # Metrics
//!
//! Prometheus metrics for monitoring the configurator.
//!
//! ## Metrics Exposed
//!
//! - `cloudflare_configurator_reconciliations_total` - Total number of reconciliation passes
//! - `cloudflare_configurator_reconciliation_outcomes_total{status}` - Passes by resulting unit status
//! - `cloudflare_configurator_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `cloudflare_configurator_secret_operations_total{operation}` - Mutating secret store calls
//! - `cloudflare_configurator_triggers_total{trigger}` - Triggers received by the watch loop

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cloudflare_configurator_reconciliations_total",
        "Total number of reconciliation passes",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_OUTCOMES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloudflare_configurator_reconciliation_outcomes_total",
            "Reconciliation passes by resulting unit status",
        ),
        &["status"],
    )
    .expect("Failed to create RECONCILIATION_OUTCOMES_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cloudflare_configurator_reconciliation_duration_seconds",
            "Duration of reconciliation passes in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SECRET_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloudflare_configurator_secret_operations_total",
            "Mutating secret store operations by kind",
        ),
        &["operation"],
    )
    .expect("Failed to create SECRET_OPERATIONS_TOTAL metric - this should never happen")
});

static TRIGGERS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloudflare_configurator_triggers_total",
            "Triggers received by the watch loop",
        ),
        &["trigger"],
    )
    .expect("Failed to create TRIGGERS_TOTAL metric - this should never happen")
});

/// Register all metrics with the global registry
///
/// Call once at startup; a second call fails with `AlreadyReg`.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_OUTCOMES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRET_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TRIGGERS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_outcome(status: &str) {
    RECONCILIATION_OUTCOMES_TOTAL
        .with_label_values(&[status])
        .inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_secret_operation(operation: &str) {
    SECRET_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn increment_trigger(trigger: &str) {
    TRIGGERS_TOTAL.with_label_values(&[trigger]).inc();
}
