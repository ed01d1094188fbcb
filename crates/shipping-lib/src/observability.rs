//! Observability infrastructure for the quote service
//!
//! Provides:
//! - Prometheus metrics (quote latency, quotes by cost source, rejections, artifact state)
//! - Structured JSON logging with tracing

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::error::QuoteError;
use crate::models::CostSource;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    Histogram, IntCounter, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<QuoteMetricsInner> = OnceLock::new();

struct QuoteMetricsInner {
    quote_latency_seconds: Histogram,
    quotes_total: IntCounterVec,
    rejections_total: IntCounterVec,
    failures_total: IntCounter,
    artifact_loaded: IntGaugeVec,
}

impl QuoteMetricsInner {
    fn new() -> Self {
        Self {
            quote_latency_seconds: register_histogram!(
                "shipping_quote_latency_seconds",
                "Time spent computing a shipping quote",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register quote_latency_seconds"),

            quotes_total: register_int_counter_vec!(
                "shipping_quotes_total",
                "Quotes served, by where the cost came from",
                &["source"]
            )
            .expect("Failed to register quotes_total"),

            rejections_total: register_int_counter_vec!(
                "shipping_quote_rejections_total",
                "Requests rejected as client errors",
                &["reason"]
            )
            .expect("Failed to register rejections_total"),

            failures_total: register_int_counter!(
                "shipping_quote_failures_total",
                "Requests that failed with an internal error"
            )
            .expect("Failed to register failures_total"),

            artifact_loaded: register_int_gauge_vec!(
                "shipping_artifact_loaded",
                "1 if the artifact was loaded at startup, 0 if running degraded",
                &["artifact"]
            )
            .expect("Failed to register artifact_loaded"),
        }
    }
}

/// Quote metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct QuoteMetrics {
    _private: (),
}

impl Default for QuoteMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(QuoteMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &QuoteMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_quote_latency(&self, duration_secs: f64) {
        self.inner().quote_latency_seconds.observe(duration_secs);
    }

    pub fn inc_quotes(&self, source: CostSource) {
        self.inner()
            .quotes_total
            .with_label_values(&[source.as_str()])
            .inc();
    }

    /// Count a failed quote as either a rejection or an internal failure
    pub fn record_error(&self, err: &QuoteError) {
        if err.is_client_error() {
            self.inner()
                .rejections_total
                .with_label_values(&[err.kind()])
                .inc();
        } else {
            self.inner().failures_total.inc();
        }
    }

    /// Publish which artifacts the store holds
    pub fn set_artifact_state(&self, store: &ArtifactStore) {
        for kind in ArtifactKind::ALL {
            self.inner()
                .artifact_loaded
                .with_label_values(&[kind.as_str()])
                .set(store.is_loaded(kind) as i64);
        }
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_artifact_loaded(&self, kind: ArtifactKind, source: &str) {
        info!(
            event = "artifact_loaded",
            service = %self.service,
            artifact = kind.as_str(),
            source = %source,
            "Artifact loaded"
        );
    }

    pub fn log_artifact_unavailable(&self, kind: ArtifactKind, source: &str, error: &str) {
        warn!(
            event = "artifact_unavailable",
            service = %self.service,
            artifact = kind.as_str(),
            source = %source,
            error = %error,
            degraded_behavior = kind.degraded_behavior(),
            "Artifact unavailable, running degraded"
        );
    }

    pub fn log_quote(&self, num_items: i64, estado: &str, cost: f64, source: CostSource) {
        debug!(
            event = "quote_generated",
            service = %self.service,
            num_items = num_items,
            estado = %estado,
            costo_envio = cost,
            source = source.as_str(),
            "Generated shipping quote"
        );
    }

    /// Client errors are logged at info, internal failures at error with the full cause
    pub fn log_quote_error(&self, err: &QuoteError) {
        if err.is_client_error() {
            info!(
                event = "quote_rejected",
                service = %self.service,
                reason = err.kind(),
                message = %err,
                "Quote request rejected"
            );
        } else {
            error!(
                event = "quote_failed",
                service = %self.service,
                error = %err,
                "Quote request failed"
            );
        }
    }

    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            addr = %addr,
            "Shipping quote service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Shipping quote service shutting down"
        );
    }
}
