//! # Prometheus Metrics
//!
//! Exposes operational metrics for the dispatch core. Scraped at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! The router keeps its own atomic counters; the gauges here mirror a
//! [`StatsSnapshot`] taken at scrape time, and the ingest counter is fed
//! directly by the TCP receive path. All metrics live in a dedicated
//! [`prometheus::Registry`] so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use lattice_protocol::StatsSnapshot;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct DispatchMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Raw frames accepted off the wire, before any classification.
    pub messages_ingested_total: IntCounter,
    /// Messages that reached a component handler.
    pub messages_processed: IntGauge,
    /// Messages dropped for being shorter than the minimum body offset.
    pub messages_malformed: IntGauge,
    /// Messages dropped for carrying an unknown type byte.
    pub messages_unknown_type: IntGauge,
    /// Handler invocations that reported failure.
    pub handler_failures: IntGauge,
}

impl DispatchMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("lattice".into()), None)
            .expect("failed to create prometheus registry");

        let messages_ingested_total = IntCounter::new(
            "messages_ingested_total",
            "Raw frames accepted off the wire",
        )
        .expect("metric creation");
        registry
            .register(Box::new(messages_ingested_total.clone()))
            .expect("metric registration");

        let messages_processed = IntGauge::new(
            "messages_processed",
            "Messages that reached a component handler",
        )
        .expect("metric creation");
        registry
            .register(Box::new(messages_processed.clone()))
            .expect("metric registration");

        let messages_malformed = IntGauge::new(
            "messages_malformed",
            "Messages dropped for being undersized",
        )
        .expect("metric creation");
        registry
            .register(Box::new(messages_malformed.clone()))
            .expect("metric registration");

        let messages_unknown_type = IntGauge::new(
            "messages_unknown_type",
            "Messages dropped for an unknown type byte",
        )
        .expect("metric creation");
        registry
            .register(Box::new(messages_unknown_type.clone()))
            .expect("metric registration");

        let handler_failures = IntGauge::new(
            "handler_failures",
            "Handler invocations that reported failure",
        )
        .expect("metric creation");
        registry
            .register(Box::new(handler_failures.clone()))
            .expect("metric registration");

        Self {
            registry,
            messages_ingested_total,
            messages_processed,
            messages_malformed,
            messages_unknown_type,
            handler_failures,
        }
    }

    /// Copies a router stats snapshot into the mirrored gauges.
    pub fn observe(&self, stats: &StatsSnapshot) {
        self.messages_processed.set(stats.processed_total as i64);
        self.messages_malformed.set(stats.malformed_dropped as i64);
        self.messages_unknown_type.set(stats.unknown_dropped as i64);
        self.handler_failures.set(stats.handler_failures as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared with the metrics handler: the metric handles plus a way to
/// refresh them from the router at scrape time.
#[derive(Clone)]
pub struct MetricsState {
    /// Metric handles.
    pub metrics: Arc<DispatchMetrics>,
    /// Router owning the authoritative counters.
    pub router: Arc<lattice_protocol::MessageRouter>,
}

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<MetricsState>,
) -> impl IntoResponse {
    state.metrics.observe(&state.router.stats());
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
