use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Refresh and session metrics. Built once by the composition root and
/// handed to the coordinator.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Refresh metrics
    pub refresh_requests: IntCounter,
    pub refresh_joined: IntCounter,
    pub refresh_failures: IntCounterVec,
    pub refresh_duration: Histogram,

    // Session metrics
    pub forced_logouts: IntCounter,
    pub token_expiry_unix: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>> {
        let registry = Registry::new_custom(Some("tokenmanager".into()), None)?;

        let metrics = Arc::new(Self {
            // Refresh
            refresh_requests: IntCounter::new("refresh_requests_total", "Refresh network calls issued")?,
            refresh_joined: IntCounter::new("refresh_joined_total", "Callers that joined an in-flight refresh")?,
            refresh_failures: IntCounterVec::new(Opts::new("refresh_failures_total", "Refresh failures by reason"), &["reason"])?,
            refresh_duration: Histogram::with_opts(HistogramOpts::new("refresh_duration_seconds", "Refresh duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]))?,

            // Session
            forced_logouts: IntCounter::new("forced_logouts_total", "Sessions terminated after a failed refresh")?,
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry of the current access token")?,

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.refresh_requests.clone()))?;
        reg.register(Box::new(metrics.refresh_joined.clone()))?;
        reg.register(Box::new(metrics.refresh_failures.clone()))?;
        reg.register(Box::new(metrics.refresh_duration.clone()))?;
        reg.register(Box::new(metrics.forced_logouts.clone()))?;
        reg.register(Box::new(metrics.token_expiry_unix.clone()))?;

        Ok(metrics)
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
