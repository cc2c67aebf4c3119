//! Prometheus metrics for the relay.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    SubmissionsTotal,
    CooldownEntries,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricName::SubmissionsTotal => "lead_relay_submissions_total",
            MetricName::CooldownEntries => "lead_relay_cooldown_entries",
        };
        write!(f, "{name}")
    }
}

/// Install the global Prometheus recorder. Returns `None` if one is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            warn!(error = %e, "Prometheus recorder install failed (possibly already installed)");
            None
        }
    }
}

/// Count a finished submission by outcome label.
pub fn record_submission(outcome: &'static str) {
    metrics::counter!(MetricName::SubmissionsTotal.to_string(), "outcome" => outcome).increment(1);
}

pub fn record_cooldown_entries(entries: usize) {
    metrics::gauge!(MetricName::CooldownEntries.to_string()).set(entries as f64);
}
