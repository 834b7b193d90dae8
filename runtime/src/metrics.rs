//! Prometheus metrics for the lotto engine.
//!
//! Business metrics cover the whole participant journey:
//! - Pool generation (slots per tier, duration)
//! - Participations by outcome, registration races
//! - Slot claims per tier and exhausted inventories
//! - Result checks (first disclosure or repeat)
//!
//! # Example
//!
//! ```rust,no_run
//! use lotto_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Serve metrics on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use lotto_core::types::Tier;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Installs the global recorder and serves `/metrics` over HTTP on `addr`.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the recorder and spawn the HTTP listener.
    ///
    /// Must be called from inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built (for example the
    /// address cannot be bound).
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a
    /// warning and leaves the existing recorder in place.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_business_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                tokio::spawn(exporter);
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(_) => {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                Ok(())
            }
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register descriptions for every business metric.
///
/// Safe to call more than once.
pub fn register_business_metrics() {
    describe_counter!(
        "lotto_pools_generated_total",
        "Outcome pools written to storage"
    );
    describe_counter!(
        "lotto_pool_slots_total",
        "Outcome slots generated, labelled by tier"
    );
    describe_histogram!(
        "lotto_pool_generation_duration_seconds",
        "Time taken to generate and persist one pool"
    );
    describe_counter!(
        "lotto_participations_total",
        "Participation attempts, labelled by outcome"
    );
    describe_counter!(
        "lotto_registration_retries_total",
        "Registration attempts that lost a uniqueness race"
    );
    describe_counter!(
        "lotto_slots_claimed_total",
        "Slots claimed by participants, labelled by tier"
    );
    describe_counter!(
        "lotto_allocation_exhausted_total",
        "Allocations that found no eligible slot"
    );
    describe_counter!(
        "lotto_result_checks_total",
        "Result checks, labelled by whether it was the first one"
    );
}

/// Pool generation metrics recorder.
pub struct PoolMetrics;

impl PoolMetrics {
    /// Record a pool written to storage.
    pub fn record_generated(tier_counts: &[(Tier, u64)], duration: Duration) {
        counter!("lotto_pools_generated_total").increment(1);
        for &(tier, count) in tier_counts {
            counter!("lotto_pool_slots_total", "tier" => tier.as_str()).increment(count);
        }
        histogram!("lotto_pool_generation_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Participation metrics recorder.
pub struct ParticipationMetrics;

impl ParticipationMetrics {
    /// Record the outcome of one participation attempt.
    pub fn record_outcome(outcome: &'static str) {
        counter!("lotto_participations_total", "outcome" => outcome).increment(1);
    }

    /// Record a registration attempt that lost a race.
    pub fn record_retry() {
        counter!("lotto_registration_retries_total").increment(1);
    }

    /// Record a claimed slot.
    pub fn record_claim(tier: Tier) {
        counter!("lotto_slots_claimed_total", "tier" => tier.as_str()).increment(1);
    }

    /// Record an allocation with nothing left to claim.
    pub fn record_exhausted() {
        counter!("lotto_allocation_exhausted_total").increment(1);
    }
}

/// Result disclosure metrics recorder.
pub struct ResultMetrics;

impl ResultMetrics {
    /// Record a result check.
    pub fn record_check(first: bool) {
        let first = if first { "true" } else { "false" };
        counter!("lotto_result_checks_total", "first" => first).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.render().is_none());
    }

    #[tokio::test]
    async fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        PoolMetrics::record_generated(&[(Tier::First, 1), (Tier::None, 9)], Duration::from_millis(5));
        ParticipationMetrics::record_outcome("issued");
        ParticipationMetrics::record_claim(Tier::Fourth);
        ResultMetrics::record_check(true);

        // Another test may have installed the recorder first; metrics are
        // still recorded, only this handle is missing.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("lotto_pools_generated_total"));
            assert!(rendered.contains("lotto_slots_claimed_total"));
            assert!(rendered.contains("lotto_result_checks_total"));
        }
    }
}
