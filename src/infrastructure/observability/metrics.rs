//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let builder = match PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Suffix("duration_seconds".to_string()),
        &config.latency_buckets,
    ) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!("Invalid latency buckets, using summaries: {}", e);
            PrometheusBuilder::new()
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            gauge!("graph_rag_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record a finished question
pub fn record_query(strategy: &str, outcome: &str, cached: bool, duration: Duration) {
    let labels = [
        ("strategy", strategy.to_string()),
        ("outcome", outcome.to_string()),
        ("cached", cached.to_string()),
    ];

    counter!("queries_total", &labels).increment(1);
    histogram!("query_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record how long one pipeline stage took
pub fn record_stage(stage: &str, duration: Duration) {
    histogram!("query_stage_duration_seconds", "stage" => stage.to_string())
        .record(duration.as_secs_f64());
}

/// Record the outcome of a single search side
pub fn record_search(source: &str, outcome: &str) {
    counter!(
        "retrieval_searches_total",
        "source" => source.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Collapse long or unmatched paths to keep label cardinality bounded
fn sanitize_path(path: &str) -> String {
    match path.char_indices().nth(50) {
        Some((index, _)) => path[..index].to_string(),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_short() {
        assert_eq!(sanitize_path("/v1/query"), "/v1/query");
    }

    #[test]
    fn test_sanitize_path_truncates_long_paths() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert_eq!(sanitize_path(path).chars().count(), 50);
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_query("hybrid", "success", false, Duration::from_millis(5));
        record_stage("embedding", Duration::from_millis(1));
        record_search("graph", "timeout");
    }
}
