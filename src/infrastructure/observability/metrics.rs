//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("uuid pattern is valid")
});

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("numeric segment pattern is valid"));

const RUN_DURATION_METRIC: &str = "rag_run_duration_seconds";

/// Prometheus handle backing the /metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match build_recorder(config).and_then(|builder| builder.install_recorder()) {
        Ok(handle) => {
            gauge!("citerag_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
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

fn build_recorder(config: &MetricsConfig) -> Result<PrometheusBuilder, BuildError> {
    let builder = PrometheusBuilder::new();

    if config.run_duration_buckets.is_empty() {
        return Ok(builder);
    }

    builder.set_buckets_for_metric(
        Matcher::Full(RUN_DURATION_METRIC.to_string()),
        &config.run_duration_buckets,
    )
}

pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

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

/// Parameters for completion request metrics
pub struct LlmRequestMetricParams<'a> {
    pub provider: &'a str,
    pub model: &'a str,
    pub duration: Duration,
    pub success: bool,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

pub fn record_llm_request(params: LlmRequestMetricParams) {
    let labels = [
        ("provider", params.provider.to_string()),
        ("model", params.model.to_string()),
        ("status", if params.success { "success" } else { "error" }.to_string()),
    ];

    counter!("llm_requests_total", &labels).increment(1);
    histogram!("llm_request_duration_seconds", &labels).record(params.duration.as_secs_f64());

    if let Some(tokens) = params.input_tokens {
        counter!("llm_input_tokens_total", &labels).increment(tokens);
    }

    if let Some(tokens) = params.output_tokens {
        counter!("llm_output_tokens_total", &labels).increment(tokens);
    }

    if !params.success {
        counter!("llm_errors_total", &labels).increment(1);
    }
}

/// How a rerank call was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankMode {
    Provider,
    Fallback,
}

impl RerankMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Fallback => "fallback",
        }
    }
}

pub fn record_rerank(mode: RerankMode, duration: Duration) {
    let labels = [("mode", mode.as_str().to_string())];

    counter!("rerank_requests_total", &labels).increment(1);
    histogram!("rerank_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record a degraded embedding (`kind`: document, window, zero, query, ...)
pub fn record_embedding_fallback(kind: &'static str) {
    counter!("embedding_fallbacks_total", "kind" => kind).increment(1);
}

pub fn record_rag_run(outcome: &'static str, revisions: u32, duration: Duration) {
    counter!("rag_runs_total", "outcome" => outcome).increment(1);
    histogram!("rag_revisions").record(revisions as f64);
    histogram!(RUN_DURATION_METRIC, "outcome" => outcome).record(duration.as_secs_f64());
}

pub fn record_ingestion(chunks: usize, fallbacks: usize) {
    counter!("ingested_documents_total").increment(1);
    counter!("ingested_chunks_total").increment(chunks as u64);

    if fallbacks > 0 {
        counter!("ingested_degraded_documents_total").increment(1);
    }
}

/// Replace ids in a URL path to keep label cardinality bounded
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");

    path.chars().take(50).collect()
}
