//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;

/// Handle to the installed Prometheus recorder
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Metrics in the Prometheus text exposition format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

/// Initialize Prometheus metrics. Without it every `record_*` call is a no-op.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!(
                "rag_info",
                "version" => env!("CARGO_PKG_VERSION"),
                "service" => config.service_name.clone()
            )
            .set(1.0);

            tracing::info!(service = %config.service_name, "Prometheus metrics initialized");

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

/// Parameters for LLM call metrics
pub struct LlmCallMetricParams<'a> {
    pub provider: &'a str,
    /// Calling component, e.g. `refine` or `llm_selector`
    pub component: &'a str,
    pub duration: Duration,
    pub success: bool,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Record one LLM call
pub fn record_llm_call(params: LlmCallMetricParams) {
    let labels = [
        ("provider", params.provider.to_string()),
        ("component", params.component.to_string()),
        ("status", status_label(params.success)),
    ];

    counter!("rag_llm_calls_total", &labels).increment(1);
    histogram!("rag_llm_call_duration_seconds", &labels).record(params.duration.as_secs_f64());

    if let Some(tokens) = params.prompt_tokens {
        counter!("rag_llm_prompt_tokens_total", &labels).increment(tokens);
    }
    if let Some(tokens) = params.completion_tokens {
        counter!("rag_llm_completion_tokens_total", &labels).increment(tokens);
    }
}

/// Record one query-engine call
pub fn record_query(engine: &str, duration: Duration, success: bool) {
    let labels = [
        ("engine", engine.to_string()),
        ("status", status_label(success)),
    ];

    counter!("rag_queries_total", &labels).increment(1);
    histogram!("rag_query_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record one retrieval and how many nodes it returned
pub fn record_retrieval(retriever: &str, duration: Duration, nodes: usize) {
    let labels = [("retriever", retriever.to_string())];

    counter!("rag_retrievals_total", &labels).increment(1);
    histogram!("rag_retrieval_duration_seconds", &labels).record(duration.as_secs_f64());
    histogram!("rag_retrieved_nodes", &labels).record(nodes as f64);
}

/// Record a retry scheduled after a failed attempt
pub fn record_retry_attempt(engine: &str) {
    counter!("rag_retry_attempts_total", "engine" => engine.to_string()).increment(1);
}

/// Record one agent reasoning step; `outcome` is `tool_call`, `answer` or `max_steps`
pub fn record_agent_step(outcome: &str) {
    counter!("rag_agent_steps_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a sub-question whose answer was discarded
pub fn record_subquestion_dropped(reason: &str) {
    counter!("rag_subquestions_dropped_total", "reason" => reason.to_string()).increment(1);
}

fn status_label(success: bool) -> String {
    if success { "success" } else { "error" }.to_string()
}
