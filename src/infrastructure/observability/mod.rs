//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    init_metrics, record_agent_step, record_llm_call, record_query, record_retrieval,
    record_retry_attempt, record_subquestion_dropped, LlmCallMetricParams, PrometheusMetrics,
};
