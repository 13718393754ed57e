//! Metrics configuration

use serde::Deserialize;

/// Prometheus metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Service label attached to the info gauge
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_true() -> bool {
    true
}

fn default_service_name() -> String {
    "pmp-rag".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: default_service_name(),
        }
    }
}
