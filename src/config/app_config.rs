use std::time::Duration;

use serde::Deserialize;

use crate::domain::splitter::ChunkingConfig;
use crate::domain::synthesizer::ResponseMode;
use crate::domain::DomainError;
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::splitter::{DEFAULT_PARAGRAPH_SEPARATOR, DEFAULT_SECONDARY_REGEX};
use crate::infrastructure::synthesizer::DEFAULT_ACCUMULATE_SEPARATOR;

/// Top-level configuration for building pipelines
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RagConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub splitter: SplitterSettings,
    #[serde(default)]
    pub synthesizer: SynthesizerSettings,
    #[serde(default)]
    pub retriever: RetrieverSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub selector: SelectorSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitterSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub paragraph_separator: String,
    pub secondary_regex: String,
    /// Sentences on each side for the sentence-window splitter
    pub window_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesizerSettings {
    pub response_mode: ResponseMode,
    /// Compaction budget, measured by the synthesizer's tokenizer
    pub compact_size: usize,
    /// Run independent LLM calls concurrently
    pub use_async: bool,
    pub streaming: bool,
    /// Separator between accumulated answers
    pub accumulate_separator: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrieverSettings {
    pub top_k: usize,
    /// Weight of the first retriever in a two-way hybrid
    pub hybrid_alpha: f32,
    pub bm25_k1: f32,
    pub bm25_b: f32,
    /// Per-hour decay for the time-weighted retriever
    pub decay_rate: f32,
    pub kg_depth: usize,
    pub kg_max_keywords: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub delay_ms: u64,
    /// Wrap the final error in `MaxRetriesExceeded`
    pub wrap_errors: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub verbose: bool,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorSettings {
    /// Upper bound for multi-selection
    pub max_outputs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for SplitterSettings {
    fn default() -> Self {
        let chunking = ChunkingConfig::default();
        Self {
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.chunk_overlap,
            paragraph_separator: DEFAULT_PARAGRAPH_SEPARATOR.to_string(),
            secondary_regex: DEFAULT_SECONDARY_REGEX.to_string(),
            window_size: 3,
        }
    }
}

impl Default for SynthesizerSettings {
    fn default() -> Self {
        Self {
            response_mode: ResponseMode::default(),
            compact_size: 4096,
            use_async: false,
            streaming: false,
            accumulate_separator: DEFAULT_ACCUMULATE_SEPARATOR.to_string(),
        }
    }
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            top_k: 2,
            hybrid_alpha: 0.5,
            bm25_k1: 1.2,
            bm25_b: 0.75,
            decay_rate: 0.01,
            kg_depth: 2,
            kg_max_keywords: 10,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 1000,
            wrap_errors: false,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            verbose: false,
            system_prompt: None,
        }
    }
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self { max_outputs: 3 }
    }
}

impl SplitterSettings {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig::new(self.chunk_size, self.chunk_overlap)
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl RagConfig {
    /// Reads `.env`, `config/default`, `config/local` and `RAG__*` variables, in that order
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("RAG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.splitter.chunking().validate()?;

        if self.synthesizer.compact_size == 0 {
            return Err(DomainError::invalid_config("compact_size must be greater than 0"));
        }
        if self.retriever.top_k == 0 {
            return Err(DomainError::invalid_config("top_k must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.retriever.hybrid_alpha) {
            return Err(DomainError::invalid_config("hybrid_alpha must be in [0, 1]"));
        }
        if !(0.0..1.0).contains(&self.retriever.decay_rate) {
            return Err(DomainError::invalid_config("decay_rate must be in [0, 1)"));
        }
        if self.agent.max_iterations == 0 {
            return Err(DomainError::invalid_config(
                "agent max_iterations must be greater than 0",
            ));
        }
        if self.selector.max_outputs == 0 {
            return Err(DomainError::invalid_config("max_outputs must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.synthesizer.compact_size, 4096);
        assert_eq!(config.retry.delay(), Duration::from_secs(1));
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let mut config = RagConfig::default();
        config.splitter.chunk_overlap = config.splitter.chunk_size;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig { .. }));
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let raw = serde_json::json!({
            "synthesizer": { "response_mode": "tree_summarize", "compact_size": 512, "use_async": true },
            "retry": { "max_retries": 1, "delay_ms": 10, "wrap_errors": true }
        });

        let config: RagConfig = serde_json::from_value(raw).unwrap();

        assert_eq!(config.synthesizer.response_mode, ResponseMode::TreeSummarize);
        assert!(config.retry.wrap_errors);
        assert_eq!(config.retriever.top_k, 2);
    }
}
