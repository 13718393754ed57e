//! Library configuration

mod app_config;

pub use app_config::{
    AgentSettings, LogFormat, LoggingConfig, RagConfig, RetrieverSettings, RetrySettings,
    SelectorSettings, SplitterSettings, SynthesizerSettings,
};
