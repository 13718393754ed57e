//! Instrumented LLM calls shared by every LLM-backed component

use std::time::Instant;

use tracing::debug;

use crate::domain::llm::{LlmProvider, LlmRequest, LlmResponse, TextStream, Usage};
use crate::domain::{DomainError, QueryContext};
use crate::infrastructure::observability::{record_llm_call, LlmCallMetricParams};

/// Completes `prompt`, racing the call against cancellation and recording metrics
pub async fn predict(
    llm: &dyn LlmProvider,
    ctx: &QueryContext,
    component: &str,
    prompt: &str,
) -> Result<String, DomainError> {
    let started = Instant::now();
    let result = ctx.run(llm.complete(ctx, prompt)).await;
    finish(llm, component, started, result.is_ok(), None);

    debug!(
        component,
        provider = llm.provider_name(),
        prompt_len = prompt.len(),
        ok = result.is_ok(),
        "LLM completion"
    );
    result
}

/// Full chat round trip; reported token usage is recorded
pub async fn predict_chat(
    llm: &dyn LlmProvider,
    ctx: &QueryContext,
    component: &str,
    request: LlmRequest,
) -> Result<LlmResponse, DomainError> {
    let started = Instant::now();
    let result = ctx.run(llm.chat(ctx, request)).await;
    let usage = result.as_ref().ok().and_then(|response| response.usage);
    finish(llm, component, started, result.is_ok(), usage);
    result
}

/// Opens a completion stream; metrics cover only the time to open it
pub async fn stream_predict(
    llm: &dyn LlmProvider,
    ctx: &QueryContext,
    component: &str,
    prompt: &str,
) -> Result<TextStream, DomainError> {
    let started = Instant::now();
    let result = ctx.run(llm.stream_complete(ctx, prompt)).await;
    finish(llm, component, started, result.is_ok(), None);
    result
}

fn finish(
    llm: &dyn LlmProvider,
    component: &str,
    started: Instant,
    success: bool,
    usage: Option<Usage>,
) {
    record_llm_call(LlmCallMetricParams {
        provider: llm.provider_name(),
        component,
        duration: started.elapsed(),
        success,
        prompt_tokens: usage.map(|u| u64::from(u.prompt_tokens)),
        completion_tokens: usage.map(|u| u64::from(u.completion_tokens)),
    });
}
