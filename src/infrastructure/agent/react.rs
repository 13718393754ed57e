//! ReAct-style tool-using agent

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::output_parser::parse_reasoning_step;
use crate::config::AgentSettings;
use crate::domain::agent::{
    AgentChatResponse, AgentConfig, ChatAgent, ReasoningStep, ToolCallRecord, MAX_STEPS_MESSAGE,
};
use crate::domain::llm::{LlmProvider, LlmRequest, Message};
use crate::domain::prompt::defaults::react_system_prompt;
use crate::domain::tool::{Tool, ToolMetadata, ToolOutput};
use crate::domain::{DomainError, PromptTemplate, QueryContext};
use crate::infrastructure::observability::record_agent_step;
use crate::infrastructure::predict::predict_chat;

const COMPONENT: &str = "react_agent";

/// Outcome of one tool execution
struct Executed {
    output: ToolOutput,
    return_direct: bool,
}

/// Reasons and acts in a loop until the LLM answers without a tool.
///
/// Tool-calling LLMs get the tool list natively and receive results as `tool`
/// messages. Other LLMs get the ReAct protocol in the system prompt and receive
/// results as `Observation:` user messages. Unknown tools and tool failures are
/// reported back to the LLM; only cancellation aborts a turn.
pub struct ReActAgent {
    llm: Arc<dyn LlmProvider>,
    tools: Vec<Arc<dyn Tool>>,
    config: AgentConfig,
    react_template: PromptTemplate,
    history: Mutex<Vec<Message>>,
}

impl ReActAgent {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Vec<Arc<dyn Tool>>,
        config: AgentConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        for (i, tool) in tools.iter().enumerate() {
            let name = &tool.metadata().name;
            if tools[..i].iter().any(|t| &t.metadata().name == name) {
                return Err(DomainError::invalid_config(format!("duplicate tool name '{}'", name)));
            }
        }

        Ok(Self {
            llm,
            tools,
            config,
            react_template: react_system_prompt(),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn from_settings(
        llm: Arc<dyn LlmProvider>,
        tools: Vec<Arc<dyn Tool>>,
        settings: &AgentSettings,
    ) -> Result<Self, DomainError> {
        let mut config = AgentConfig::new(settings.max_iterations).with_verbose(settings.verbose);
        if let Some(prompt) = &settings.system_prompt {
            config = config.with_system_prompt(prompt.clone());
        }
        Self::new(llm, tools, config)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tool_metadata(&self) -> Vec<ToolMetadata> {
        self.tools.iter().map(|t| t.metadata().clone()).collect()
    }

    fn native(&self) -> bool {
        self.llm.supports_tool_calling()
    }

    fn system_message(&self) -> Result<Option<Message>, DomainError> {
        let custom = self.config.system_prompt.as_deref();

        if self.native() {
            return Ok(custom.map(Message::system));
        }

        let tool_desc = self
            .tools
            .iter()
            .map(|t| format!("> {}", t.metadata().to_prompt_line()))
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names = self
            .tools
            .iter()
            .map(|t| t.metadata().name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let protocol = self.react_template.format(&[
            ("tool_desc", tool_desc.as_str()),
            ("tool_names", tool_names.as_str()),
        ])?;

        Ok(Some(Message::system(match custom {
            Some(custom) => format!("{}\n\n{}", custom, protocol),
            None => protocol,
        })))
    }

    fn request(&self, history: &[Message]) -> Result<LlmRequest, DomainError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(system) = self.system_message()? {
            messages.push(system);
        }
        messages.extend_from_slice(history);

        let mut request = LlmRequest::new(messages);
        if self.native() {
            request.tools = self.tool_metadata();
        }
        Ok(request)
    }

    /// Runs a tool; failures become error outputs, cancellation propagates
    async fn execute(
        &self,
        ctx: &QueryContext,
        tool_name: &str,
        input: Value,
    ) -> Result<Executed, DomainError> {
        let Some(tool) = self.tools.iter().find(|t| t.metadata().name == tool_name) else {
            warn!(tool = tool_name, "LLM requested an unknown tool");
            let known = self
                .tools
                .iter()
                .map(|t| t.metadata().name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(Executed {
                output: ToolOutput::error(
                    tool_name,
                    format!("Error: unknown tool '{}'. Available tools: {}", tool_name, known),
                )
                .with_raw_input(input),
                return_direct: false,
            });
        };

        let return_direct = tool.metadata().return_direct;
        let output = match tool.call(ctx, input.clone()).await {
            Ok(output) => output,
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                warn!(tool = tool_name, error = %err, "Tool call failed");
                ToolOutput::error(tool_name, format!("Error: {}", err)).with_raw_input(input.clone())
            }
        };

        if self.config.verbose {
            info!(tool = tool_name, input = %input, output = %output.content, "Tool called");
        } else {
            debug!(tool = tool_name, is_error = output.is_error, "Tool called");
        }

        Ok(Executed {
            return_direct: return_direct && !output.is_error,
            output,
        })
    }

    fn record(tool_name: &str, input: Value, output: &ToolOutput) -> ToolCallRecord {
        ToolCallRecord {
            tool_name: tool_name.to_string(),
            input,
            output: output.content.clone(),
            is_error: output.is_error,
        }
    }

    /// One LLM call plus the tool calls it asks for. `Some` ends the turn.
    async fn step(
        &self,
        ctx: &QueryContext,
        history: &mut Vec<Message>,
        records: &mut Vec<ToolCallRecord>,
    ) -> Result<Option<String>, DomainError> {
        let request = self.request(history)?;
        let response = predict_chat(self.llm.as_ref(), ctx, COMPONENT, request).await?;

        if self.native() {
            let calls = response.tool_calls().to_vec();
            if calls.is_empty() {
                let answer = response.content().to_string();
                history.push(Message::assistant(answer.clone()));
                return Ok(Some(answer));
            }

            history.push(response.message.clone());
            for call in calls {
                let input = call.parsed_arguments();
                let executed = self.execute(ctx, &call.name, input.clone()).await?;
                records.push(Self::record(&call.name, input, &executed.output));
                history.push(Message::tool(call.id.clone(), executed.output.content.clone()));

                if executed.return_direct {
                    history.push(Message::assistant(executed.output.content.clone()));
                    return Ok(Some(executed.output.content));
                }
            }
            return Ok(None);
        }

        let content = response.content().to_string();
        match parse_reasoning_step(&content) {
            ReasoningStep::Answer { answer, .. } => {
                history.push(Message::assistant(content));
                Ok(Some(answer))
            }
            ReasoningStep::Action {
                tool_name, input, ..
            } => {
                history.push(Message::assistant(content));
                let executed = self.execute(ctx, &tool_name, input.clone()).await?;
                records.push(Self::record(&tool_name, input, &executed.output));

                if executed.return_direct {
                    history.push(Message::assistant(executed.output.content.clone()));
                    return Ok(Some(executed.output.content));
                }
                history.push(Message::user(format!("Observation: {}", executed.output.content)));
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for ReActAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReActAgent")
            .field("llm", &self.llm)
            .field("tools", &self.tool_metadata())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatAgent for ReActAgent {
    async fn chat(&self, ctx: &QueryContext, message: &str) -> Result<AgentChatResponse, DomainError> {
        let mut history = self.history.lock().await;
        history.push(Message::user(message));

        let mut records = Vec::new();
        for iteration in 1..=self.config.max_iterations {
            ctx.check()?;

            if let Some(answer) = self.step(ctx, &mut history, &mut records).await? {
                record_agent_step("answer");
                debug!(iteration, tool_calls = records.len(), "Agent answered");
                return Ok(AgentChatResponse {
                    response: answer,
                    tool_calls: records,
                    iterations: iteration,
                    hit_max_iterations: false,
                });
            }
            record_agent_step("tool_call");
        }

        warn!(max_iterations = self.config.max_iterations, "Agent hit the iteration cap");
        record_agent_step("max_steps");
        history.push(Message::assistant(MAX_STEPS_MESSAGE));

        Ok(AgentChatResponse {
            response: MAX_STEPS_MESSAGE.to_string(),
            tool_calls: records,
            iterations: self.config.max_iterations,
            hit_max_iterations: true,
        })
    }

    async fn reset(&self, ctx: &QueryContext) -> Result<(), DomainError> {
        ctx.check()?;
        self.history.lock().await.clear();
        debug!("Agent history reset");
        Ok(())
    }

    async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }
}
