//! Reads tool requests and answers out of free-form LLM replies

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::domain::agent::ReasoningStep;
use crate::infrastructure::synthesizer::extract_json;

static THOUGHT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*Thought:\s*(.+?)\s*$").expect("thought regex is valid"));
static ACTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*Action:\s*(.+?)\s*$").expect("action regex is valid"));
static ACTION_INPUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)Action Input:\s*(.*)$").expect("action input regex is valid"));
static ANSWER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?smi)^\s*Answer:\s*(.*)$").expect("answer regex is valid"));
static TOOL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*TOOL:\s*(.+?)\s*$").expect("tool regex is valid"));
static INPUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?smi)^\s*INPUT:\s*(.*)$").expect("input regex is valid"));

const TOOL_KEYS: &[&str] = &["tool", "tool_name", "action"];
const INPUT_KEYS: &[&str] = &["input", "tool_input", "action_input", "arguments"];

/// Interprets one LLM reply.
///
/// Tried in order: the `Action:` / `Answer:` format, a JSON object naming a
/// tool, the `TOOL:` / `INPUT:` format, and finally the whole reply as the
/// answer. Never fails.
pub fn parse_reasoning_step(output: &str) -> ReasoningStep {
    let thought = THOUGHT_PATTERN
        .captures(output)
        .map(|caps| caps[1].to_string());

    if let Some(step) = parse_react(output, thought.clone()) {
        return step;
    }
    if let Some(step) = parse_json_action(output, thought.clone()) {
        return step;
    }
    if let Some(step) = parse_tool_input(output, thought.clone()) {
        return step;
    }

    ReasoningStep::Answer {
        thought,
        answer: output.trim().to_string(),
    }
}

fn parse_json_action(output: &str, thought: Option<String>) -> Option<ReasoningStep> {
    let json = extract_json(output)?;
    let Value::Object(object) = serde_json::from_str::<Value>(json).ok()? else {
        return None;
    };

    if let Some(tool_name) = first_str(&object, TOOL_KEYS) {
        let input = INPUT_KEYS
            .iter()
            .find_map(|key| object.get(*key))
            .map(tool_input)
            .unwrap_or_else(|| json!({}));
        return Some(ReasoningStep::Action {
            thought,
            tool_name: tool_name.to_string(),
            input,
        });
    }

    first_str(&object, &["answer", "response"]).map(|answer| ReasoningStep::Answer {
        thought,
        answer: answer.to_string(),
    })
}

fn parse_react(output: &str, thought: Option<String>) -> Option<ReasoningStep> {
    let action = ACTION_PATTERN.captures(output);
    let answer = ANSWER_PATTERN.captures(output);

    let action_first = match (&action, &answer) {
        (Some(a), Some(b)) => a.get(0)?.start() < b.get(0)?.start(),
        (Some(_), None) => true,
        _ => false,
    };

    if action_first {
        let tool_name = action?[1].to_string();
        let input = ACTION_INPUT_PATTERN
            .captures(output)
            .map(|caps| text_input(&caps[1]))
            .unwrap_or_else(|| json!({}));
        return Some(ReasoningStep::Action {
            thought,
            tool_name,
            input,
        });
    }

    answer.map(|caps| ReasoningStep::Answer {
        thought,
        answer: caps[1].trim().to_string(),
    })
}

fn parse_tool_input(output: &str, thought: Option<String>) -> Option<ReasoningStep> {
    let tool_name = TOOL_PATTERN.captures(output)?[1].to_string();
    let input = INPUT_PATTERN
        .captures(output)
        .map(|caps| text_input(&caps[1]))
        .unwrap_or_else(|| json!({}));

    Some(ReasoningStep::Action {
        thought,
        tool_name,
        input,
    })
}

fn first_str<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .and_then(Value::as_str)
}

/// Objects pass through; anything else becomes `{"input": ...}`
fn tool_input(value: &Value) -> Value {
    match value {
        Value::Object(_) => value.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => json!({ "input": s }),
        },
        other => json!({ "input": other }),
    }
}

fn text_input(raw: &str) -> Value {
    let raw = raw.trim();
    match extract_json(raw).and_then(|json| serde_json::from_str::<Value>(json).ok()) {
        Some(value @ Value::Object(_)) => value,
        _ => json!({ "input": raw }),
    }
}
