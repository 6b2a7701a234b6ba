//! Native function-calling strategy.
//!
//! Tools travel as API parameters and the provider answers with a structured
//! `tool_calls` list. The only work here is normalizing that list, whichever
//! envelope it arrived in, and building the follow-up message history.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{AdapterVariant, ToolAdapter};
use crate::repair::repair_json;
use crate::types::{
    ChatMessage, CompletionMessage, RawResponse, ToolCallResult, ToolDescriptor, ToolInvocation,
    ToolResult,
};

const EMPTY_ARGUMENTS: &str = "{}";

/// Adapter for endpoints with working native tool calling.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionCallingAdapter;

impl FunctionCallingAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Descriptors in the OpenAI `tools` parameter shape.
    pub fn tools_for_api(&self, tools: &[ToolDescriptor]) -> Vec<Value> {
        tools.iter().map(ToolDescriptor::to_openai_tool).collect()
    }

    /// Extend a conversation with the assistant's tool calls and one tool-role
    /// message per result.
    pub fn build_messages_with_tool_results(
        &self,
        messages: &[ChatMessage],
        tool_calls: &[ToolInvocation],
        tool_results: &[ToolResult],
    ) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(messages.len() + 1 + tool_results.len());
        out.extend_from_slice(messages);
        out.push(ChatMessage::assistant_tool_calls(tool_calls.to_vec()));
        out.extend(
            tool_results
                .iter()
                .map(|r| ChatMessage::tool(&r.tool_call_id, &r.name, &r.content)),
        );
        out
    }

    fn parse_mapping(&self, message: &Map<String, Value>) -> ToolCallResult {
        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut invocations = Vec::new();
        match message.get("tool_calls").and_then(Value::as_array) {
            Some(entries) => {
                for entry in entries {
                    if let Some(inv) = normalize_mapping_entry(entry, invocations.len()) {
                        invocations.push(inv);
                    }
                }
            }
            None => {
                if let Some(call) = message.get("function_call") {
                    let entry = serde_json::json!({ "function": call });
                    invocations.extend(normalize_mapping_entry(&entry, 0));
                }
            }
        }
        finish(invocations, content)
    }

    fn parse_completion(&self, message: &CompletionMessage) -> ToolCallResult {
        let mut invocations: Vec<ToolInvocation> = Vec::new();
        for call in message.tool_calls() {
            if call.function.name.trim().is_empty() {
                warn!(id = %call.id, "dropping native tool call without a function name");
                continue;
            }
            let Some(arguments) = normalize_argument_text(&call.function.arguments) else {
                continue;
            };
            let id = if call.id.is_empty() {
                ToolInvocation::synthetic_id(invocations.len())
            } else {
                call.id.clone()
            };
            invocations.push(ToolInvocation::function(
                id,
                call.function.name.trim(),
                arguments,
            ));
        }
        if message.tool_calls.is_none() {
            if let Some(call) = message.function_call.as_ref().filter(|c| !c.name.is_empty()) {
                if let Some(arguments) = normalize_argument_text(&call.arguments) {
                    invocations.push(ToolInvocation::function(
                        ToolInvocation::synthetic_id(0),
                        call.name.as_str(),
                        arguments,
                    ));
                }
            }
        }
        finish(invocations, message.content())
    }
}

fn finish(invocations: Vec<ToolInvocation>, content: &str) -> ToolCallResult {
    if !invocations.is_empty() {
        info!(count = invocations.len(), "parsed native tool calls");
        for inv in &invocations {
            debug!(id = %inv.id, tool = %inv.name(), "native tool call");
        }
    }
    ToolCallResult::from_invocations(invocations, content)
}

/// Normalize one `tool_calls` entry; `index` is its position among surviving entries.
fn normalize_mapping_entry(entry: &Value, index: usize) -> Option<ToolInvocation> {
    let function = entry.get("function");
    let name = function
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let Some(name) = name else {
        warn!(entry = %entry, "dropping native tool call without a function name");
        return None;
    };

    let id = entry
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ToolInvocation::synthetic_id(index));

    let arguments = match function.and_then(|f| f.get("arguments")) {
        Some(Value::String(s)) => normalize_argument_text(s)?,
        None | Some(Value::Null) => EMPTY_ARGUMENTS.to_string(),
        Some(object @ Value::Object(_)) => object.to_string(),
        Some(other) => {
            warn!(tool = %name, arguments = %other, "native tool arguments are not an object");
            return None;
        }
    };
    Some(ToolInvocation::function(id, name, arguments))
}

/// Repaired argument text, or `None` when it does not hold a JSON object.
fn normalize_argument_text(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return Some(EMPTY_ARGUMENTS.to_string());
    }
    let repaired = repair_json(raw);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(_)) => Some(repaired.into_owned()),
        Ok(other) => {
            warn!(arguments = %other, "native tool arguments are not an object");
            None
        }
        Err(e) => {
            warn!(error = %e, "failed to parse native tool arguments");
            None
        }
    }
}

impl ToolAdapter for FunctionCallingAdapter {
    fn variant(&self) -> AdapterVariant {
        AdapterVariant::FunctionCalling
    }

    fn format_tools_for_prompt(&self, _tools: &[ToolDescriptor], user_message: &str) -> String {
        user_message.to_string()
    }

    fn parse_tool_calls(&self, response: &RawResponse) -> ToolCallResult {
        match response {
            RawResponse::Json(Value::Object(_)) => match response.first_message_json() {
                Some(message) => self.parse_mapping(message),
                None => ToolCallResult::text_only(""),
            },
            RawResponse::Completion(completion) => match completion.first_message() {
                Some(message) => self.parse_completion(message),
                None => ToolCallResult::text_only(""),
            },
            other => ToolCallResult::text_only(other.text_content()),
        }
    }

    fn build_continuation_prompt(
        &self,
        original_message: &str,
        _model_response: &str,
        tool_results: &[ToolResult],
    ) -> String {
        let results = tool_results
            .iter()
            .map(|r| format!("{} result:\n{}", r.name, r.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "{original_message}\n\nTool results:\n{results}\n\n\
             Please answer the user's question based on the tool results above."
        )
    }
}
