//! Prompt-injection strategy for endpoints without native tool calling.
//!
//! The tool catalog and a tag grammar are written into the prompt; the model's
//! reply is scanned for a `<tool_calls>` block. Parsing is tolerant: a broken
//! entry is dropped and its siblings survive.

use std::fmt::Write as _;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::tags;
use super::{AdapterVariant, ToolAdapter};
use crate::repair::{repair_json_with_stage, RepairStage};
use crate::types::{RawResponse, ToolCallResult, ToolDescriptor, ToolInvocation, ToolResult};

const NO_TOOL_CALLS_PLACEHOLDER: &str = "(no tool calls found)";

/// Adapter that encodes tools as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInjectionAdapter;

impl PromptInjectionAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Numbered catalog section for each descriptor.
    pub fn format_tool_catalog(&self, tools: &[ToolDescriptor]) -> String {
        let mut out = String::new();
        for (i, tool) in tools.iter().enumerate() {
            let description = if tool.description.trim().is_empty() {
                "No description"
            } else {
                tool.description.as_str()
            };
            let _ = writeln!(out, "### {}. {}", i + 1, tool.name);
            let _ = writeln!(out, "**Description**: {description}");
            out.push('\n');

            if let Some(properties) = tool.properties() {
                out.push_str("**Parameters**:\n");
                for (param, info) in properties {
                    let param_type = info.get("type").and_then(Value::as_str).unwrap_or("string");
                    let param_desc = info
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let requirement = if tool.is_required(param) {
                        "required"
                    } else {
                        "optional"
                    };
                    let _ = writeln!(
                        out,
                        "  - `{param}` ({param_type}, {requirement}): {param_desc}"
                    );
                }
                out.push('\n');
            }

            if let Some(example) = &tool.example {
                let _ = writeln!(out, "**Example**: {example}");
                out.push('\n');
            }
        }
        out.trim_end().to_string()
    }

    fn format_tool_results(&self, tool_results: &[ToolResult]) -> String {
        let mut out = String::new();
        for (i, result) in tool_results.iter().enumerate() {
            let status = if result.success { "✅" } else { "❌" };
            let _ = writeln!(out, "{}. {} - {}", i + 1, result.name, status);
            if result.success {
                let content = serde_json::from_str::<Value>(&result.content)
                    .ok()
                    .and_then(|v| serde_json::to_string_pretty(&v).ok())
                    .unwrap_or_else(|| result.content.clone());
                let _ = writeln!(out, "```\n{content}\n```");
            } else {
                let error = result.error.as_deref().unwrap_or("unknown error");
                let _ = writeln!(out, "Error: {error}");
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

fn parse_entry(body: &str, index: usize) -> Option<ToolInvocation> {
    let (Some(name), Some((raw_args, rest))) =
        (tags::tool_name(body), tags::arguments_with_rest(body))
    else {
        debug!("skipping tool call without name or arguments tag");
        return None;
    };
    if name.is_empty() {
        debug!("skipping tool call with empty name");
        return None;
    }
    let repaired = repair_json_with_stage(raw_args);
    // A truncated body followed by more call text was cut at a literal closing
    // tag inside a string; closing it would invent a different value.
    if matches!(
        repaired.stage,
        RepairStage::CloseUnterminated | RepairStage::DropIncompleteTail
    ) && tags::has_trailing_content(rest)
    {
        warn!(tool = %name, "tool arguments end early at an embedded closing tag");
        return None;
    }
    let arguments = match serde_json::from_str::<Value>(&repaired.text) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!(tool = %name, kind = json_kind(&other), "tool arguments are not an object");
            return None;
        }
        Err(e) => {
            warn!(tool = %name, error = %e, "failed to parse tool arguments");
            return None;
        }
    };
    debug!(tool = %name, "parsed tool call");
    Some(ToolInvocation::function(
        ToolInvocation::synthetic_id(index),
        name,
        arguments.to_string(),
    ))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ToolAdapter for PromptInjectionAdapter {
    fn variant(&self) -> AdapterVariant {
        AdapterVariant::PromptInjection
    }

    fn format_tools_for_prompt(&self, tools: &[ToolDescriptor], user_message: &str) -> String {
        if tools.is_empty() {
            return user_message.to_string();
        }
        let catalog = self.format_tool_catalog(tools);
        format!(
            "You can use the following tools to help answer the user's question.\n\
             \n\
             ## Available tools\n\
             \n\
             {catalog}\n\
             \n\
             ## How to call tools\n\
             \n\
             When you need a tool, output the call in exactly this format \
             (several <tool_call> blocks may appear inside one <tool_calls> block):\n\
             \n\
             <tool_calls>\n\
             <tool_call>\n\
             <tool_name>tool name</tool_name>\n\
             <arguments>\n\
             {{\n  \"param1\": \"value1\",\n  \"param2\": \"value2\"\n}}\n\
             </arguments>\n\
             </tool_call>\n\
             </tool_calls>\n\
             \n\
             ## Rules\n\
             \n\
             1. Only call a tool when it is actually needed.\n\
             2. The arguments must be valid JSON.\n\
             3. Check that the arguments match what the tool expects.\n\
             4. One <tool_calls> block may contain several <tool_call> blocks.\n\
             5. After calling tools you will receive their results and should continue from them.\n\
             \n\
             ---\n\
             \n\
             User question: {user_message}\n\
             \n\
             Decide whether a tool is needed. If it is, output the tool calls first and wait \
             for the results. If it is not, answer the question directly."
        )
    }

    fn parse_tool_calls(&self, response: &RawResponse) -> ToolCallResult {
        let text = response.text_content();
        let Some(block) = tags::find_tool_calls_block(&text) else {
            return ToolCallResult::text_only(text);
        };

        let mut invocations = Vec::new();
        for body in tags::tool_call_bodies(block.inner) {
            if let Some(inv) = parse_entry(body, invocations.len()) {
                invocations.push(inv);
            }
        }
        if !invocations.is_empty() {
            info!(count = invocations.len(), "parsed tagged tool calls");
        }
        ToolCallResult::from_invocations(invocations, text)
    }

    fn build_continuation_prompt(
        &self,
        original_message: &str,
        model_response: &str,
        tool_results: &[ToolResult],
    ) -> String {
        let calls = tags::find_tool_calls_block(model_response)
            .map(|b| b.verbatim)
            .unwrap_or(NO_TOOL_CALLS_PLACEHOLDER);
        let results = self.format_tool_results(tool_results);
        format!(
            "You previously tried to use tools to answer the user's question.\n\
             \n\
             Original question: {original_message}\n\
             \n\
             Your tool calls:\n\
             {calls}\n\
             \n\
             Tool results:\n\
             {results}\n\
             \n\
             Now give a complete answer based on these results. Do not call the tools \
             again; use the results you already have."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_tool() -> ToolDescriptor {
        ToolDescriptor::new(
            "get_weather",
            "Get current weather",
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string", "description": "City name"},
                    "days": {"type": "integer"}
                },
                "required": ["city"]
            }),
        )
        .with_example(json!({"city": "Paris"}))
    }

    #[test]
    fn test_empty_tools_returns_message() {
        let adapter = PromptInjectionAdapter::new();
        assert_eq!(adapter.format_tools_for_prompt(&[], "hi"), "hi");
    }

    #[test]
    fn test_catalog_rendering() {
        let catalog = PromptInjectionAdapter::new().format_tool_catalog(&[
            weather_tool(),
            ToolDescriptor::new("ping", "", Value::Null),
        ]);
        assert!(catalog.contains("### 1. get_weather"));
        assert!(catalog.contains("**Description**: Get current weather"));
        assert!(catalog.contains("  - `city` (string, required): City name"));
        assert!(catalog.contains("  - `days` (integer, optional): "));
        assert!(catalog.contains("**Example**: {\"city\":\"Paris\"}"));
        assert!(catalog.contains("### 2. ping\n**Description**: No description"));
    }

    #[test]
    fn test_prompt_carries_grammar_and_message() {
        let prompt =
            PromptInjectionAdapter::new().format_tools_for_prompt(&[weather_tool()], "Weather in Oslo?");
        assert!(prompt.contains("<tool_calls>\n<tool_call>\n<tool_name>"));
        assert!(prompt.contains("</arguments>\n</tool_call>\n</tool_calls>"));
        assert!(prompt.contains("User question: Weather in Oslo?"));
        assert!(prompt.contains("answer the question directly"));
    }

    #[test]
    fn test_parse_skips_bad_entries() {
        let text = "Let me check.\n<tool_calls>\n\
            <tool_call><tool_name>a</tool_name><arguments>{\"x\": 1}</arguments></tool_call>\n\
            <tool_call><tool_name>broken</tool_name><arguments>{nope}</arguments></tool_call>\n\
            <tool_call><tool_name>b</tool_name><arguments>{\"y\": \"z\"}</arguments></tool_call>\n\
            <tool_call><arguments>{}</arguments></tool_call>\n\
            </tool_calls>";
        let result = PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from(text));
        assert!(result.has_calls);
        assert_eq!(result.invocations.len(), 2);
        assert_eq!(result.invocations[0].id, "call_0");
        assert_eq!(result.invocations[0].name(), "a");
        assert_eq!(result.invocations[1].id, "call_1");
        assert_eq!(result.invocations[1].name(), "b");
        assert_eq!(result.invocations[1].arguments(), "{\"y\":\"z\"}");
        assert_eq!(result.raw_response, text);
    }

    #[test]
    fn test_parse_repairs_arguments() {
        let text = "<tool_calls><tool_call><tool_name>s</tool_name>\
            <arguments>```json\n{\"q\": \"rust\",}\n```</arguments></tool_call></tool_calls>";
        let result = PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from(text));
        assert_eq!(result.invocations[0].arguments(), "{\"q\":\"rust\"}");
    }

    #[test]
    fn test_closing_tag_inside_argument_string() {
        let text = "<tool_calls>\n\
            <tool_call><tool_name>search</tool_name>\
            <arguments>{\"q\": \"</arguments> inside\"}</arguments></tool_call>\n\
            <tool_call><tool_name>ok</tool_name><arguments>{\"a\": 1}</arguments></tool_call>\n\
            </tool_calls>";
        let result = PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from(text));
        assert_eq!(result.invocations.len(), 1);
        assert_eq!(result.invocations[0].id, "call_0");
        assert_eq!(result.invocations[0].name(), "ok");
    }

    #[test]
    fn test_truncated_arguments_at_end_of_call_are_closed() {
        let text = "<tool_calls><tool_call><tool_name>s</tool_name>\
            <arguments>{\"q\": \"rust</arguments>\n</tool_call></tool_calls>";
        let result = PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from(text));
        assert_eq!(result.invocations.len(), 1);
        assert_eq!(result.invocations[0].arguments(), "{\"q\":\"rust\"}");
    }

    #[test]
    fn test_non_object_arguments_are_skipped() {
        let text = "<tool_calls><tool_call><tool_name>s</tool_name>\
            <arguments>[1, 2]</arguments></tool_call></tool_calls>";
        let result = PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from(text));
        assert!(!result.has_calls);
    }

    #[test]
    fn test_parse_without_block() {
        let result =
            PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from("The answer is 4."));
        assert!(!result.has_calls);
        assert!(!result.needs_continuation);
        assert_eq!(result.raw_response, "The answer is 4.");
    }

    #[test]
    fn test_parse_mapping_response() {
        let r = RawResponse::from(json!({"choices": [{"message": {"content":
            "<tool_calls><tool_call><tool_name>t</tool_name><arguments>{}</arguments></tool_call></tool_calls>"
        }}]}));
        let result = PromptInjectionAdapter::new().parse_tool_calls(&r);
        assert_eq!(result.invocations.len(), 1);
        assert_eq!(result.invocations[0].arguments(), "{}");
    }

    #[test]
    fn test_continuation_prompt() {
        let model_response = "Sure.\n<tool_calls><tool_call><tool_name>w</tool_name>\
            <arguments>{}</arguments></tool_call></tool_calls>\nwaiting";
        let prompt = PromptInjectionAdapter::new().build_continuation_prompt(
            "Weather?",
            model_response,
            &[
                ToolResult::success("call_0", "w", "{\"temp\":21}"),
                ToolResult::failure("call_1", "x", "timeout"),
                ToolResult::success("call_2", "y", "plain text"),
            ],
        );
        assert!(prompt.contains("Original question: Weather?"));
        assert!(prompt.contains(
            "<tool_calls><tool_call><tool_name>w</tool_name><arguments>{}</arguments></tool_call></tool_calls>"
        ));
        assert!(prompt.contains("1. w - ✅\n```\n{\n  \"temp\": 21\n}\n```"));
        assert!(prompt.contains("2. x - ❌\nError: timeout"));
        assert!(prompt.contains("3. y - ✅\n```\nplain text\n```"));
        assert!(prompt.contains("Do not call the tools again"));
    }

    #[test]
    fn test_continuation_placeholder() {
        let prompt = PromptInjectionAdapter::new().build_continuation_prompt("q", "no calls", &[]);
        assert!(prompt.contains("Your tool calls:\n(no tool calls found)"));
    }
}
