//! Prompt-injection round trips: prompt rendering, tolerant parsing, continuation.

use ai_tool_bridge::adapters::tags::render_tool_calls;
use ai_tool_bridge::types::{ChatCompletion, CompletionMessage};
use ai_tool_bridge::{
    PromptInjectionAdapter, RawResponse, ToolAdapter, ToolDescriptor, ToolInvocation, ToolResult,
};
use serde_json::json;

fn tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "search_docs",
            "Full-text search over the documentation",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search terms"},
                    "limit": {"type": "integer", "description": "Maximum hits"}
                },
                "required": ["query"]
            }),
        )
        .with_example(json!({"query": "install"})),
        ToolDescriptor::new("current_time", "", json!({"type": "object", "properties": {}})),
    ]
}

#[test]
fn test_prompt_lists_every_tool() {
    let adapter = PromptInjectionAdapter::new();
    let prompt = adapter.format_tools_for_prompt(&tools(), "How do I install it?");

    assert!(prompt.contains("### 1. search_docs"));
    assert!(prompt.contains("  - `query` (string, required): Search terms"));
    assert!(prompt.contains("  - `limit` (integer, optional): Maximum hits"));
    assert!(prompt.contains(r#"**Example**: {"query":"install"}"#));
    assert!(prompt.contains("### 2. current_time"));
    assert!(prompt.contains("**Description**: No description"));
    assert!(prompt.contains("User question: How do I install it?"));
    assert!(prompt.find("## Available tools") < prompt.find("## Rules"));
}

#[test]
fn test_prompt_without_tools_is_the_message() {
    let adapter = PromptInjectionAdapter::new();
    assert_eq!(adapter.format_tools_for_prompt(&[], "hi"), "hi");
}

#[test]
fn test_broken_entries_do_not_sink_siblings() {
    let reply = "I'll look this up.\n\
        <tool_calls>\n\
        <tool_call><tool_name>search_docs</tool_name><arguments>{\"query\": \"install\"}</arguments></tool_call>\n\
        <tool_call><tool_name>search_docs</tool_name><arguments>not json at all</arguments></tool_call>\n\
        <tool_call><tool_name>search_docs</tool_name><arguments>[1, 2]</arguments></tool_call>\n\
        <tool_call><arguments>{}</arguments></tool_call>\n\
        <tool_call><tool_name>current_time</tool_name><arguments>{\"tz\": \"UTC\"</arguments></tool_call>\n\
        </tool_calls>";
    let result = PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from(reply));

    assert!(result.has_calls);
    assert!(result.needs_continuation);
    assert_eq!(result.raw_response, reply);
    assert_eq!(result.invocations.len(), 2);
    assert_eq!(result.invocations[0].id, "call_0");
    assert_eq!(result.invocations[0].arguments(), r#"{"query":"install"}"#);
    assert_eq!(result.invocations[1].id, "call_1");
    assert_eq!(result.invocations[1].name(), "current_time");
    assert_eq!(result.invocations[1].arguments(), r#"{"tz":"UTC"}"#);
}

#[test]
fn test_tags_match_any_case() {
    let reply = "<TOOL_CALLS>\n<Tool_Call>\n<Tool_Name> current_time </Tool_Name>\n\
                 <ARGUMENTS>{}</ARGUMENTS>\n</Tool_Call>\n</TOOL_CALLS>";
    let result = PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from(reply));
    assert_eq!(result.invocations.len(), 1);
    assert_eq!(result.invocations[0].name(), "current_time");
}

#[test]
fn test_plain_answer_has_no_calls() {
    let result =
        PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from("It is 3pm in Paris."));
    assert!(!result.has_calls);
    assert!(!result.needs_continuation);
    assert!(result.invocations.is_empty());
    assert_eq!(result.raw_response, "It is 3pm in Paris.");
}

#[test]
fn test_block_with_only_broken_entries() {
    let reply = "<tool_calls><tool_call><tool_name>x</tool_name><arguments>???</arguments></tool_call></tool_calls>";
    let result = PromptInjectionAdapter::new().parse_tool_calls(&RawResponse::from(reply));
    assert!(!result.has_calls);
    assert_eq!(result.raw_response, reply);
}

#[test]
fn test_reads_text_from_any_envelope() {
    let calls = vec![ToolInvocation::function("call_0", "current_time", "{}")];
    let text = render_tool_calls(&calls);
    let adapter = PromptInjectionAdapter::new();

    let mapping = RawResponse::from(json!({"choices": [{"message": {"content": text.clone()}}]}));
    let typed = RawResponse::from(ChatCompletion::with_message(CompletionMessage::text(text.clone())));
    for response in [mapping, typed] {
        let result = adapter.parse_tool_calls(&response);
        assert_eq!(result.invocations, calls);
        assert_eq!(result.raw_response, text);
    }
}

#[test]
fn test_continuation_replays_calls_and_results() {
    let adapter = PromptInjectionAdapter::new();
    let calls = vec![
        ToolInvocation::function("call_0", "search_docs", r#"{"query":"install"}"#),
        ToolInvocation::function("call_1", "current_time", "{}"),
    ];
    let reply = format!("Checking.\n{}\nOne moment.", render_tool_calls(&calls));
    let results = vec![
        ToolResult::success("call_0", "search_docs", r#"{"hits":1}"#),
        ToolResult::failure("call_1", "current_time", "clock unavailable"),
    ];

    let prompt = adapter.build_continuation_prompt("How do I install it?", &reply, &results);
    assert!(prompt.contains("Original question: How do I install it?"));
    assert!(prompt.contains(&render_tool_calls(&calls)));
    assert!(!prompt.contains("One moment."));
    assert!(prompt.contains("1. search_docs - ✅\n```\n{\n  \"hits\": 1\n}\n```"));
    assert!(prompt.contains("2. current_time - ❌\nError: clock unavailable"));

    let no_calls = adapter.build_continuation_prompt("q", "plain answer", &[]);
    assert!(no_calls.contains("(no tool calls found)"));
}
