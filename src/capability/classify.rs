//! Probe response classification.

use crate::types::RawResponse;

/// Whether a probe response carries a native tool-call field.
///
/// Presence is what counts: a mapping message with a `tool_calls` or legacy
/// `function_call` key qualifies even if the value is empty. Text never does.
pub fn is_native_tool_response(response: &RawResponse) -> bool {
    match response {
        RawResponse::Json(_) => response
            .first_message_json()
            .map(|m| m.contains_key("tool_calls") || m.contains_key("function_call"))
            .unwrap_or(false),
        RawResponse::Completion(c) => c
            .first_message()
            .map(|m| m.tool_calls.is_some() || m.function_call.is_some())
            .unwrap_or(false),
        RawResponse::Text(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatCompletion, CompletionMessage, FunctionCall};
    use serde_json::json;

    #[test]
    fn test_mapping_shape() {
        let yes = RawResponse::from(json!({"choices": [{"message": {"tool_calls": []}}]}));
        let legacy = RawResponse::from(json!({
            "choices": [{"message": {"function_call": {"name": "f", "arguments": "{}"}}}]
        }));
        let no = RawResponse::from(json!({"choices": [{"message": {"content": "hi"}}]}));
        assert!(is_native_tool_response(&yes));
        assert!(is_native_tool_response(&legacy));
        assert!(!is_native_tool_response(&no));
        assert!(!is_native_tool_response(&RawResponse::from(json!({"choices": []}))));
    }

    #[test]
    fn test_typed_shape() {
        let plain = ChatCompletion::with_message(CompletionMessage::text("hi"));
        assert!(!is_native_tool_response(&plain.into()));

        let legacy = ChatCompletion::with_message(CompletionMessage {
            function_call: Some(FunctionCall {
                name: "f".into(),
                arguments: "{}".into(),
            }),
            ..Default::default()
        });
        assert!(is_native_tool_response(&legacy.into()));
    }

    #[test]
    fn test_text_is_never_native() {
        assert!(!is_native_tool_response(&RawResponse::from("tool_calls")));
    }
}
