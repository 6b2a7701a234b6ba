//! Raw model responses as handed back by a caller-supplied invoker.
//!
//! Providers reach this crate in two envelope shapes: a nested JSON mapping
//! (`choices[0].message`) straight off the wire, or a typed completion object read
//! through accessors. Plain text is accepted too, for invokers that already
//! unwrapped the content.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tool::FunctionCall;

#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Nested mapping shape, e.g. a decoded chat-completions body.
    Json(Value),
    /// Typed completion object.
    Completion(ChatCompletion),
    /// Bare text.
    Text(String),
}

impl RawResponse {
    /// First choice's message as a JSON mapping (nested-mapping shape only).
    pub fn first_message_json(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            RawResponse::Json(v) => v
                .get("choices")
                .and_then(Value::as_array)
                .and_then(|c| c.first())
                .and_then(|c| c.get("message"))
                .and_then(Value::as_object),
            _ => None,
        }
    }

    /// Text content of the response, whatever its envelope.
    ///
    /// Returns an empty string for an envelope whose message has no content.
    pub fn text_content(&self) -> String {
        match self {
            RawResponse::Text(s) => s.clone(),
            RawResponse::Json(Value::String(s)) => s.clone(),
            RawResponse::Json(Value::Object(_)) => self
                .first_message_json()
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            RawResponse::Json(other) => other.to_string(),
            RawResponse::Completion(c) => c
                .first_message()
                .map(|m| m.content().to_string())
                .unwrap_or_default(),
        }
    }
}

impl From<Value> for RawResponse {
    fn from(v: Value) -> Self {
        RawResponse::Json(v)
    }
}

impl From<ChatCompletion> for RawResponse {
    fn from(c: ChatCompletion) -> Self {
        RawResponse::Completion(c)
    }
}

impl From<String> for RawResponse {
    fn from(s: String) -> Self {
        RawResponse::Text(s)
    }
}

impl From<&str> for RawResponse {
    fn from(s: &str) -> Self {
        RawResponse::Text(s.to_string())
    }
}

/// Typed chat completion object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

impl ChatCompletion {
    /// Single-choice completion carrying `message`.
    pub fn with_message(message: CompletionMessage) -> Self {
        Self {
            choices: vec![CompletionChoice { message }],
        }
    }

    pub fn first_message(&self) -> Option<&CompletionMessage> {
        self.choices.first().map(|c| &c.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<CompletionToolCall>>,
    /// Legacy single-function field.
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

impl CompletionMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn tool_calls(&self) -> &[CompletionToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_content_from_mapping() {
        let r = RawResponse::from(json!({
            "choices": [{"message": {"role": "assistant", "content": "hi"}}]
        }));
        assert_eq!(r.text_content(), "hi");
    }

    #[test]
    fn test_text_content_null_content() {
        let r = RawResponse::from(json!({"choices": [{"message": {"content": null}}]}));
        assert_eq!(r.text_content(), "");
        let r = RawResponse::from(json!({"id": "x"}));
        assert_eq!(r.text_content(), "");
    }

    #[test]
    fn test_text_content_from_completion() {
        let r = RawResponse::from(ChatCompletion::with_message(CompletionMessage::text("yo")));
        assert_eq!(r.text_content(), "yo");
        assert_eq!(RawResponse::from(ChatCompletion::default()).text_content(), "");
    }

    #[test]
    fn test_completion_deserializes_from_wire() {
        let c: ChatCompletion = serde_json::from_value(json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{"id": "abc", "function": {"name": "f", "arguments": "{}"}}]
            }}]
        }))
        .unwrap();
        let m = c.first_message().unwrap();
        assert_eq!(m.tool_calls()[0].call_type, "function");
        assert_eq!(m.content(), "");
    }
}
