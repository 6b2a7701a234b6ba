//! 类型系统模块：工具描述、调用结果与模型响应的核心数据类型。
//!
//! # Types Module
//!
//! Strongly-typed representations of everything that crosses the bridge: tool
//! descriptors going out, raw responses coming back, and the normalized invocations
//! both adapters converge on.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ToolDescriptor`] | Name / description / input schema of one tool |
//! | [`ToolInvocation`] | Normalized `{id, type, function: {name, arguments}}` call |
//! | [`ToolCallResult`] | Parsed invocations plus the model's text |
//! | [`ToolResult`] | Outcome of running a tool, fed back on continuation |
//! | [`ChatMessage`] | History entry for native-path continuation |
//! | [`RawResponse`] | Model response in mapping, typed-object or text form |
//!
//! ## Example
//!
//! ```rust
//! use ai_tool_bridge::types::{ToolDescriptor, ToolInvocation};
//! use serde_json::json;
//!
//! let tool = ToolDescriptor::new(
//!     "get_weather",
//!     "Get current weather for a city",
//!     json!({
//!         "type": "object",
//!         "properties": {"city": {"type": "string"}},
//!         "required": ["city"]
//!     }),
//! );
//! assert!(tool.is_required("city"));
//!
//! let call = ToolInvocation::function("call_0", "get_weather", r#"{"city":"Paris"}"#);
//! assert_eq!(call.parsed_arguments().unwrap()["city"], "Paris");
//! ```

pub mod message;
pub mod response;
pub mod tool;

pub use message::{ChatMessage, MessageRole};
pub use response::{
    ChatCompletion, CompletionChoice, CompletionMessage, CompletionToolCall, RawResponse,
};
pub use tool::{FunctionCall, ToolCallResult, ToolDescriptor, ToolInvocation, ToolResult};
