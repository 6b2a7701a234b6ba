//! # ai-tool-bridge
//!
//! 让任意大模型端点都能调用工具：原生函数调用优先，失败时自动降级为提示词注入。
//!
//! Tool calling for any LLM endpoint. Endpoints with working native function
//! calling get it; everything else gets the tool catalog and a tag grammar written
//! into the prompt, with tolerant parsing of whatever comes back.
//!
//! ## Overview
//!
//! - **Capability detection**: probe an endpoint once, cache the answer per
//!   endpoint id for a TTL (24 hours by default)
//! - **Two strategies, one shape**: native `tool_calls` and tagged text both
//!   normalize to `{id, type: "function", function: {name, arguments}}`
//! - **Sticky fallback**: a native-path failure marks the endpoint textual-only
//!   and retries once, until the record expires or is cleared
//! - **Resilient decoding**: truncated, fenced, comma-less or prose-wrapped JSON is
//!   repaired before parsing
//!
//! The crate makes no network calls. The model call itself is a caller-supplied
//! [`ModelInvoker`](orchestrator::ModelInvoker).
//!
//! ## Quick Start
//!
//! ```rust
//! use ai_tool_bridge::orchestrator::{invoke_fn, probe_fn, InvokeRequest};
//! use ai_tool_bridge::types::{RawResponse, ToolDescriptor};
//! use ai_tool_bridge::{OrchestratorConfig, ToolOrchestrator};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let orchestrator = ToolOrchestrator::new(OrchestratorConfig::default());
//! let tools = vec![ToolDescriptor::new(
//!     "get_weather",
//!     "Current weather for a city",
//!     json!({"type": "object", "properties": {"city": {"type": "string"}}, "required": ["city"]}),
//! )];
//!
//! // This endpoint ignores the `tools` parameter, so the probe finds no tool-call field.
//! let probe = probe_fn(|| async {
//!     Ok::<_, ai_tool_bridge::Error>(RawResponse::from(
//!         json!({"choices": [{"message": {"content": "hello"}}]}),
//!     ))
//! });
//! let invoker = invoke_fn(|req: InvokeRequest| async move {
//!     assert!(req.tools.is_none());
//!     Ok::<_, ai_tool_bridge::Error>(RawResponse::from(
//!         "<tool_calls>\n<tool_call>\n<tool_name>get_weather</tool_name>\n\
//!          <arguments>\n{\"city\": \"Paris\"}\n</arguments>\n</tool_call>\n</tool_calls>",
//!     ))
//! });
//!
//! let result = orchestrator
//!     .call_with_fallback("local-llm", &tools, "Weather in Paris?", &invoker, Some(&probe))
//!     .await?;
//! assert!(result.has_calls);
//! assert_eq!(result.invocations[0].arguments(), r#"{"city":"Paris"}"#);
//! # Ok::<(), ai_tool_bridge::Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Tool descriptors, invocations, results, raw responses |
//! | [`repair`] | Resilient JSON decoder |
//! | [`adapters`] | Native and prompt-injection strategies |
//! | [`capability`] | Capability records and the TTL cache |
//! | [`orchestrator`] | Adapter selection and fallback |
//! | [`config`] | Orchestrator configuration (code, env, YAML) |
//! | [`telemetry`] | Opt-in `tracing` subscriber setup |

pub mod adapters;
pub mod capability;
pub mod config;
pub mod orchestrator;
pub mod repair;
pub mod telemetry;
pub mod types;

// Re-export main types for convenience
pub use adapters::{AdapterVariant, FunctionCallingAdapter, PromptInjectionAdapter, ToolAdapter};
pub use capability::{CapabilityCacheStats, CapabilityRecord, CapabilityState};
pub use config::{DegradePolicy, OrchestratorConfig};
pub use orchestrator::{CapabilityProbe, ModelInvoker, ToolCatalog, ToolOrchestrator};
pub use repair::{parse_json, parse_json_as, repair_json};
pub use types::{RawResponse, ToolCallResult, ToolDescriptor, ToolInvocation, ToolResult};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, FailureClass};
