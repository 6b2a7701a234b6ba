//! 适配器模块：原生函数调用与提示词注入两种工具调用策略。
//!
//! # Adapters Module
//!
//! Two strategies for getting tool calls out of a model, behind one contract:
//!
//! | Variant | Outbound | Inbound |
//! |---------|----------|---------|
//! | [`FunctionCallingAdapter`] | tools travel as API parameters, message unchanged | provider `tool_calls` field |
//! | [`PromptInjectionAdapter`] | catalog + tag grammar rendered into the prompt | `<tool_calls>` block in the text |
//!
//! Both converge on the same normalized [`ToolInvocation`](crate::types::ToolInvocation)
//! shape, so callers never branch on the strategy that produced a call.
//!
//! The set of variants is closed: [`ToolAdapter`] is sealed and
//! [`AdapterVariant`] lists exactly the implemented strategies. Adding one (ReAct,
//! XML) means adding a variant and an implementation here.
//!
//! ## Example
//!
//! ```rust
//! use ai_tool_bridge::adapters::{PromptInjectionAdapter, ToolAdapter};
//! use ai_tool_bridge::types::RawResponse;
//!
//! let adapter = PromptInjectionAdapter::new();
//! let reply = RawResponse::from(
//!     "<tool_calls><tool_call><tool_name>ping</tool_name>\
//!      <arguments>{}</arguments></tool_call></tool_calls>",
//! );
//! let result = adapter.parse_tool_calls(&reply);
//! assert!(result.has_calls);
//! assert_eq!(result.invocations[0].id, "call_0");
//! ```

pub mod function_calling;
pub mod prompt_injection;
pub mod tags;

pub use function_calling::FunctionCallingAdapter;
pub use prompt_injection::PromptInjectionAdapter;

use crate::types::{RawResponse, ToolCallResult, ToolDescriptor, ToolResult};

mod private {
    pub trait Sealed {}

    impl Sealed for super::FunctionCallingAdapter {}
    impl Sealed for super::PromptInjectionAdapter {}
}

/// Tool-calling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterVariant {
    /// Provider-native structured tool calling.
    FunctionCalling,
    /// Textual catalog and tag grammar inside the prompt.
    PromptInjection,
}

impl AdapterVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterVariant::FunctionCalling => "function_calling",
            AdapterVariant::PromptInjection => "prompt_injection",
        }
    }

    /// Whether tools travel as API parameters for this variant.
    pub fn supports_native(&self) -> bool {
        matches!(self, AdapterVariant::FunctionCalling)
    }

    /// Variant selected by a capability decision.
    pub fn for_native_support(supports_native: bool) -> Self {
        if supports_native {
            AdapterVariant::FunctionCalling
        } else {
            AdapterVariant::PromptInjection
        }
    }
}

impl std::fmt::Display for AdapterVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract shared by every tool-calling strategy.
///
/// All methods are pure over their inputs apart from logging.
pub trait ToolAdapter: private::Sealed + Send + Sync {
    fn variant(&self) -> AdapterVariant;

    /// Constant per variant.
    fn supports_native_tools(&self) -> bool {
        self.variant().supports_native()
    }

    /// Outbound message for this strategy. Identity for native calling.
    fn format_tools_for_prompt(&self, tools: &[ToolDescriptor], user_message: &str) -> String;

    /// Extract normalized invocations from a model response.
    ///
    /// Entries that fail to parse are dropped; siblings are still returned.
    fn parse_tool_calls(&self, response: &RawResponse) -> ToolCallResult;

    /// Text prompt feeding tool results back to the model.
    fn build_continuation_prompt(
        &self,
        original_message: &str,
        model_response: &str,
        tool_results: &[ToolResult],
    ) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_native_flag() {
        assert!(FunctionCallingAdapter::new().supports_native_tools());
        assert!(!PromptInjectionAdapter::new().supports_native_tools());
        assert_eq!(
            AdapterVariant::for_native_support(true),
            AdapterVariant::FunctionCalling
        );
        assert_eq!(
            AdapterVariant::for_native_support(false),
            AdapterVariant::PromptInjection
        );
    }

    #[test]
    fn test_variant_display() {
        assert_eq!(AdapterVariant::FunctionCalling.to_string(), "function_calling");
        assert_eq!(AdapterVariant::PromptInjection.to_string(), "prompt_injection");
    }

    #[test]
    fn test_adapters_usable_as_trait_objects() {
        let fc = FunctionCallingAdapter::new();
        let pi = PromptInjectionAdapter::new();
        let adapters: [&dyn ToolAdapter; 2] = [&fc, &pi];
        let variants: Vec<_> = adapters.iter().map(|a| a.variant()).collect();
        assert_eq!(
            variants,
            vec![AdapterVariant::FunctionCalling, AdapterVariant::PromptInjection]
        );
    }
}
