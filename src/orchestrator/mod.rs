//! 编排模块：能力检测、适配器选择与自动降级。
//!
//! # Orchestrator Module
//!
//! [`ToolOrchestrator`] decides per endpoint whether to use native tool calling or
//! prompt injection, remembers the decision for a TTL, and degrades an endpoint to
//! prompt injection when the native path fails at runtime.
//!
//! ## Flow of [`ToolOrchestrator::call_with_fallback`]
//!
//! 1. Resolve the adapter: live cache record, else probe (if given), else prompt injection.
//! 2. Native: invoke with the tool list and `tool_choice = "auto"`.
//! 3. Textual: invoke with the tools rendered into the message.
//! 4. If the native call fails and the failure may degrade, mark the endpoint
//!    textual-only and retry once through step 3.
//!
//! Construct one orchestrator at startup and share it (for example in an `Arc`).
//! The cache lock is never held while a probe or invocation is awaited.
//!
//! ## Example
//!
//! ```rust
//! use ai_tool_bridge::orchestrator::{invoke_fn, InvokeRequest, ToolOrchestrator};
//! use ai_tool_bridge::types::{RawResponse, ToolDescriptor};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let orchestrator = ToolOrchestrator::default();
//! let tools = vec![ToolDescriptor::new("ping", "Check liveness", json!({}))];
//! let invoker = invoke_fn(|_req: InvokeRequest| async {
//!     Ok::<_, ai_tool_bridge::Error>(RawResponse::from(
//!         "<tool_calls><tool_call><tool_name>ping</tool_name>\
//!          <arguments>{}</arguments></tool_call></tool_calls>",
//!     ))
//! });
//!
//! let result = orchestrator
//!     .call_with_fallback("local-llm", &tools, "are you up?", &invoker, None)
//!     .await
//!     .unwrap();
//! assert_eq!(result.invocations[0].name(), "ping");
//! # });
//! ```

pub mod invoker;

pub use invoker::{
    invoke_fn, probe_fn, CapabilityProbe, InvokeFn, InvokeRequest, ModelInvoker, ProbeFn,
    ToolCatalog, TOOL_CHOICE_AUTO,
};

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::adapters::{AdapterVariant, FunctionCallingAdapter, PromptInjectionAdapter, ToolAdapter};
use crate::capability::{
    is_native_tool_response, CapabilityCache, CapabilityCacheStats, CapabilityRecord,
    CapabilityState,
};
use crate::config::OrchestratorConfig;
use crate::types::{ToolCallResult, ToolDescriptor};
use crate::{Error, Result};

/// Capability-aware entry point for tool calls.
#[derive(Debug)]
pub struct ToolOrchestrator {
    config: OrchestratorConfig,
    cache: CapabilityCache,
    function_calling: FunctionCallingAdapter,
    prompt_injection: PromptInjectionAdapter,
}

impl Default for ToolOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl ToolOrchestrator {
    /// Build an orchestrator. A zero cache TTL is replaced by the default TTL;
    /// use [`try_new`](Self::try_new) to reject it instead.
    pub fn new(mut config: OrchestratorConfig) -> Self {
        if config.cache_ttl.is_zero() {
            let fallback = OrchestratorConfig::default().cache_ttl;
            warn!(
                cache_ttl_secs = fallback.as_secs(),
                "zero capability cache TTL, using the default"
            );
            config.cache_ttl = fallback;
        }
        info!(
            cache_ttl_secs = config.cache_ttl.as_secs(),
            auto_fallback = config.auto_fallback,
            degrade_policy = %config.degrade_policy,
            "tool orchestrator initialized"
        );
        Self {
            cache: CapabilityCache::new(config.cache_ttl),
            config,
            function_calling: FunctionCallingAdapter::new(),
            prompt_injection: PromptInjectionAdapter::new(),
        }
    }

    /// Validate `config` before constructing.
    pub fn try_new(config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn cache(&self) -> &CapabilityCache {
        &self.cache
    }

    pub fn adapter(&self, variant: AdapterVariant) -> &dyn ToolAdapter {
        match variant {
            AdapterVariant::FunctionCalling => &self.function_calling,
            AdapterVariant::PromptInjection => &self.prompt_injection,
        }
    }

    pub fn function_calling(&self) -> &FunctionCallingAdapter {
        &self.function_calling
    }

    pub fn prompt_injection(&self) -> &PromptInjectionAdapter {
        &self.prompt_injection
    }

    /// Adapter for `endpoint_id`.
    ///
    /// A live record decides. Without one, `probe` runs and its outcome is cached;
    /// a failing probe is cached as unsupported and is not reported. Without a
    /// probe, prompt injection is selected and nothing is cached. Only a cancelled
    /// probe or a cache failure returns an error.
    pub async fn get_adapter(
        &self,
        endpoint_id: &str,
        probe: Option<&dyn CapabilityProbe>,
    ) -> Result<&dyn ToolAdapter> {
        let variant = self.resolve_variant(endpoint_id, probe).await?;
        info!(endpoint = %endpoint_id, adapter = %variant, "selected tool adapter");
        Ok(self.adapter(variant))
    }

    async fn resolve_variant(
        &self,
        endpoint_id: &str,
        probe: Option<&dyn CapabilityProbe>,
    ) -> Result<AdapterVariant> {
        if let Some(record) = self.cache.get(endpoint_id)? {
            return Ok(record.variant());
        }
        match probe {
            Some(probe) => Ok(self.detect_capability(endpoint_id, probe).await?.variant()),
            None => {
                debug!(endpoint = %endpoint_id, "no capability record and no probe");
                Ok(AdapterVariant::PromptInjection)
            }
        }
    }

    async fn detect_capability(
        &self,
        endpoint_id: &str,
        probe: &dyn CapabilityProbe,
    ) -> Result<CapabilityRecord> {
        info!(endpoint = %endpoint_id, "probing native tool-calling support");
        let started = Instant::now();
        let outcome = probe.probe().await;
        let took = started.elapsed();

        let record = match outcome {
            Ok(response) => {
                let supports_native = is_native_tool_response(&response);
                info!(
                    endpoint = %endpoint_id,
                    supports_native,
                    duration_ms = took.as_secs_f64() * 1000.0,
                    "capability probe finished"
                );
                CapabilityRecord::probed(endpoint_id, supports_native, took)
            }
            Err(e) if e.is_cancellation() => {
                debug!(endpoint = %endpoint_id, "capability probe cancelled");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    endpoint = %endpoint_id,
                    error = %e,
                    duration_ms = took.as_secs_f64() * 1000.0,
                    "capability probe failed, using prompt injection"
                );
                CapabilityRecord::probe_failed(endpoint_id, took, e.to_string())
            }
        };
        self.cache.insert(record.clone())?;
        Ok(record)
    }

    /// Run one tool-calling turn against `endpoint_id`, degrading to prompt
    /// injection if the native path fails.
    ///
    /// Errors from the textual path, from the single retry, and failures that may
    /// not degrade are returned unchanged.
    pub async fn call_with_fallback(
        &self,
        endpoint_id: &str,
        tools: &[ToolDescriptor],
        message: &str,
        invoker: &dyn ModelInvoker,
        probe: Option<&dyn CapabilityProbe>,
    ) -> Result<ToolCallResult> {
        let adapter = self.get_adapter(endpoint_id, probe).await?;
        if !adapter.supports_native_tools() {
            return self.call_textual(tools, message, invoker).await;
        }

        match self.call_native(tools, message, invoker).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_cancellation() => Err(e),
            Err(e) => {
                error!(endpoint = %endpoint_id, error = %e, "native tool call failed");
                if !self.should_degrade(&e) {
                    return Err(e);
                }
                self.cache.degrade(endpoint_id, e.to_string())?;
                warn!(endpoint = %endpoint_id, "retrying with prompt injection");
                self.call_textual(tools, message, invoker).await
            }
        }
    }

    /// [`call_with_fallback`](Self::call_with_fallback) with descriptors from `catalog`.
    pub async fn call_with_catalog(
        &self,
        endpoint_id: &str,
        catalog: &dyn ToolCatalog,
        message: &str,
        invoker: &dyn ModelInvoker,
        probe: Option<&dyn CapabilityProbe>,
    ) -> Result<ToolCallResult> {
        let tools = catalog.list_tools().await?;
        self.call_with_fallback(endpoint_id, &tools, message, invoker, probe)
            .await
    }

    fn should_degrade(&self, error: &Error) -> bool {
        self.config.auto_fallback && self.config.degrade_policy.permits(error)
    }

    async fn call_native(
        &self,
        tools: &[ToolDescriptor],
        message: &str,
        invoker: &dyn ModelInvoker,
    ) -> Result<ToolCallResult> {
        debug!(tools = tools.len(), "invoking with native tool calling");
        let response = invoker
            .invoke(message, Some(tools), Some(TOOL_CHOICE_AUTO))
            .await?;
        Ok(self.function_calling.parse_tool_calls(&response))
    }

    async fn call_textual(
        &self,
        tools: &[ToolDescriptor],
        message: &str,
        invoker: &dyn ModelInvoker,
    ) -> Result<ToolCallResult> {
        debug!(tools = tools.len(), "invoking with prompt injection");
        let prompt = self.prompt_injection.format_tools_for_prompt(tools, message);
        let response = invoker.invoke(&prompt, None, None).await?;
        Ok(self.prompt_injection.parse_tool_calls(&response))
    }

    /// Capability state of `endpoint_id`.
    pub fn capability_state(&self, endpoint_id: &str) -> Result<CapabilityState> {
        self.cache.state(endpoint_id)
    }

    /// Forget one endpoint, or all endpoints when `endpoint_id` is `None`.
    pub fn clear_cache(&self, endpoint_id: Option<&str>) -> Result<usize> {
        self.cache.clear(endpoint_id)
    }

    pub fn cache_stats(&self) -> Result<CapabilityCacheStats> {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawResponse;
    use crate::FailureClass;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn native_reply() -> RawResponse {
        RawResponse::from(json!({"choices": [{"message": {
            "content": null,
            "tool_calls": [{"id": "n1", "function": {"name": "f", "arguments": "{}"}}]
        }}]}))
    }

    fn textual_reply() -> RawResponse {
        RawResponse::from(
            "<tool_calls><tool_call><tool_name>f</tool_name><arguments>{}</arguments></tool_call></tool_calls>",
        )
    }

    #[tokio::test]
    async fn test_no_probe_defaults_to_prompt_injection() {
        let orch = ToolOrchestrator::default();
        let adapter = orch.get_adapter("x", None).await.unwrap();
        assert_eq!(adapter.variant(), AdapterVariant::PromptInjection);
        assert_eq!(orch.cache_stats().unwrap().total_cached, 0);
    }

    #[tokio::test]
    async fn test_probe_failure_is_cached_not_raised() {
        let orch = ToolOrchestrator::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let probe = probe_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<RawResponse, _>(Error::invocation(
                    "400 unknown field tools",
                    FailureClass::Rejected,
                ))
            }
        });
        for _ in 0..2 {
            let adapter = orch.get_adapter("x", Some(&probe)).await.unwrap();
            assert_eq!(adapter.variant(), AdapterVariant::PromptInjection);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = orch.cache_stats().unwrap();
        assert_eq!(
            stats.entries[0].error.as_deref(),
            Some("Invocation failed (rejected): 400 unknown field tools")
        );
    }

    #[tokio::test]
    async fn test_cancelled_probe_is_not_cached() {
        let orch = ToolOrchestrator::default();
        let probe = probe_fn(|| async { Err::<RawResponse, _>(Error::Cancelled) });
        let err = orch.get_adapter("x", Some(&probe)).await.err().unwrap();
        assert!(err.is_cancellation());
        assert_eq!(orch.capability_state("x").unwrap(), CapabilityState::Unknown);
    }

    #[tokio::test]
    async fn test_native_then_degrade() {
        let orch = ToolOrchestrator::default();
        let probe = probe_fn(|| async { Ok::<_, Error>(native_reply()) });
        let invoker = invoke_fn(|req: InvokeRequest| async move {
            if req.is_native() {
                Err(Error::invocation("500", FailureClass::Other))
            } else {
                Ok(textual_reply())
            }
        });
        let result = orch
            .call_with_fallback("ep", &[], "hi", &invoker, Some(&probe))
            .await
            .unwrap();
        assert!(result.has_calls);
        assert_eq!(result.invocations[0].id, "call_0");
        assert_eq!(orch.capability_state("ep").unwrap(), CapabilityState::TextualConfirmed);
    }

    #[tokio::test]
    async fn test_auto_fallback_disabled_propagates() {
        let orch = ToolOrchestrator::new(OrchestratorConfig::default().with_auto_fallback(false));
        orch.cache()
            .insert(CapabilityRecord::probed("ep", true, Duration::ZERO))
            .unwrap();
        let invoker = invoke_fn(|_req: InvokeRequest| async {
            Err::<RawResponse, _>(Error::invocation("boom", FailureClass::Other))
        });
        let err = orch
            .call_with_fallback("ep", &[], "hi", &invoker, None)
            .await
            .unwrap_err();
        assert_eq!(err.failure_class(), Some(FailureClass::Other));
        assert_eq!(orch.capability_state("ep").unwrap(), CapabilityState::NativeConfirmed);
    }

    #[test]
    fn test_try_new_rejects_zero_ttl() {
        let cfg = OrchestratorConfig::default().with_cache_ttl(Duration::ZERO);
        assert!(ToolOrchestrator::try_new(cfg).is_err());
    }

    #[tokio::test]
    async fn test_new_replaces_zero_ttl() {
        let orch =
            ToolOrchestrator::new(OrchestratorConfig::default().with_cache_ttl(Duration::ZERO));
        assert_eq!(orch.config().cache_ttl, OrchestratorConfig::default().cache_ttl);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let probe = probe_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(native_reply()) }
        });
        for _ in 0..2 {
            let adapter = orch.get_adapter("ep", Some(&probe)).await.unwrap();
            assert_eq!(adapter.variant(), AdapterVariant::FunctionCalling);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
