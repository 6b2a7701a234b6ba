//! Collaborator interfaces supplied by the caller.
//!
//! The orchestrator never talks to a provider itself. Timeouts, retries and
//! transport live behind these traits. Closures can be adapted with [`invoke_fn`]
//! and [`probe_fn`].

use std::future::Future;

use async_trait::async_trait;

use crate::types::{RawResponse, ToolDescriptor};
use crate::Result;

/// `tool_choice` value sent on the native path.
pub const TOOL_CHOICE_AUTO: &str = "auto";

/// Performs the actual model call.
///
/// `tools` and `tool_choice` are `Some` on the native path and `None` when the
/// tools are already rendered into `message`. Implementations should report a
/// cancelled call as [`Error::Cancelled`](crate::Error::Cancelled) and classify
/// other failures with [`Error::invocation`](crate::Error::invocation).
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        message: &str,
        tools: Option<&[ToolDescriptor]>,
        tool_choice: Option<&str>,
    ) -> Result<RawResponse>;
}

/// Cheap trial call that tests native tool-calling support.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn probe(&self) -> Result<RawResponse>;
}

/// Source of tool descriptors, consumed as opaque data.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;
}

#[async_trait]
impl ToolCatalog for Vec<ToolDescriptor> {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.clone())
    }
}

/// Owned arguments of one invocation, handed to closure invokers.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest {
    pub message: String,
    pub tools: Option<Vec<ToolDescriptor>>,
    pub tool_choice: Option<String>,
}

impl InvokeRequest {
    /// Native path: tools travel as parameters.
    pub fn is_native(&self) -> bool {
        self.tools.is_some()
    }
}

/// [`ModelInvoker`] backed by a closure.
pub struct InvokeFn<F>(F);

/// Wrap `f` as a [`ModelInvoker`].
pub fn invoke_fn<F, Fut>(f: F) -> InvokeFn<F>
where
    F: Fn(InvokeRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawResponse>> + Send + 'static,
{
    InvokeFn(f)
}

#[async_trait]
impl<F, Fut> ModelInvoker for InvokeFn<F>
where
    F: Fn(InvokeRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawResponse>> + Send + 'static,
{
    async fn invoke(
        &self,
        message: &str,
        tools: Option<&[ToolDescriptor]>,
        tool_choice: Option<&str>,
    ) -> Result<RawResponse> {
        let request = InvokeRequest {
            message: message.to_string(),
            tools: tools.map(<[ToolDescriptor]>::to_vec),
            tool_choice: tool_choice.map(str::to_string),
        };
        (self.0)(request).await
    }
}

/// [`CapabilityProbe`] backed by a closure.
pub struct ProbeFn<F>(F);

/// Wrap `f` as a [`CapabilityProbe`].
pub fn probe_fn<F, Fut>(f: F) -> ProbeFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawResponse>> + Send + 'static,
{
    ProbeFn(f)
}

#[async_trait]
impl<F, Fut> CapabilityProbe for ProbeFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawResponse>> + Send + 'static,
{
    async fn probe(&self) -> Result<RawResponse> {
        (self.0)().await
    }
}
