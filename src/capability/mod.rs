//! 能力缓存模块：按端点缓存原生工具调用支持情况。
//!
//! # Capability Module
//!
//! Remembers, per endpoint id, whether native tool calling works, so the expensive
//! probe runs at most once per TTL window.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CapabilityRecord`] | Decision, when it was made, how long the probe took |
//! | [`CapabilityState`] | `Unknown` / `NativeConfirmed` / `TextualConfirmed` |
//! | [`CapabilityCache`] | TTL map behind a single coarse lock |
//! | [`CapabilityCacheStats`] | Serializable snapshot for diagnostics |
//!
//! ## State transitions
//!
//! ```text
//! Unknown --probe--> NativeConfirmed | TextualConfirmed
//! NativeConfirmed --runtime failure--> TextualConfirmed
//! any --TTL expiry / clear--> Unknown
//! ```
//!
//! Degrading only narrows capability. Only a fresh probe after expiry or a clear
//! can move an endpoint back to native.

pub mod cache;
pub mod classify;
pub mod record;

pub use cache::{CachedCapability, CapabilityCache, CapabilityCacheStats};
pub use classify::is_native_tool_response;
pub use record::{CapabilityRecord, CapabilityState};
