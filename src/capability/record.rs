//! Cached capability decision for one endpoint.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::adapters::AdapterVariant;

/// Per-endpoint capability state.
///
/// `Unknown` is the absence of a live record. Records are revisited after TTL
/// expiry or an explicit clear, so no state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityState {
    Unknown,
    NativeConfirmed,
    TextualConfirmed,
}

impl CapabilityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityState::Unknown => "unknown",
            CapabilityState::NativeConfirmed => "native_confirmed",
            CapabilityState::TextualConfirmed => "textual_confirmed",
        }
    }
}

impl std::fmt::Display for CapabilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether native tool calling works for an endpoint, and how we found out.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityRecord {
    pub endpoint_id: String,
    pub supports_native: bool,
    pub tested_at: SystemTime,
    pub test_duration_ms: f64,
    /// Probe or invocation error behind a negative decision.
    pub error: Option<String>,
}

impl CapabilityRecord {
    /// Outcome of a probe that returned a response.
    pub fn probed(endpoint_id: impl Into<String>, supports_native: bool, took: Duration) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            supports_native,
            tested_at: SystemTime::now(),
            test_duration_ms: took.as_secs_f64() * 1000.0,
            error: None,
        }
    }

    /// A probe that raised; cached as unsupported so it is not retried.
    pub fn probe_failed(
        endpoint_id: impl Into<String>,
        took: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            supports_native: false,
            tested_at: SystemTime::now(),
            test_duration_ms: took.as_secs_f64() * 1000.0,
            error: Some(error.into()),
        }
    }

    /// Native path failed at runtime. No probe was run.
    pub fn degraded(endpoint_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            supports_native: false,
            tested_at: SystemTime::now(),
            test_duration_ms: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn state(&self) -> CapabilityState {
        if self.supports_native {
            CapabilityState::NativeConfirmed
        } else {
            CapabilityState::TextualConfirmed
        }
    }

    pub fn variant(&self) -> AdapterVariant {
        AdapterVariant::for_native_support(self.supports_native)
    }

    /// `tested_at` as seconds since the UNIX epoch.
    pub fn tested_at_unix_secs(&self) -> u64 {
        self.tested_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let ok = CapabilityRecord::probed("openai", true, Duration::from_millis(250));
        assert_eq!(ok.state(), CapabilityState::NativeConfirmed);
        assert_eq!(ok.variant(), AdapterVariant::FunctionCalling);
        assert!((ok.test_duration_ms - 250.0).abs() < 1e-6);
        assert!(ok.error.is_none());

        let failed = CapabilityRecord::probe_failed("local", Duration::ZERO, "connection refused");
        assert_eq!(failed.state(), CapabilityState::TextualConfirmed);
        assert_eq!(failed.error.as_deref(), Some("connection refused"));

        let degraded = CapabilityRecord::degraded("openai", "400 tools unsupported");
        assert!(!degraded.supports_native);
        assert_eq!(degraded.test_duration_ms, 0.0);
        assert!(degraded.tested_at_unix_secs() > 0);
    }
}
