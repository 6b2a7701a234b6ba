//! Orchestrator configuration.
//!
//! Defaults match the long-standing behaviour: a 24 hour capability TTL, automatic
//! fallback enabled, and every native-path failure degrading the endpoint. Values
//! can be overridden in code, from environment variables, or from YAML.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `TOOL_BRIDGE_CACHE_TTL_HOURS` | Capability TTL in hours |
//! | `TOOL_BRIDGE_CACHE_TTL_SECS` | Capability TTL in seconds (wins over hours) |
//! | `TOOL_BRIDGE_AUTO_FALLBACK` | `true`/`false`/`1`/`0`/`yes`/`no`/`on`/`off` |
//! | `TOOL_BRIDGE_DEGRADE_POLICY` | `always` or `structural` |

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, ErrorContext, Result};

pub const ENV_CACHE_TTL_HOURS: &str = "TOOL_BRIDGE_CACHE_TTL_HOURS";
pub const ENV_CACHE_TTL_SECS: &str = "TOOL_BRIDGE_CACHE_TTL_SECS";
pub const ENV_AUTO_FALLBACK: &str = "TOOL_BRIDGE_AUTO_FALLBACK";
pub const ENV_DEGRADE_POLICY: &str = "TOOL_BRIDGE_DEGRADE_POLICY";

const SECS_PER_HOUR: u64 = 3600;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * SECS_PER_HOUR);

/// Which native-path failures mark an endpoint as textual-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradePolicy {
    /// Every invocation failure degrades.
    #[default]
    Always,
    /// Transport, timeout and rate-limit failures propagate without touching the cache.
    #[serde(alias = "structural")]
    StructuralOnly,
}

impl DegradePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradePolicy::Always => "always",
            DegradePolicy::StructuralOnly => "structural",
        }
    }

    /// Whether `error` should degrade the endpoint. Cancellation never does.
    pub fn permits(&self, error: &Error) -> bool {
        if error.is_cancellation() {
            return false;
        }
        match self {
            DegradePolicy::Always => true,
            DegradePolicy::StructuralOnly => error
                .failure_class()
                .map(|class| !class.is_transient())
                .unwrap_or(true),
        }
    }
}

impl std::fmt::Display for DegradePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DegradePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(DegradePolicy::Always),
            "structural" | "structural_only" => Ok(DegradePolicy::StructuralOnly),
            other => Err(Error::configuration_with_context(
                format!("unknown degrade policy '{}'", other),
                ErrorContext::new()
                    .with_field_path("degrade_policy")
                    .with_details("expected 'always' or 'structural'"),
            )),
        }
    }
}

/// Settings for [`ToolOrchestrator`](crate::orchestrator::ToolOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub cache_ttl: Duration,
    pub auto_fallback: bool,
    pub degrade_policy: DegradePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            auto_fallback: true,
            degrade_policy: DegradePolicy::default(),
        }
    }
}

/// YAML shape. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    cache_ttl_hours: Option<u64>,
    cache_ttl_secs: Option<u64>,
    auto_fallback: Option<bool>,
    degrade_policy: Option<DegradePolicy>,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_ttl_hours(self, hours: u64) -> Self {
        self.with_cache_ttl(Duration::from_secs(hours.saturating_mul(SECS_PER_HOUR)))
    }

    pub fn with_auto_fallback(mut self, enabled: bool) -> Self {
        self.auto_fallback = enabled;
        self
    }

    pub fn with_degrade_policy(mut self, policy: DegradePolicy) -> Self {
        self.degrade_policy = policy;
        self
    }

    /// Defaults overridden by `TOOL_BRIDGE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(hours) = lookup(ENV_CACHE_TTL_HOURS) {
            let hours = parse_u64(ENV_CACHE_TTL_HOURS, &hours)?;
            config.cache_ttl = Duration::from_secs(hours.saturating_mul(SECS_PER_HOUR));
        }
        if let Some(secs) = lookup(ENV_CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(parse_u64(ENV_CACHE_TTL_SECS, &secs)?);
        }
        if let Some(flag) = lookup(ENV_AUTO_FALLBACK) {
            config.auto_fallback = parse_bool(ENV_AUTO_FALLBACK, &flag)?;
        }
        if let Some(policy) = lookup(ENV_DEGRADE_POLICY) {
            config.degrade_policy = policy.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: ConfigFile = if yaml.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        let mut config = Self::default();
        if let Some(hours) = file.cache_ttl_hours {
            config.cache_ttl = Duration::from_secs(hours.saturating_mul(SECS_PER_HOUR));
        }
        if let Some(secs) = file.cache_ttl_secs {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(enabled) = file.auto_fallback {
            config.auto_fallback = enabled;
        }
        if let Some(policy) = file.degrade_policy {
            config.degrade_policy = policy;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(Error::configuration_with_context(
                "cache TTL must be positive",
                ErrorContext::new().with_field_path("cache_ttl"),
            ));
        }
        Ok(())
    }
}

fn parse_u64(var: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|e| {
        Error::configuration_with_context(
            format!("invalid value '{}'", raw),
            ErrorContext::new()
                .with_field_path(var)
                .with_source(e.to_string()),
        )
    })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration_with_context(
            format!("invalid boolean '{}'", raw),
            ErrorContext::new().with_field_path(var),
        )),
    }
}
