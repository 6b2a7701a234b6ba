//! 日志模块：可选的 tracing 订阅器初始化。
//!
//! Logging setup (opt-in).
//!
//! The library only emits `tracing` events; it never installs a subscriber on its
//! own. Applications that have no subscriber of their own, such as the bundled
//! `tool-bridge` binary, can call [`init_tracing`].
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | adapter selection, probe outcomes, degrades, cache clears |
//! | `debug` | cache hits, decoder stages |
//! | `warn` | probe failures, dropped tool-call entries, exhausted repairs, expiry |
//! | `error` | native-path invocation failures |

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::{Error, ErrorContext, Result};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() -> Result<()> {
    init_tracing_with_default("info")
}

/// Like [`init_tracing`] with a custom fallback directive when `RUST_LOG` is unset.
///
/// Calling it again after a successful install is a no-op.
pub fn init_tracing_with_default(default_directive: &str) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid log directive '{}'", default_directive),
                ErrorContext::new()
                    .with_field_path("RUST_LOG")
                    .with_source(e.to_string()),
            )
        })?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| {
            Error::runtime_with_context(
                "failed to install tracing subscriber",
                ErrorContext::new()
                    .with_source("telemetry")
                    .with_details(e.to_string()),
            )
        })?;
    let _ = INSTALLED.set(());
    Ok(())
}
