//! 容错 JSON 解码模块：从模型输出中恢复可解析的 JSON。
//!
//! # Resilient JSON Decoder
//!
//! Models wrap JSON in prose, cut it off mid-token, forget commas and leave
//! trailing ones behind. This module turns such text back into something
//! `serde_json` accepts, trying a fixed sequence of repairs and keeping the first
//! candidate that parses.
//!
//! ## Repair stages
//!
//! | Stage | Fixes |
//! |-------|-------|
//! | [`RepairStage::StripFences`] | Markdown code fences around the value |
//! | [`RepairStage::BalancedExtract`] | Prose before/after the first complete value |
//! | [`RepairStage::CloseUnterminated`] | Truncated strings and unclosed brackets |
//! | [`RepairStage::CommonErrors`] | Missing/trailing commas, control chars, raw newlines |
//! | [`RepairStage::DropIncompleteTail`] | Half-written last member |
//! | [`RepairStage::TrimTrailing`] | Garbage after the last valid closer |
//! | [`RepairStage::ExtractNested`] | Valid value nested inside broken text |
//!
//! Text that already parses is returned untouched and borrowed. When every stage
//! fails the original text comes back as-is, so the caller's own parse reports a
//! normal decode error with position information.
//!
//! The decoder is pure: no shared state, no I/O, safe from any thread.
//!
//! ## Example
//!
//! ```rust
//! use ai_tool_bridge::repair::repair_json;
//!
//! let fixed = repair_json(r#"Sure! Here is the result: {"ok":true}"#);
//! assert_eq!(fixed, r#"{"ok":true}"#);
//! ```

mod fixes;
pub mod scanner;

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::Result;

pub use scanner::{scan, Bracket, ScanOutcome, ScanState, Scanner};

/// Which repair produced the returned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairStage {
    /// Input already parsed.
    Unchanged,
    StripFences,
    BalancedExtract,
    CloseUnterminated,
    CommonErrors,
    DropIncompleteTail,
    TrimTrailing,
    ExtractNested,
    /// Nothing worked; the original text is returned.
    Exhausted,
}

impl RepairStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStage::Unchanged => "unchanged",
            RepairStage::StripFences => "strip_fences",
            RepairStage::BalancedExtract => "balanced_extract",
            RepairStage::CloseUnterminated => "close_unterminated",
            RepairStage::CommonErrors => "common_errors",
            RepairStage::DropIncompleteTail => "drop_incomplete_tail",
            RepairStage::TrimTrailing => "trim_trailing",
            RepairStage::ExtractNested => "extract_nested",
            RepairStage::Exhausted => "exhausted",
        }
    }

    /// True when the returned text is expected to parse.
    pub fn is_repaired(&self) -> bool {
        !matches!(self, RepairStage::Exhausted)
    }
}

impl std::fmt::Display for RepairStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repaired text together with the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired<'a> {
    pub text: Cow<'a, str>,
    pub stage: RepairStage,
}

impl<'a> Repaired<'a> {
    fn borrowed(text: &'a str, stage: RepairStage) -> Self {
        Self {
            text: Cow::Borrowed(text),
            stage,
        }
    }

    fn owned(text: String, stage: RepairStage) -> Self {
        Self {
            text: Cow::Owned(text),
            stage,
        }
    }
}

/// Whether `text` is exactly one valid JSON value.
pub fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok()
}

/// Best-effort repair of text expected to hold one JSON value.
///
/// See [`repair_json_with_stage`] for which repair was applied.
pub fn repair_json(text: &str) -> Cow<'_, str> {
    repair_json_with_stage(text).text
}

/// Like [`repair_json`], also reporting the stage that succeeded.
pub fn repair_json_with_stage(text: &str) -> Repaired<'_> {
    if is_valid_json(text) {
        debug!("json parsed without repair");
        return Repaired::borrowed(text, RepairStage::Unchanged);
    }
    if text.trim().is_empty() {
        return Repaired::borrowed(text, RepairStage::Exhausted);
    }

    let unfenced = fixes::strip_code_fences(text);
    if let Some(stripped) = &unfenced {
        if is_valid_json(stripped) {
            debug!(stage = "strip_fences", "json repaired");
            return Repaired::owned(stripped.clone(), RepairStage::StripFences);
        }
    }
    let working = unfenced.as_deref().unwrap_or(text);

    match repair_body(working) {
        Some((repaired, stage)) => {
            debug!(stage = stage.as_str(), "json repaired");
            Repaired::owned(repaired, stage)
        }
        None => {
            warn!(
                preview = %preview(text, 80),
                "json repair exhausted all strategies"
            );
            Repaired::borrowed(text, RepairStage::Exhausted)
        }
    }
}

fn repair_body(text: &str) -> Option<(String, RepairStage)> {
    let start = fixes::json_start(text)?;
    let body = &text[start..];
    let outcome = scan(body);

    let candidate = match outcome.end {
        Some(end) => {
            let balanced = &body[..end];
            if is_valid_json(balanced) {
                return Some((balanced.to_string(), RepairStage::BalancedExtract));
            }
            balanced.to_string()
        }
        None => {
            let closed = fixes::close_unterminated(body, &outcome);
            if is_valid_json(&closed) {
                return Some((closed, RepairStage::CloseUnterminated));
            }
            body.to_string()
        }
    };

    debug!(stage = "common_errors", "trying json repair");
    let cleaned = fixes::fix_common_errors(&candidate);
    let cleaned_outcome = scan(&cleaned);
    let fixed = match cleaned_outcome.end {
        Some(end) => cleaned[..end].to_string(),
        None => fixes::close_unterminated(&cleaned, &cleaned_outcome),
    };
    if is_valid_json(&fixed) {
        return Some((fixed, RepairStage::CommonErrors));
    }

    debug!(stage = "drop_incomplete_tail", "trying json repair");
    if let Some(dropped) = fixes::drop_incomplete_tail(&cleaned)
        .or_else(|| fixes::drop_incomplete_tail(&candidate))
    {
        return Some((dropped, RepairStage::DropIncompleteTail));
    }

    debug!(stage = "trim_trailing", "trying json repair");
    if let Some(trimmed) = fixes::trim_trailing_content(body) {
        return Some((trimmed.to_string(), RepairStage::TrimTrailing));
    }

    debug!(stage = "extract_nested", "trying json repair");
    fixes::extract_nested(body).map(|nested| (nested.to_string(), RepairStage::ExtractNested))
}

/// Repair `text` and parse it into a [`Value`].
///
/// An irrecoverable input surfaces as [`Error::Serialization`](crate::Error::Serialization)
/// from parsing the original text.
pub fn parse_json(text: &str) -> Result<Value> {
    parse_json_as(text)
}

/// Repair `text` and deserialize it into `T`.
pub fn parse_json_as<T: DeserializeOwned>(text: &str) -> Result<T> {
    let repaired = repair_json_with_stage(text);
    serde_json::from_str(&repaired.text).map_err(|e| {
        warn!(
            stage = repaired.stage.as_str(),
            error = %e,
            "json parse failed after repair"
        );
        e.into()
    })
}

/// First `max` characters of `text` on one line, for log records.
fn preview(text: &str, max: usize) -> String {
    let mut out: String = text
        .chars()
        .take(max)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if text.chars().nth(max).is_some() {
        out.push_str("...");
    }
    out
}
