//! Tag grammar for textual tool calls.
//!
//! ```text
//! <tool_calls>
//! <tool_call>
//! <tool_name>NAME</tool_name>
//! <arguments>
//! { "param": "value" }
//! </arguments>
//! </tool_call>
//! </tool_calls>
//! ```
//!
//! Matching is case-insensitive and spans newlines. Bodies are matched
//! non-greedily, so the first closing tag ends a span.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ToolInvocation;

pub const TOOL_CALLS_OPEN: &str = "<tool_calls>";
pub const TOOL_CALLS_CLOSE: &str = "</tool_calls>";
pub const TOOL_CALL_OPEN: &str = "<tool_call>";
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";
pub const TOOL_NAME_OPEN: &str = "<tool_name>";
pub const TOOL_NAME_CLOSE: &str = "</tool_name>";
pub const ARGUMENTS_OPEN: &str = "<arguments>";
pub const ARGUMENTS_CLOSE: &str = "</arguments>";

fn tag_regex(tag: &str) -> Regex {
    let pattern = format!(r"(?is)<{tag}>(.*?)</{tag}>");
    Regex::new(&pattern).expect("tag pattern is a valid regex")
}

static TOOL_CALLS_RE: Lazy<Regex> = Lazy::new(|| tag_regex("tool_calls"));
static TOOL_CALL_RE: Lazy<Regex> = Lazy::new(|| tag_regex("tool_call"));
static TOOL_NAME_RE: Lazy<Regex> = Lazy::new(|| tag_regex("tool_name"));
static ARGUMENTS_RE: Lazy<Regex> = Lazy::new(|| tag_regex("arguments"));

/// The first `<tool_calls>` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolCallsBlock<'a> {
    /// Whole span, tags included, as the model wrote it.
    pub verbatim: &'a str,
    /// Text between the outer tags.
    pub inner: &'a str,
}

pub fn find_tool_calls_block(text: &str) -> Option<ToolCallsBlock<'_>> {
    let caps = TOOL_CALLS_RE.captures(text)?;
    Some(ToolCallsBlock {
        verbatim: caps.get(0)?.as_str(),
        inner: caps.get(1)?.as_str(),
    })
}

/// Bodies of every `<tool_call>` span, in document order.
pub fn tool_call_bodies(block: &str) -> impl Iterator<Item = &str> {
    TOOL_CALL_RE
        .captures_iter(block)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Trimmed `<tool_name>` body.
pub fn tool_name(call_body: &str) -> Option<&str> {
    body_of(&TOOL_NAME_RE, call_body)
}

/// Trimmed `<arguments>` body.
pub fn arguments(call_body: &str) -> Option<&str> {
    body_of(&ARGUMENTS_RE, call_body)
}

/// Trimmed `<arguments>` body and the call text after its closing tag.
///
/// The body ends at the first `</arguments>`, even one inside a JSON string.
/// Callers use the remainder to notice that case.
pub fn arguments_with_rest(call_body: &str) -> Option<(&str, &str)> {
    let caps = ARGUMENTS_RE.captures(call_body)?;
    let whole = caps.get(0)?;
    Some((caps.get(1)?.as_str().trim(), &call_body[whole.end()..]))
}

/// Whether `rest` holds anything besides whitespace and a `<tool_name>` span.
pub fn has_trailing_content(rest: &str) -> bool {
    !TOOL_NAME_RE.replace_all(rest, "").trim().is_empty()
}

fn body_of<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Render invocations in the exact tag layout the prompt asks the model for.
///
/// Arguments that do not parse as JSON are written through verbatim.
pub fn render_tool_calls(invocations: &[ToolInvocation]) -> String {
    let mut out = String::new();
    out.push_str(TOOL_CALLS_OPEN);
    out.push('\n');
    for inv in invocations {
        let args = serde_json::from_str::<serde_json::Value>(inv.arguments())
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| inv.arguments().to_string());
        out.push_str(TOOL_CALL_OPEN);
        out.push('\n');
        out.push_str(TOOL_NAME_OPEN);
        out.push_str(inv.name());
        out.push_str(TOOL_NAME_CLOSE);
        out.push('\n');
        out.push_str(ARGUMENTS_OPEN);
        out.push('\n');
        out.push_str(&args);
        out.push('\n');
        out.push_str(ARGUMENTS_CLOSE);
        out.push('\n');
        out.push_str(TOOL_CALL_CLOSE);
        out.push('\n');
    }
    out.push_str(TOOL_CALLS_CLOSE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_is_case_insensitive_and_multiline() {
        let text = "before\n<TOOL_CALLS>\n<tool_call>x</tool_call>\n</Tool_Calls> after";
        let block = find_tool_calls_block(text).unwrap();
        assert!(block.verbatim.starts_with("<TOOL_CALLS>"));
        assert!(block.verbatim.ends_with("</Tool_Calls>"));
        assert_eq!(tool_call_bodies(block.inner).collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn test_inner_call_tag_does_not_match_outer() {
        assert_eq!(tool_call_bodies("<tool_calls>a</tool_calls>").count(), 0);
    }

    #[test]
    fn test_missing_block() {
        assert!(find_tool_calls_block("<tool_calls> never closed").is_none());
    }

    #[test]
    fn test_name_and_arguments_are_trimmed() {
        let body = "\n<tool_name> search </tool_name>\n<arguments>\n{\"q\": 1}\n</arguments>\n";
        assert_eq!(tool_name(body), Some("search"));
        assert_eq!(arguments(body), Some("{\"q\": 1}"));
        assert_eq!(tool_name("<arguments>{}</arguments>"), None);
    }

    #[test]
    fn test_arguments_rest_after_closing_tag() {
        let body = "<arguments>{\"q\": \"</arguments> inside\"}</arguments>";
        let (args, rest) = arguments_with_rest(body).unwrap();
        assert_eq!(args, "{\"q\": \"");
        assert_eq!(rest, " inside\"}</arguments>");
        assert!(has_trailing_content(rest));

        let (_, rest) =
            arguments_with_rest("<arguments>{}</arguments>\n<tool_name>f</tool_name>\n").unwrap();
        assert!(!has_trailing_content(rest));
    }

    #[test]
    fn test_render_layout() {
        let inv = ToolInvocation::function("call_0", "NAME", r#"{"param":"value"}"#);
        assert_eq!(
            render_tool_calls(&[inv]),
            "<tool_calls>\n<tool_call>\n<tool_name>NAME</tool_name>\n<arguments>\n\
             {\n  \"param\": \"value\"\n}\n</arguments>\n</tool_call>\n</tool_calls>"
        );
    }
}
