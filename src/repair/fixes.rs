//! Individual repair strategies. Each one is a pure text transformation driven by
//! the [`Scanner`](super::scanner::Scanner); candidates are validated by the caller
//! unless noted otherwise.

use super::is_valid_json;
use super::scanner::{scan, Bracket, Event, ScanOutcome, ScanState, Scanner};

/// Upper bounds for the strategies that try many candidates.
const MAX_TAIL_CUTS: usize = 64;
const MAX_TRAILING_TRIES: usize = 256;
const MAX_NESTED_STARTS: usize = 128;

/// Remove markdown code-fence markers (```` ```json ```` / ```` ``` ````) at line edges.
///
/// Returns `None` when the text carries no fence at all.
pub(crate) fn strip_code_fences(text: &str) -> Option<String> {
    if !text.contains("```") {
        return None;
    }
    let stripped: Vec<&str> = text.lines().map(strip_fence_markers).collect();
    Some(stripped.join("\n").trim().to_string())
}

fn strip_fence_markers(line: &str) -> &str {
    let mut rest = line;
    if let Some(after) = rest.trim_start().strip_prefix("```") {
        // language tag
        rest = after.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    }
    if let Some(before) = rest.trim_end().strip_suffix("```") {
        rest = before;
    }
    rest
}

/// Byte offset of the first `{` or `[`.
pub(crate) fn json_start(text: &str) -> Option<usize> {
    text.find(|c: char| Bracket::from_open(c).is_some())
}

const KEYWORDS: [&str; 3] = ["true", "false", "null"];

/// Terminate an open string and close every open bracket, dropping a dangling comma.
///
/// A keyword cut short (`tru`, `fals`, `nul`) is completed and a partial `\u`
/// escape at the end of an open string is removed.
pub(crate) fn close_unterminated(text: &str, outcome: &ScanOutcome) -> String {
    let mut out = String::with_capacity(text.len() + outcome.open.len() + 5);
    if outcome.state == ScanState::InString {
        out.push_str(&text[..text.len() - partial_unicode_escape(text)]);
    } else {
        let kept = text.trim_end().trim_end_matches(',');
        out.push_str(kept);
        if let Some(missing) = keyword_completion(kept) {
            out.push_str(missing);
        }
    }
    out.push_str(&outcome.closing_suffix());
    out
}

/// Letters missing from a keyword prefix at the end of `text`.
fn keyword_completion(text: &str) -> Option<&'static str> {
    // ASCII bytes never sit inside a multi-byte char, so the slice is on a boundary.
    let len = text.bytes().rev().take_while(u8::is_ascii_alphabetic).count();
    let token = &text[text.len() - len..];
    if token.is_empty() {
        return None;
    }
    KEYWORDS
        .iter()
        .find_map(|kw| kw.strip_prefix(token).filter(|missing| !missing.is_empty()))
}

/// Byte length of a `\u` escape with fewer than four hex digits ending `text`.
fn partial_unicode_escape(text: &str) -> usize {
    let digits = text.bytes().rev().take(4).take_while(u8::is_ascii_hexdigit).count();
    let head = &text[..text.len() - digits];
    if digits == 4 || !head.ends_with("\\u") {
        return 0;
    }
    let slashes = head[..head.len() - 1]
        .bytes()
        .rev()
        .take_while(|&b| b == b'\\')
        .count();
    if slashes % 2 == 1 {
        digits + 2
    } else {
        0
    }
}

fn is_stray_control(c: char) -> bool {
    let code = c as u32;
    (code < 0x20 && !matches!(c, '\n' | '\r' | '\t')) || (0x7f..=0x9f).contains(&code)
}

fn trim_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end().len();
    if out[..trimmed].ends_with(',') {
        out.replace_range(trimmed - 1..trimmed, "");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    Open,
    Separator,
    ValueEnd,
}

/// Single pass over the text fixing the mistakes models make most often:
/// trailing commas before a closer, missing commas between adjacent values,
/// control characters, and raw newlines or tabs inside string literals.
pub(crate) fn fix_common_errors(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut scanner = Scanner::new();
    let mut prev = Prev::Start;
    let mut in_bare = false;

    for c in text.chars() {
        if is_stray_control(c) {
            continue;
        }
        match scanner.step(c) {
            Event::StringChar => match c {
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            },
            Event::EnterString | Event::Open(_) => {
                if prev == Prev::ValueEnd {
                    out.push(',');
                }
                out.push(c);
                in_bare = false;
                if c != '"' {
                    prev = Prev::Open;
                }
            }
            Event::ExitString => {
                out.push(c);
                prev = Prev::ValueEnd;
            }
            Event::Close(_) | Event::StrayClose(_) => {
                trim_trailing_comma(&mut out);
                out.push(c);
                in_bare = false;
                prev = Prev::ValueEnd;
            }
            Event::Separator(s) => {
                out.push(s);
                in_bare = false;
                prev = Prev::Separator;
            }
            Event::Whitespace => {
                out.push(c);
                in_bare = false;
            }
            Event::Bare(_) => {
                if !in_bare && prev == Prev::ValueEnd {
                    out.push(',');
                }
                out.push(c);
                in_bare = true;
                prev = Prev::ValueEnd;
            }
        }
    }
    out
}

/// Cut the text back to its last comma and close what is open there, dropping a
/// half-written trailing member. Tries the latest cut point first.
pub(crate) fn drop_incomplete_tail(text: &str) -> Option<String> {
    let mut scanner = Scanner::new();
    let mut cuts: Vec<(usize, Vec<Bracket>)> = Vec::new();
    for (i, c) in text.char_indices() {
        if scanner.step(c) == Event::Separator(',') {
            cuts.push((i, scanner.open_brackets().to_vec()));
        }
    }
    cuts.iter().rev().take(MAX_TAIL_CUTS).find_map(|(at, open)| {
        let mut candidate = text[..*at].trim_end().to_string();
        candidate.extend(open.iter().rev().map(|b| b.close()));
        is_valid_json(&candidate).then_some(candidate)
    })
}

/// Longest prefix ending in a closer that parses.
pub(crate) fn trim_trailing_content(text: &str) -> Option<&str> {
    text.char_indices()
        .rev()
        .filter(|(_, c)| matches!(c, '}' | ']'))
        .take(MAX_TRAILING_TRIES)
        .map(|(i, _)| &text[..=i])
        .find(|candidate| is_valid_json(candidate))
}

/// First balanced value, starting at any opening bracket, that parses.
pub(crate) fn extract_nested(text: &str) -> Option<&str> {
    text.char_indices()
        .filter(|(_, c)| Bracket::from_open(*c).is_some())
        .take(MAX_NESTED_STARTS)
        .find_map(|(start, _)| {
            let rest = &text[start..];
            let end = scan(rest).end?;
            let candidate = &rest[..end];
            is_valid_json(candidate).then_some(candidate)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"a\": 1}\n```").as_deref(),
            Some("{\"a\": 1}")
        );
        assert_eq!(
            strip_code_fences("Result:\n```\n[1, 2]\n```\nDone.").as_deref(),
            Some("Result:\n\n[1, 2]\n\nDone.")
        );
        assert_eq!(strip_code_fences("{\"a\": 1}"), None);
    }

    #[test]
    fn test_json_start() {
        assert_eq!(json_start("Sure! {\"ok\":true}"), Some(6));
        assert_eq!(json_start("plain words"), None);
    }

    #[test]
    fn test_close_drops_dangling_comma() {
        let text = r#"{"a": [1, 2, "#;
        let outcome = scan(text);
        assert_eq!(close_unterminated(text, &outcome), r#"{"a": [1, 2]}"#);
    }

    #[test]
    fn test_close_terminates_string() {
        let text = r#"{"a": 1, "b": "x"#;
        let outcome = scan(text);
        assert_eq!(close_unterminated(text, &outcome), r#"{"a": 1, "b": "x"}"#);
    }

    #[test]
    fn test_close_completes_cut_keywords() {
        for (text, expected) in [
            (r#"{"a": tru"#, r#"{"a": true}"#),
            (r#"{"a": 1, "b": fals"#, r#"{"a": 1, "b": false}"#),
            ("[nul", "[null]"),
            ("[true, n", "[true, null]"),
        ] {
            assert_eq!(close_unterminated(text, &scan(text)), expected);
        }
    }

    #[test]
    fn test_close_drops_partial_unicode_escape() {
        let text = r#"{"s": "ab\u00"#;
        assert_eq!(close_unterminated(text, &scan(text)), r#"{"s": "ab"}"#);
        let text = r#"{"s": "ab\u"#;
        assert_eq!(close_unterminated(text, &scan(text)), r#"{"s": "ab"}"#);
        // escaped backslash followed by a literal `u`
        let text = r#"{"s": "ab\\u12"#;
        assert_eq!(close_unterminated(text, &scan(text)), r#"{"s": "ab\\u12"}"#);
    }

    #[test]
    fn test_fix_missing_commas() {
        assert_eq!(fix_common_errors(r#"{"a":1 "b":2}"#), r#"{"a":1 ,"b":2}"#);
        assert_eq!(
            fix_common_errors(r#"[{"a":1} {"b":2}]"#),
            r#"[{"a":1} ,{"b":2}]"#
        );
        assert_eq!(
            fix_common_errors(r#"{"a":"x" "b":true}"#),
            r#"{"a":"x" ,"b":true}"#
        );
    }

    #[test]
    fn test_fix_trailing_commas() {
        assert_eq!(fix_common_errors(r#"{"a": [1, 2,], }"#), r#"{"a": [1, 2] }"#);
    }

    #[test]
    fn test_fix_leaves_valid_json_alone() {
        let valid = r#"{"a": [1, 2.5, -3e2], "b": {"c": null, "d": "x, y"}}"#;
        assert_eq!(fix_common_errors(valid), valid);
    }

    #[test]
    fn test_fix_escapes_raw_newlines_in_strings() {
        assert_eq!(
            fix_common_errors("{\"t\": \"a\nb\tc\"}"),
            "{\"t\": \"a\\nb\\tc\"}"
        );
        // outside strings a newline is plain whitespace
        assert_eq!(fix_common_errors("{\n\"t\": 1\n}"), "{\n\"t\": 1\n}");
    }

    #[test]
    fn test_fix_drops_control_characters() {
        assert_eq!(fix_common_errors("{\"a\": \"b\u{7}c\"}"), "{\"a\": \"bc\"}");
    }

    #[test]
    fn test_drop_incomplete_tail() {
        assert_eq!(
            drop_incomplete_tail(r#"{"a": 1, "b": "#).as_deref(),
            Some(r#"{"a": 1}"#)
        );
        assert_eq!(
            drop_incomplete_tail(r#"[1, 2, {"x": "#).as_deref(),
            Some("[1, 2]")
        );
        assert_eq!(drop_incomplete_tail(r#"{"a": "#), None);
    }

    #[test]
    fn test_trim_trailing_content() {
        assert_eq!(
            trim_trailing_content(r#"{"a": {"b": 1}} }"#),
            Some(r#"{"a": {"b": 1}}"#)
        );
        assert_eq!(trim_trailing_content("{oops"), None);
    }

    #[test]
    fn test_extract_nested() {
        assert_eq!(
            extract_nested(r#"[broken {"inner": true}"#),
            Some(r#"{"inner": true}"#)
        );
    }
}
