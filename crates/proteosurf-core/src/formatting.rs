//! Formatting utilities for tool display and results
//!
//! This module provides consistent truncation of tool results for both the
//! event stream and LLM re-injection, plus display formatting of tool calls.

use serde_json::Value;

// ============================================================================
// Truncation utilities
// ============================================================================

/// Marker appended when a result has been cut
const TRUNCATION_MARKER: &str = "... [truncated]";

/// Truncate a string to at most `max` bytes, appending a marker if cut.
///
/// The marker is budgeted inside `max`, so the returned string never exceeds
/// the cap. Cuts land on a UTF-8 boundary. A cap too small to hold the marker
/// degrades to a plain boundary-safe cut.
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    if max <= TRUNCATION_MARKER.len() {
        return s[..floor_char_boundary(s, max)].to_string();
    }
    let keep = floor_char_boundary(s, max - TRUNCATION_MARKER.len());
    format!("{}{}", &s[..keep], TRUNCATION_MARKER)
}

/// Largest index `<= max` that lies on a char boundary of `s`
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Truncation caps applied to every tool result.
///
/// The two caps are independent policy knobs: `stream` bounds the preview
/// shown to the observing consumer, `model` bounds what is re-injected into
/// the model's context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncationCaps {
    /// Cap for the consumer-facing preview (bytes)
    pub stream: usize,
    /// Cap for the model-facing re-injection (bytes)
    pub model: usize,
}

impl Default for TruncationCaps {
    fn default() -> Self {
        Self {
            stream: 2000,
            model: 4000,
        }
    }
}

impl TruncationCaps {
    /// Truncate a raw result for the event stream
    pub fn for_stream(&self, raw: &str) -> String {
        truncate_str(raw, self.stream)
    }

    /// Truncate a raw result for re-injection into the model context
    pub fn for_model(&self, raw: &str) -> String {
        truncate_str(raw, self.model)
    }
}

// ============================================================================
// Display formatting
// ============================================================================

/// Format a tool call for display, e.g. `fetch_structure(pdb_id: "4LDJ")`
pub fn format_tool_call(name: &str, arguments: &Value) -> String {
    let args = match arguments {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, format_arg_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => format_arg_value(other),
    };
    format!("{}({})", name, args)
}

fn format_arg_value(v: &Value) -> String {
    match v {
        Value::String(s) => format!("\"{}\"", truncate_str(s, 60)),
        other => truncate_str(&other.to_string(), 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(truncate_str("hello", 100), "hello");
        assert_eq!(truncate_str("", 0), "");
    }

    #[test]
    fn truncation_never_exceeds_cap() {
        let long = "x".repeat(10_000);
        for cap in [0, 1, 10, 15, 16, 100, 2000, 4000] {
            let cut = truncate_str(&long, cap);
            assert!(cut.len() <= cap, "cap {} produced {} bytes", cap, cut.len());
        }
    }

    #[test]
    fn truncation_is_deterministic() {
        let raw = "a".repeat(5000);
        assert_eq!(truncate_str(&raw, 2000), truncate_str(&raw, 2000));
    }

    #[test]
    fn truncation_marks_the_cut() {
        let cut = truncate_str(&"y".repeat(500), 100);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert_eq!(cut.len(), 100);
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        // Multi-byte chars: a naive byte slice would panic
        let raw = "å".repeat(3000); // 2 bytes each
        let cut = truncate_str(&raw, 2001);
        assert!(cut.len() <= 2001);
        assert!(cut.is_char_boundary(cut.len()));
    }

    #[test]
    fn caps_are_independent() {
        let caps = TruncationCaps { stream: 10, model: 50 };
        let raw = "z".repeat(200);
        assert!(caps.for_stream(&raw).len() <= 10);
        assert!(caps.for_model(&raw).len() <= 50);
        assert_ne!(caps.for_stream(&raw), caps.for_model(&raw));
    }

    #[test]
    fn format_tool_call_object_args() {
        let s = format_tool_call("fetch_structure", &json!({"pdb_id": "4LDJ"}));
        assert_eq!(s, "fetch_structure(pdb_id: \"4LDJ\")");
    }

    #[test]
    fn format_tool_call_empty_args() {
        let s = format_tool_call("list_voices", &json!({}));
        assert_eq!(s, "list_voices()");
    }
}
