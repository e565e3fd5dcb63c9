//! Tool-call micro-protocol embedded in model output.
//!
//! A call is a `### TOOL_CALL: <name>` line followed by a fenced block
//! (optionally tagged `json`) holding a JSON object of arguments:
//!
//! ````text
//! ### TOOL_CALL: read_file
//! ```json
//! {"path": "src/main.rs"}
//! ```
//! ````
//!
//! A resolved call is rewritten in place as a `### TOOL_RESULT: <name>`
//! block with the result in a plain fence.

use std::sync::LazyLock;

use codeport_core::{ToolArguments, ToolCall};
use regex::{Captures, Regex};
use serde_json::Value;

/// Marker opening a tool call.
pub const TOOL_CALL_MARKER: &str = "### TOOL_CALL:";

/// Marker opening a substituted result.
pub const TOOL_RESULT_MARKER: &str = "### TOOL_RESULT:";

const TOOL_CALL_PATTERN: &str = r"(?s)### TOOL_CALL:\s*(\S+)\s*\n```(?:json)?\s*\n(.*?)\n```";

static TOOL_CALL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(TOOL_CALL_PATTERN).ok());

fn pattern() -> Option<&'static Regex> {
    TOOL_CALL_RE.as_ref()
}

/// Name and parsed arguments of one matched block, if the body is a JSON object.
fn parse_block(caps: &Captures<'_>) -> (String, Result<ToolArguments, String>) {
    let name = caps[1].trim().to_string();
    let body = caps[2].trim();
    let arguments = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("arguments must be a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    };
    (name, arguments)
}

/// Extract tool calls in order of appearance.
///
/// Blocks whose body is not a JSON object are skipped with a warning.
pub fn extract(text: &str) -> Vec<ToolCall> {
    let Some(re) = pattern() else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|caps| match parse_block(&caps) {
            (name, Ok(arguments)) => Some(ToolCall::new(name, arguments)),
            (name, Err(reason)) => {
                tracing::warn!(tool = %name, reason = %reason, "Skipping malformed tool call");
                None
            }
        })
        .collect()
}

/// Whether `text` contains at least one well-formed tool call.
pub fn has_tool_calls(text: &str) -> bool {
    !extract(text).is_empty()
}

/// Render a substituted result block.
pub fn result_block(tool_name: &str, result: &str) -> String {
    format!("{TOOL_RESULT_MARKER} {tool_name}\n```\n{result}\n```")
}

/// Replace the first call block matching `tool_name` and `arguments` with
/// a result block.
///
/// Blocks with the same name but different arguments are left alone, so
/// repeated calls resolve one at a time. Text without a matching block is
/// returned unchanged.
pub fn substitute(text: &str, tool_name: &str, arguments: &ToolArguments, result: &str) -> String {
    let Some(re) = pattern() else {
        return text.to_string();
    };

    let target = re.captures_iter(text).find_map(|caps| {
        let (name, parsed) = parse_block(&caps);
        let matches = name == tool_name && parsed.as_ref().is_ok_and(|args| args == arguments);
        matches.then(|| caps.get(0).map(|m| m.range())).flatten()
    });

    match target {
        Some(range) => {
            let mut out = String::with_capacity(text.len() + result.len());
            out.push_str(&text[..range.start]);
            out.push_str(&result_block(tool_name, result));
            out.push_str(&text[range.end..]);
            out
        }
        None => text.to_string(),
    }
}
