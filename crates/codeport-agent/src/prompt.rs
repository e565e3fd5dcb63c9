//! Prompt fragments exchanged with the model around tool calls.

use codeport_core::{ToolCall, ToolResult, ToolStatus};
use serde_json::Value;

use crate::parser::TOOL_RESULT_MARKER;

/// Instructions appended to the system prompt when tools are offered.
pub fn tool_call_instructions() -> &'static str {
    r#"
To use a tool, output a tool call block in this exact format:

### TOOL_CALL: <tool_name>
```json
{
  "param1": "value1",
  "param2": "value2"
}
```

The tool will be executed and the result will be provided back to you.
You can make multiple tool calls in sequence if needed.
"#
}

/// Follow-up line closing every results block.
pub const CONTINUE_PROMPT: &str = "Continue with your response, using the tool results above. \
If you need more information, make another tool call. \
Otherwise, provide your final output.";

/// One executed call and what came of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRecord {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// Render a turn's results for the model.
///
/// ````text
/// ### TOOL_RESULT: search
/// Arguments: {"q":"rust"}
/// Status: success
/// ```
/// ...
/// ```
/// ````
///
/// Failed calls carry `Error: <message>` instead of a fenced result.
pub fn format_tool_results(records: &[ToolCallRecord]) -> String {
    records
        .iter()
        .map(|record| {
            let arguments = Value::Object(record.call.arguments.clone());
            let body = match record.result.status {
                ToolStatus::Success => format!("```\n{}\n```", record.result.text),
                ToolStatus::Error => format!("Error: {}", record.result.text),
            };
            format!(
                "{TOOL_RESULT_MARKER} {}\nArguments: {arguments}\nStatus: {}\n{body}",
                record.call.name, record.result.status
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Extend the transcript with a turn's output and its tool results.
pub fn append_turn(transcript: &str, output: &str, results: &str) -> String {
    format!(
        "{transcript}\n\nAssistant:\n{output}\n\nSystem (Tool Results):\n{results}\n\n{CONTINUE_PROMPT}"
    )
}
