//! In-place resolution of tool calls inside a piece of text.

use std::time::Duration;

use codeport_core::ToolExecutor;

use crate::agent_loop::dispatch;
use crate::parser;

/// Execute the calls found in `text` and substitute each result where its
/// call stood, repeating while new calls appear, for at most
/// `max_iterations` passes.
///
/// A call that could not be dispatched is substituted as
/// `Error executing tool: <message>`. Text of a result the tool flagged as an
/// error is substituted unchanged.
pub async fn resolve_in_place(
    tools: &dyn ToolExecutor,
    text: &str,
    max_iterations: u32,
    timeout: Duration,
) -> String {
    let mut text = text.to_string();

    for iteration in 1..=max_iterations {
        let calls = parser::extract(&text);
        if calls.is_empty() {
            break;
        }
        tracing::debug!(iteration, tool_count = calls.len(), "Resolving tool calls in place");

        for call in calls {
            let replacement = match dispatch(tools, &call, timeout).await {
                Ok(result) => result.text,
                Err(message) => format!("Error executing tool: {message}"),
            };
            text = parser::substitute(&text, &call.name, &call.arguments, &replacement);
        }
    }

    text
}
