//! Bounded generate / execute / append loop.

use std::time::Duration;

use codeport_core::{
    GenerationOptions, GenerationRequest, TextGenerator, ToolCall, ToolExecutor, ToolResult,
};

use crate::error::AgentError;
use crate::parser;
use crate::prompt::{ToolCallRecord, append_turn, format_tool_results};

/// Default number of generation turns.
pub const DEFAULT_MAX_TURNS: u32 = 5;

/// Default deadline for a single tool call.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

const PREVIEW_CHARS: usize = 300;

/// Knobs for one agentic run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Upper bound on generation calls.
    pub max_turns: u32,
    pub options: GenerationOptions,
    pub tool_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            options: GenerationOptions::default(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

impl AgentConfig {
    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }
}

/// What an agentic run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutcome {
    /// The final turn's raw output.
    pub output: String,
    /// Generation calls made.
    pub turns: u32,
    /// True when the budget ran out while the model was still calling tools.
    pub exhausted: bool,
    /// Every executed call, across all turns, in execution order.
    pub calls: Vec<ToolCallRecord>,
}

/// Run the agentic loop.
///
/// Each turn generates from the transcript so far. Output without tool
/// calls is returned immediately. Otherwise every call is executed in
/// order, one at a time, and the output plus a results block is appended
/// to the transcript before the next turn. When `max_turns` is reached the
/// last output is returned with `exhausted` set.
pub async fn run_agentic(
    generator: &dyn TextGenerator,
    tools: &dyn ToolExecutor,
    system: &str,
    prompt: &str,
    config: &AgentConfig,
) -> Result<AgentOutcome, AgentError> {
    if config.max_turns == 0 {
        return Err(AgentError::ZeroTurnBudget);
    }

    tracing::info!(max_turns = config.max_turns, "Starting agentic loop");

    let mut transcript = prompt.to_string();
    let mut calls = Vec::new();
    let mut output = String::new();

    for turn in 1..=config.max_turns {
        let request = GenerationRequest::new(transcript.as_str(), system)
            .with_options(config.options.clone());
        output = generator
            .generate(&request)
            .await
            .map_err(|source| AgentError::Generation { turn, source })?;

        tracing::debug!(
            turn,
            max_turns = config.max_turns,
            preview = %preview(&output),
            "Agent turn output"
        );

        let turn_calls = parser::extract(&output);
        if turn_calls.is_empty() {
            tracing::info!(turn, "No tool calls, returning final output");
            return Ok(AgentOutcome {
                output,
                turns: turn,
                exhausted: false,
                calls,
            });
        }

        tracing::info!(turn, tool_count = turn_calls.len(), "Executing tool calls");
        let records = execute_calls(tools, turn_calls, config.tool_timeout).await;
        transcript = append_turn(&transcript, &output, &format_tool_results(&records));
        calls.extend(records);
    }

    tracing::warn!(max_turns = config.max_turns, "Turn budget exhausted, returning last output");
    Ok(AgentOutcome {
        output,
        turns: config.max_turns,
        exhausted: true,
        calls,
    })
}

/// Execute calls sequentially in the given order.
pub async fn execute_calls(
    tools: &dyn ToolExecutor,
    calls: Vec<ToolCall>,
    timeout: Duration,
) -> Vec<ToolCallRecord> {
    let mut records = Vec::with_capacity(calls.len());
    for call in calls {
        let result = execute_one(tools, &call, timeout).await;
        records.push(ToolCallRecord { call, result });
    }
    records
}

/// Execute one call, folding dispatch failures into an error result.
async fn execute_one(
    tools: &dyn ToolExecutor,
    call: &ToolCall,
    timeout: Duration,
) -> ToolResult {
    dispatch(tools, call, timeout)
        .await
        .unwrap_or_else(ToolResult::error)
}

/// Run one call. `Err` carries the message of a call that never produced a
/// result (not found, transport failure, timeout); a result the tool itself
/// flagged as an error is still `Ok`.
pub(crate) async fn dispatch(
    tools: &dyn ToolExecutor,
    call: &ToolCall,
    timeout: Duration,
) -> Result<ToolResult, String> {
    match tokio::time::timeout(timeout, tools.execute(&call.name, &call.arguments)).await {
        Ok(Ok(result)) => {
            if result.is_success() {
                tracing::info!(tool = %call.name, "Tool succeeded");
            } else {
                tracing::warn!(tool = %call.name, error = %result.text, "Tool reported an error");
            }
            Ok(result)
        }
        Ok(Err(e)) => {
            tracing::warn!(tool = %call.name, error = %e, "Tool failed");
            Err(e.to_string())
        }
        Err(_) => {
            tracing::warn!(tool = %call.name, timeout_secs = timeout.as_secs(), "Tool timed out");
            Err(format!("Tool '{}' timed out after {timeout:?}", call.name))
        }
    }
}

fn preview(output: &str) -> String {
    output
        .chars()
        .take(PREVIEW_CHARS)
        .collect::<String>()
        .replace('\n', "\\n")
}
