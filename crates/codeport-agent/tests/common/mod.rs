//! Hand-written port fakes for agent loop tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use codeport_core::{
    GenerationError, GenerationRequest, TextGenerator, ToolArguments, ToolExecError,
    ToolExecutor, ToolResult,
};

/// Replays canned responses in order, repeating the last one forever.
pub struct ScriptedGenerator {
    responses: Vec<Result<String, String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(|r| Ok(r.into())).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call from position `at` onwards.
    pub fn failing_at(mut self, at: usize, message: &str) -> Self {
        self.responses.truncate(at);
        self.responses.push(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let idx = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };
        let response = self
            .responses
            .get(idx)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_else(|| Ok(String::new()));
        response.map_err(GenerationError::Unreachable)
    }
}

enum Behaviour {
    Reply(ToolResult),
    Fail(String),
    Hang,
}

/// Answers tool calls from a fixed table and records every call.
#[derive(Default)]
pub struct RecordingExecutor {
    behaviours: HashMap<String, Behaviour>,
    calls: Mutex<Vec<(String, ToolArguments)>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, tool: &str, result: ToolResult) -> Self {
        self.behaviours.insert(tool.to_string(), Behaviour::Reply(result));
        self
    }

    pub fn with_failure(mut self, tool: &str, message: &str) -> Self {
        self.behaviours
            .insert(tool.to_string(), Behaviour::Fail(message.to_string()));
        self
    }

    pub fn with_hang(mut self, tool: &str) -> Self {
        self.behaviours.insert(tool.to_string(), Behaviour::Hang);
        self
    }

    pub fn calls(&self) -> Vec<(String, ToolArguments)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for RecordingExecutor {
    async fn execute(
        &self,
        tool_name: &str,
        arguments: &ToolArguments,
    ) -> Result<ToolResult, ToolExecError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool_name.to_string(), arguments.clone()));

        match self.behaviours.get(tool_name) {
            Some(Behaviour::Reply(result)) => Ok(result.clone()),
            Some(Behaviour::Fail(message)) => Err(ToolExecError::Failed {
                tool: tool_name.to_string(),
                message: message.clone(),
            }),
            Some(Behaviour::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ToolResult::success("too late"))
            }
            None => Err(ToolExecError::NotFound(tool_name.to_string())),
        }
    }
}

/// A tool-call block as a model would write it.
pub fn call_block(name: &str, json: &str) -> String {
    format!("### TOOL_CALL: {name}\n```json\n{json}\n```")
}
