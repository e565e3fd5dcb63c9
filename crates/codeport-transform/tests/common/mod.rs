//! Port fakes and archive helpers for transform tests.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use codeport_core::{
    GenerationError, GenerationRequest, TextGenerator, ToolArguments, ToolCatalog,
    ToolDescriptor, ToolExecError, ToolExecutor, ToolResult,
};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

type Respond = dyn Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync;

/// Generator answering through a closure, recording every request.
pub struct FnGenerator {
    respond: Box<Respond>,
    delay: Duration,
    requests: Mutex<Vec<GenerationRequest>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FnGenerator {
    pub fn new(
        respond: impl Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self::build(respond, Duration::ZERO))
    }

    pub fn slow(
        delay: Duration,
        respond: impl Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self::build(respond, delay))
    }

    fn build(
        respond: impl Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync + 'static,
        delay: Duration,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delay,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Most generations observed running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FnGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = (self.respond)(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// Whether a request is for the named file.
pub fn is_for(request: &GenerationRequest, filename: &str) -> bool {
    request.prompt.starts_with(&format!("CURRENT FILE: {filename}\n"))
}

/// Tool host with fixed per-tool replies.
#[derive(Default)]
pub struct FakeTools {
    replies: Vec<(String, ToolResult)>,
    calls: Mutex<Vec<(String, ToolArguments)>>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: &str, reply: ToolResult) -> Self {
        self.replies.push((name.to_string(), reply));
        self
    }

    pub fn calls(&self) -> Vec<(String, ToolArguments)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolCatalog for FakeTools {
    async fn tools(&self) -> Vec<ToolDescriptor> {
        self.replies
            .iter()
            .map(|(name, _)| ToolDescriptor::new("fake", name.clone()))
            .collect()
    }

    async fn format_for_prompt(&self) -> String {
        let names: Vec<_> = self.replies.iter().map(|(n, _)| format!("- {n}")).collect();
        format!("Available tools:\n{}", names.join("\n"))
    }
}

#[async_trait]
impl ToolExecutor for FakeTools {
    async fn execute(
        &self,
        tool_name: &str,
        arguments: &ToolArguments,
    ) -> Result<ToolResult, ToolExecError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool_name.to_string(), arguments.clone()));
        self.replies
            .iter()
            .find(|(name, _)| name == tool_name)
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| ToolExecError::NotFound(tool_name.to_string()))
    }
}

pub fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Every entry of an archive as (name, content), sorted by name.
pub fn unzip(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        entries.push((entry.name().to_string(), content));
    }
    entries.sort();
    entries
}
