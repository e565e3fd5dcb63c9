//! Per-file processing and the bounded batch driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use codeport_agent::{AgentConfig, run_agentic};
use codeport_core::{
    AppSettings, GenerationOptions, GenerationRequest, TextGenerator, ToolArguments, ToolCatalog,
    ToolExecutor, ToolHost,
};
use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::archive::{self, relative_name};
use crate::eligibility;
use crate::emission::{self, EmittedFile};
use crate::error::TransformError;
use crate::prompt::{knowledge_block, rag_query, system_prompt, user_prompt};
use crate::report::{BatchReport, FileOutcome};

/// Error text for a response that yielded nothing usable.
pub const EMPTY_OR_REFUSED: &str = "LLM returned empty or refused response";

/// Settings for one transform job.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// What the model is asked to do with every file.
    pub instructions: String,
    /// Run the agentic loop instead of a single generation call.
    pub agentic: bool,
    pub options: GenerationOptions,
    pub max_turns: u32,
    pub tool_timeout: Duration,
    /// Files processed at once. Clamped to at least 1.
    pub max_in_flight: usize,
    /// Tool queried for knowledge-base context.
    pub rag_tool: String,
}

impl TransformConfig {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self::from_settings(&AppSettings::default(), instructions)
    }

    pub fn from_settings(settings: &AppSettings, instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            agentic: settings.agentic,
            options: settings.generation_options(),
            max_turns: settings.max_turns,
            tool_timeout: settings.tool_timeout,
            max_in_flight: settings.max_files_in_flight,
            rag_tool: settings.rag_tool.clone(),
        }
    }

    #[must_use]
    pub const fn with_agentic(mut self, agentic: bool) -> Self {
        self.agentic = agentic;
        self
    }

    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    fn agent_config(&self) -> AgentConfig {
        AgentConfig::default()
            .with_max_turns(self.max_turns)
            .with_options(self.options.clone())
            .with_tool_timeout(self.tool_timeout)
    }
}

/// Result of transforming an uploaded archive.
#[derive(Debug)]
pub struct ArchiveOutcome {
    pub report: BatchReport,
    /// The repacked job directory; `None` when every processed file failed.
    pub archive: Option<Vec<u8>>,
}

/// The two faces of a tool host, held separately.
#[derive(Clone)]
struct Tools {
    catalog: Arc<dyn ToolCatalog>,
    executor: Arc<dyn ToolExecutor>,
}

/// Runs files through the model and writes the results back.
#[derive(Clone)]
pub struct FileTransformer {
    generator: Arc<dyn TextGenerator>,
    tools: Option<Tools>,
    config: Arc<TransformConfig>,
}

impl FileTransformer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: TransformConfig) -> Self {
        Self {
            generator,
            tools: None,
            config: Arc::new(config),
        }
    }

    /// Offer connected tools for RAG lookups and agentic runs.
    #[must_use]
    pub fn with_tools<T: ToolHost + 'static>(mut self, tools: Arc<T>) -> Self {
        self.tools = Some(Tools {
            catalog: Arc::clone(&tools) as Arc<dyn ToolCatalog>,
            executor: tools,
        });
        self
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Process one file under `root`. Never fails: problems become the
    /// file's outcome.
    pub async fn process_file(&self, root: &Path, path: &Path) -> FileOutcome {
        let file = relative_name(root, path);
        if let Err(reason) = eligibility::check(path) {
            debug!(file = %file, reason = %reason, "Skipping file");
            return FileOutcome::skipped(file, reason.to_string());
        }

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %file, error = %e, "Could not read file");
                return FileOutcome::error(file, format!("could not read file: {e}"));
            }
        };

        let filename = path
            .file_name()
            .map_or_else(|| file.clone(), |n| n.to_string_lossy().into_owned());

        let raw = match self.generate(&filename, &content).await {
            Ok(raw) => raw,
            Err(message) => {
                warn!(file = %file, error = %message, "Generation failed");
                return FileOutcome::error(file, message);
            }
        };
        debug!(file = %file, chars = raw.len(), "Model responded");

        match self.write_output(root, path, &file, &raw).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(file = %file, error = %e, "Could not write output");
                FileOutcome::error(file, e.to_string())
            }
        }
    }

    async fn generate(&self, filename: &str, content: &str) -> Result<String, String> {
        let tools = self.tools.as_ref();
        let knowledge = match tools {
            Some(tools) => self.knowledge(tools, filename).await,
            None => None,
        };

        let catalog = match tools {
            Some(tools) if self.config.agentic => {
                if tools.catalog.tools().await.is_empty() {
                    debug!("Agentic mode without connected tools, generating once");
                    None
                } else {
                    Some(tools.catalog.format_for_prompt().await)
                }
            }
            _ => None,
        };

        let system = system_prompt(knowledge.as_deref(), catalog.as_deref());
        let prompt = user_prompt(filename, &self.config.instructions, content);

        match (tools, catalog.is_some()) {
            (Some(tools), true) => {
                let outcome = run_agentic(
                    self.generator.as_ref(),
                    tools.executor.as_ref(),
                    &system,
                    &prompt,
                    &self.config.agent_config(),
                )
                .await
                .map_err(|e| e.to_string())?;
                if outcome.exhausted {
                    warn!(file = %filename, turns = outcome.turns, "Turn budget exhausted");
                }
                Ok(outcome.output)
            }
            _ => {
                let request =
                    GenerationRequest::new(prompt, system).with_options(self.config.options.clone());
                self.generator
                    .generate(&request)
                    .await
                    .map_err(|e| e.to_string())
            }
        }
    }

    /// Query the knowledge-base tool. Failures only cost the context.
    async fn knowledge(&self, tools: &Tools, filename: &str) -> Option<String> {
        if tools.catalog.tools().await.is_empty() {
            return None;
        }

        let question = rag_query(&self.config.instructions, filename);
        debug!(tool = %self.config.rag_tool, query = %question, "Querying knowledge base");
        let mut arguments = ToolArguments::new();
        arguments.insert("question".to_string(), Value::String(question));

        let call = tools.executor.execute(&self.config.rag_tool, &arguments);
        match tokio::time::timeout(self.config.tool_timeout, call).await {
            Ok(Ok(result)) if result.is_success() => {
                let block = knowledge_block(&result.text);
                if block.is_some() {
                    info!(chars = result.text.len(), "Retrieved knowledge base context");
                } else {
                    debug!("No relevant knowledge base context");
                }
                block
            }
            Ok(Ok(result)) => {
                debug!(error = %result.text, "Knowledge base query reported an error");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Knowledge base query failed");
                None
            }
            Err(_) => {
                warn!(after = ?self.config.tool_timeout, "Knowledge base query timed out");
                None
            }
        }
    }

    async fn write_output(
        &self,
        root: &Path,
        path: &Path,
        file: &str,
        raw: &str,
    ) -> Result<FileOutcome, TransformError> {
        if let Some(files) = emission::parse_multi_file(raw).filter(|f| !f.is_empty()) {
            let outputs = write_emitted(root, &files).await?;
            if !outputs.iter().any(|o| o == file) {
                tokio::fs::remove_file(path)
                    .await
                    .map_err(|e| TransformError::io(path, e))?;
            }
            info!(file = %file, outputs = ?outputs, "Converted into new files");
            return Ok(FileOutcome::success(file, outputs));
        }

        let Some(cleaned) = emission::clean_single(raw) else {
            warn!(
                file = %file,
                raw_len = raw.len(),
                "Model returned an empty or refused response"
            );
            return Ok(FileOutcome::error(file, EMPTY_OR_REFUSED));
        };

        tokio::fs::write(path, cleaned)
            .await
            .map_err(|e| TransformError::io(path, e))?;
        info!(file = %file, "Rewrote file");
        Ok(FileOutcome::success(file, vec![file.to_string()]))
    }

    /// Process every file under `root`, at most `max_in_flight` at a time.
    pub async fn run_batch(&self, root: &Path) -> Result<BatchReport, TransformError> {
        let listed = root.to_path_buf();
        let files = tokio::task::spawn_blocking(move || archive::list_files(&listed))
            .await
            .map_err(|e| TransformError::Task(e.to_string()))??;

        let gate = Semaphore::new(self.config.max_in_flight.max(1));
        let gate = &gate;
        let outcomes = join_all(files.iter().map(|path| async move {
            let _permit = gate.acquire().await;
            self.process_file(root, path).await
        }))
        .await;

        let report = BatchReport::new(outcomes);
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Batch finished"
        );
        Ok(report)
    }

    /// Extract `bytes` into a fresh job directory, run the batch, and repack.
    pub async fn transform_archive(&self, bytes: Vec<u8>) -> Result<ArchiveOutcome, TransformError> {
        let job = tempfile::tempdir().map_err(|e| TransformError::io(std::env::temp_dir(), e))?;
        let root = job.path().join("source");

        let dest = root.clone();
        tokio::task::spawn_blocking(move || archive::extract_zip(&bytes, &dest))
            .await
            .map_err(|e| TransformError::Task(e.to_string()))??;

        let report = self.run_batch(&root).await?;
        if report.all_failed() {
            warn!(failed = report.failed(), "Every file failed processing");
            return Ok(ArchiveOutcome {
                report,
                archive: None,
            });
        }

        let packed = tokio::task::spawn_blocking(move || archive::pack_dir(&root))
            .await
            .map_err(|e| TransformError::Task(e.to_string()))??;
        Ok(ArchiveOutcome {
            report,
            archive: Some(packed),
        })
    }
}

async fn write_emitted(root: &Path, files: &[EmittedFile]) -> Result<Vec<String>, TransformError> {
    let mut outputs = Vec::with_capacity(files.len());
    for emitted in files {
        let target: PathBuf = root.join(&emitted.path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TransformError::io(parent, e))?;
        }
        tokio::fs::write(&target, &emitted.content)
            .await
            .map_err(|e| TransformError::io(&target, e))?;
        outputs.push(relative_name(root, &target));
    }
    Ok(outputs)
}
