//! Batch and archive jobs against fake generation and tool ports.

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use codeport_core::{GenerationError, ToolResult};
use codeport_transform::{
    EMPTY_OR_REFUSED, FileFailure, FileStatus, FileTransformer, TransformConfig, TransformError,
};
use common::{FakeTools, FnGenerator, is_for, unzip, zip_of};

const INSTRUCTIONS: &str = "Port to Rust";

fn transformer(generator: Arc<FnGenerator>) -> FileTransformer {
    FileTransformer::new(generator, TransformConfig::new(INSTRUCTIONS))
}

#[tokio::test]
async fn partial_failure_returns_archive_and_reports_the_failed_file() {
    let generator = FnGenerator::new(|request| {
        if is_for(request, "c.py") {
            Err(GenerationError::Unreachable("connection refused".to_string()))
        } else {
            Ok("```rust\nfn ported() {}\n```".to_string())
        }
    });
    let bytes = zip_of(&[("a.py", "a = 1"), ("pkg/b.py", "b = 2"), ("c.py", "c = 3")]);

    let outcome = transformer(generator).transform_archive(bytes).await.unwrap();

    assert_eq!(outcome.report.succeeded(), 2);
    assert!(!outcome.report.all_failed());
    assert_eq!(
        outcome.report.failures(),
        vec![FileFailure {
            file: "c.py".to_string(),
            error: "Generation backend unreachable: connection refused".to_string(),
        }]
    );

    let entries = unzip(&outcome.archive.unwrap());
    assert_eq!(
        entries,
        vec![
            ("a.py".to_string(), "fn ported() {}".to_string()),
            ("c.py".to_string(), "c = 3".to_string()),
            ("pkg/b.py".to_string(), "fn ported() {}".to_string()),
        ]
    );
}

#[tokio::test]
async fn all_failed_returns_no_archive() {
    let generator = FnGenerator::new(|_| Ok("I cannot assist with that request.".to_string()));
    let bytes = zip_of(&[("a.py", "1"), ("b.js", "2"), ("c.rs", "3"), ("logo.png", "")]);

    let outcome = transformer(generator).transform_archive(bytes).await.unwrap();

    assert!(outcome.archive.is_none());
    assert!(outcome.report.all_failed());
    assert_eq!(outcome.report.skipped(), 1);

    let failures = outcome.report.failures();
    assert_eq!(failures.len(), 3);
    assert!(failures.iter().all(|f| f.error == EMPTY_OR_REFUSED));
}

#[tokio::test]
async fn escaping_archive_entry_fails_the_job() {
    let generator = FnGenerator::new(|_| Ok("x".to_string()));
    let bytes = zip_of(&[("ok.py", "1"), ("../evil.py", "2")]);

    let err = transformer(Arc::clone(&generator))
        .transform_archive(bytes)
        .await
        .unwrap_err();

    assert!(matches!(err, TransformError::UnsafeEntry(_)));
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn multi_file_emission_replaces_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("job");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("app.py"), "print('hi')").unwrap();

    let generator = FnGenerator::new(|_| {
        Ok("### FILE: pom.xml\n<project/>\n\
            ### FILE: src/main/java/App.java\n```java\nclass App {}\n```\n\
            ### FILE: ../escape.txt\nnope"
            .to_string())
    });

    let report = transformer(generator).run_batch(&root).await.unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, FileStatus::Success);
    assert_eq!(outcome.outputs, ["pom.xml", "src/main/java/App.java"]);
    assert!(!root.join("app.py").exists());
    assert_eq!(fs::read_to_string(root.join("pom.xml")).unwrap(), "<project/>");
    assert_eq!(
        fs::read_to_string(root.join("src/main/java/App.java")).unwrap(),
        "class App {}"
    );
    assert!(!dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn emission_rewriting_the_input_keeps_it() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.rs"), "old").unwrap();

    let generator =
        FnGenerator::new(|_| Ok("### FILE: main.rs\nfn main() {}\n### FILE: lib.rs\n".to_string()));
    let report = transformer(generator).run_batch(dir.path()).await.unwrap();

    assert_eq!(report.outcomes[0].outputs, ["main.rs", "lib.rs"]);
    assert_eq!(
        fs::read_to_string(dir.path().join("main.rs")).unwrap(),
        "fn main() {}"
    );
}

#[tokio::test]
async fn only_unsafe_emission_falls_back_to_single_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "old").unwrap();

    let generator = FnGenerator::new(|_| Ok("### FILE: /etc/passwd\nroot".to_string()));
    let report = transformer(generator).run_batch(dir.path()).await.unwrap();

    // The raw text, marker included, becomes the file's content
    assert_eq!(report.outcomes[0].status, FileStatus::Success);
    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "### FILE: /etc/passwd\nroot"
    );
}

#[tokio::test]
async fn unreadable_file_is_a_per_file_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bin.txt"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

    let generator = FnGenerator::new(|_| Ok("x".to_string()));
    let report = transformer(Arc::clone(&generator))
        .run_batch(dir.path())
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].status, FileStatus::Error);
    assert!(report.outcomes[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("could not read file:"));
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn knowledge_base_context_is_injected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("handler.py"), "def h(): pass").unwrap();

    let generator = FnGenerator::new(|_| Ok("fn h() {}".to_string()));
    let tools = Arc::new(
        FakeTools::new().with_tool("query", ToolResult::success("Prefer axum extractors.")),
    );
    let transformer = transformer(Arc::clone(&generator)).with_tools(Arc::clone(&tools));

    transformer.run_batch(dir.path()).await.unwrap();

    let calls = tools.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "query");
    assert_eq!(calls[0].1["question"], "Port to Rust handler.py");

    let request = &generator.requests()[0];
    assert!(request.system.contains("--- KNOWLEDGE BASE CONTEXT ---"));
    assert!(request.system.contains("Prefer axum extractors."));
    // Not agentic: no catalog offered
    assert!(!request.system.contains("Available tools:"));
    assert!(request.prompt.starts_with("CURRENT FILE: handler.py\nINSTRUCTION: Port to Rust\n"));
}

#[tokio::test]
async fn knowledge_base_errors_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.py"), "x").unwrap();

    let generator = FnGenerator::new(|_| Ok("y".to_string()));
    // Connected tools, but none named "query"
    let tools = Arc::new(FakeTools::new().with_tool("search", ToolResult::success("hit")));
    let report = transformer(Arc::clone(&generator))
        .with_tools(Arc::clone(&tools))
        .run_batch(dir.path())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(tools.calls().len(), 1);
    assert!(!generator.requests()[0].system.contains("KNOWLEDGE BASE"));
}

#[tokio::test]
async fn agentic_mode_runs_tool_calls_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.py"), "x = 1").unwrap();

    let generator = FnGenerator::new(|request| {
        if request.prompt.contains("### TOOL_RESULT: lookup") {
            Ok("let x = 1;".to_string())
        } else {
            Ok("### TOOL_CALL: lookup\n```json\n{\"symbol\": \"x\"}\n```".to_string())
        }
    });
    let tools = Arc::new(
        FakeTools::new()
            .with_tool("query", ToolResult::error("index missing"))
            .with_tool("lookup", ToolResult::success("x is an integer")),
    );
    let config = TransformConfig::new(INSTRUCTIONS).with_agentic(true);
    let transformer =
        FileTransformer::new(Arc::clone(&generator) as _, config).with_tools(Arc::clone(&tools));

    let report = transformer.run_batch(dir.path()).await.unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(fs::read_to_string(dir.path().join("a.py")).unwrap(), "let x = 1;");

    let requests = generator.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].system.contains("Available tools:\n- query\n- lookup"));
    assert!(requests[0].system.contains("### TOOL_CALL: <tool_name>"));

    let names: Vec<_> = tools.calls().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["query", "lookup"]);
}

#[tokio::test]
async fn files_in_flight_are_bounded() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..6 {
        fs::write(dir.path().join(format!("f{i}.py")), "pass").unwrap();
    }

    let generator = FnGenerator::slow(Duration::from_millis(30), |_| Ok("ok".to_string()));
    let config = TransformConfig::new(INSTRUCTIONS).with_max_in_flight(2);
    let report = FileTransformer::new(Arc::clone(&generator) as _, config)
        .run_batch(dir.path())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 6);
    assert!(generator.peak() <= 2);

    let serial = FnGenerator::slow(Duration::from_millis(10), |_| Ok("ok".to_string()));
    transformer(Arc::clone(&serial)).run_batch(dir.path()).await.unwrap();
    assert_eq!(serial.peak(), 1);
}
