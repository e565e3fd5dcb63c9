//! Shared fixtures for router tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use codeport_axum::{AxumContext, CorsConfig, create_router};
use codeport_core::{AppSettings, GenerationError, GenerationRequest, TextGenerator};
use codeport_mcp::{McpManager, McpTimeouts};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Minimal stdio MCP server with one `echo` tool.
const SERVER_SCRIPT: &str = r##"
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/^{"jsonrpc":"2.0","id":\([0-9]*\),.*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '%s\n' "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"protocolVersion\":\"2024-11-05\",\"capabilities\":{\"tools\":{}},\"serverInfo\":{\"name\":\"scripted\",\"version\":\"0.1.0\"}}}"
      ;;
    *'"method":"tools/list"'*)
      printf '%s\n' "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"tools\":[{\"name\":\"echo\",\"description\":\"Echo a message\",\"inputSchema\":{\"type\":\"object\"}}]}}"
      ;;
    *'"name":"echo"'*)
      printf '%s\n' "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"echo: hello\"}]}}"
      ;;
  esac
done
"##;

pub struct ScriptedServer {
    _dir: TempDir,
    pub path: PathBuf,
}

impl ScriptedServer {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.sh");
        std::fs::write(&path, SERVER_SCRIPT).unwrap();
        Self { _dir: dir, path }
    }

    /// Connect request body for this server.
    pub fn connect_body(&self) -> serde_json::Value {
        serde_json::json!({
            "transport": "stdio",
            "command": "sh",
            "args": [self.path.to_string_lossy()],
        })
    }
}

type Respond = dyn Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync;

pub struct FnGenerator(Box<Respond>);

impl FnGenerator {
    pub fn new(
        respond: impl Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self(Box::new(respond)))
    }
}

#[async_trait]
impl TextGenerator for FnGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (self.0)(request)
    }
}

pub struct TestApp {
    pub router: Router,
    pub mcp: McpManager,
}

pub fn app_with(generator: Arc<FnGenerator>) -> TestApp {
    let settings = AppSettings {
        connect_wait: Duration::from_secs(10),
        ..AppSettings::default()
    };
    let mcp = McpManager::new(McpTimeouts {
        handshake: Duration::from_secs(10),
        tool_call: Duration::from_secs(10),
    });
    let ctx = AxumContext::new(settings, mcp.clone(), generator);
    TestApp {
        router: create_router(ctx, &CorsConfig::AllowAll),
        mcp,
    }
}

pub fn app() -> TestApp {
    app_with(FnGenerator::new(|_| Ok("unused".to_string())))
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

const BOUNDARY: &str = "codeport-test-boundary";

/// Multipart request for the refactor endpoint.
pub fn refactor_request(archive: Option<&[u8]>, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(archive) = archive {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"project.zip\"\r\n\
                 Content-Type: application/zip\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(archive);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/refactor")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
