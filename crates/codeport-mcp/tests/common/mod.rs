//! Scripted stdio MCP server for integration tests.
//!
//! A small `sh` program answering line-delimited JSON-RPC. It exposes three
//! tools: `echo` (succeeds), `fail` (reports `isError`) and `crash` (exits
//! without answering). `INIT_DELAY` delays the `initialize` reply and
//! `INIT_SILENT=1` suppresses it entirely.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use codeport_core::{ServerDescriptor, TransportConfig};
use codeport_mcp::{McpManager, McpTimeouts};
use tempfile::TempDir;

const SERVER_SCRIPT: &str = r##"
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/^{"jsonrpc":"2.0","id":\([0-9]*\),.*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      sleep "${INIT_DELAY:-0}"
      if [ "${INIT_SILENT:-0}" = "1" ]; then continue; fi
      printf '%s\n' "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"protocolVersion\":\"2024-11-05\",\"capabilities\":{\"tools\":{}},\"serverInfo\":{\"name\":\"scripted\",\"version\":\"0.1.0\"}}}"
      ;;
    *'"method":"tools/list"'*)
      printf '%s\n' "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"tools\":[{\"name\":\"echo\",\"description\":\"Echo a message\",\"inputSchema\":{\"type\":\"object\",\"properties\":{\"message\":{\"type\":\"string\",\"description\":\"Text to echo\"}},\"required\":[\"message\"]}},{\"name\":\"fail\",\"description\":\"Always fails\"},{\"name\":\"crash\",\"description\":\"Exits immediately\"}]}}"
      ;;
    *'"name":"echo"'*)
      printf '%s\n' "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"echo: hello\"}]}}"
      ;;
    *'"name":"fail"'*)
      printf '%s\n' "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"boom\"}],\"isError\":true}}"
      ;;
    *'"name":"crash"'*)
      exit 1
      ;;
  esac
done
"##;

pub struct ScriptedServer {
    _dir: TempDir,
    path: PathBuf,
}

impl ScriptedServer {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("server.sh");
        std::fs::write(&path, SERVER_SCRIPT).expect("write server script");
        Self { _dir: dir, path }
    }

    pub fn descriptor(&self, name: &str) -> ServerDescriptor {
        self.descriptor_with_env(name, &[])
    }

    pub fn descriptor_with_env(&self, name: &str, env: &[(&str, &str)]) -> ServerDescriptor {
        let env: BTreeMap<String, String> = env
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerDescriptor::new(
            name,
            TransportConfig::Stdio {
                command: "sh".to_string(),
                args: vec![self.path.to_string_lossy().into_owned()],
                env,
            },
        )
    }
}

pub fn manager() -> McpManager {
    McpManager::new(McpTimeouts {
        handshake: Duration::from_secs(10),
        tool_call: Duration::from_secs(10),
    })
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually<F, Fut>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
