//! Loading server descriptors from an `mcp-servers.json` file.
//!
//! The file uses the common `mcpServers` layout:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "filesystem": { "command": "npx", "args": ["-y", "@modelcontextprotocol/server-filesystem", "/data"] },
//!     "rag":        { "url": "http://rag:8001/sse", "transport": "sse" },
//!     "search":     { "url": "https://search.example/mcp", "headers": { "Authorization": "Bearer ${SEARCH_TOKEN}" } }
//!   }
//! }
//! ```
//!
//! Every string value (including inside `args`, `env` and `headers`) has
//! `${VAR}` references expanded at load time; unresolved references are
//! kept verbatim. A bare `url` defaults to the `streamable-http` transport.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use codeport_core::env::expand_env_vars;
use codeport_core::{EnvProvider, ServerDescriptor, TransportConfig};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors reading the configuration file as a whole.
///
/// Problems with a single entry never fail the load; that entry is skipped.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read MCP config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse MCP config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: serde_json::Map<String, Value>,
}

/// Raw entry, before the transport is decided.
#[derive(Debug, Deserialize)]
struct RawEntry {
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    url: Option<String>,
    transport: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

/// Load server descriptors from `path`.
///
/// A missing file yields no servers. Entries come back ordered by name.
pub fn load_server_config(
    path: &Path,
    env: &dyn EnvProvider,
) -> Result<Vec<ServerDescriptor>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "MCP config not found, no servers configured");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    parse_server_config(&content, env).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse the JSON text of an `mcp-servers.json` file.
pub fn parse_server_config(
    content: &str,
    env: &dyn EnvProvider,
) -> Result<Vec<ServerDescriptor>, serde_json::Error> {
    let file: ConfigFile = serde_json::from_str(content)?;

    let servers = file
        .mcp_servers
        .into_iter()
        .filter_map(|(name, raw)| match parse_entry(&name, raw, env) {
            Ok(descriptor) => Some(descriptor),
            Err(reason) => {
                tracing::warn!(server_name = %name, reason = %reason, "Skipping MCP server config entry");
                None
            }
        })
        .collect();

    Ok(servers)
}

fn parse_entry(name: &str, raw: Value, env: &dyn EnvProvider) -> Result<ServerDescriptor, String> {
    let raw: RawEntry =
        serde_json::from_value(interpolate(raw, env)).map_err(|e| format!("malformed entry: {e}"))?;

    let transport = if let Some(command) = raw.command {
        TransportConfig::Stdio {
            command,
            args: raw.args,
            env: raw.env,
        }
    } else if let Some(url) = raw.url {
        match raw.transport.as_deref() {
            Some("sse") => TransportConfig::Sse {
                url,
                headers: raw.headers,
            },
            None | Some("streamable-http" | "streamable_http" | "http") => {
                TransportConfig::StreamableHttp {
                    url,
                    headers: raw.headers,
                }
            }
            Some(other) => return Err(format!("unknown transport '{other}'")),
        }
    } else {
        return Err("neither 'command' nor 'url' given".to_string());
    };

    let descriptor = ServerDescriptor::new(name, transport);
    descriptor.validate()?;
    Ok(descriptor)
}

/// Expand `${VAR}` in every string inside `value`.
fn interpolate(value: Value, env: &dyn EnvProvider) -> Value {
    match value {
        Value::String(s) => Value::String(expand_env_vars(&s, env)),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| interpolate(v, env)).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, interpolate(v, env)))
                .collect(),
        ),
        other => other,
    }
}
