//! Registry of live connections and the tools they expose.
//!
//! Connections are kept in registration order, which is the order their
//! handshakes completed. Name-based dispatch resolves to the first
//! registered owner of a tool; later servers exposing the same name are
//! shadowed for dispatch but still listed.

use codeport_core::{ToolDescriptor, TransportKind};

/// Sentinel rendered when no tools are available.
pub const NO_TOOLS_AVAILABLE: &str = "No tools available.";

/// One registered connection.
#[derive(Debug, Clone)]
pub struct Registration<H> {
    pub name: String,
    pub kind: TransportKind,
    pub tools: Vec<ToolDescriptor>,
    pub handle: H,
}

/// Ordered set of registrations, unique by server name.
#[derive(Debug)]
pub struct ToolRegistry<H> {
    entries: Vec<Registration<H>>,
}

impl<H> Default for ToolRegistry<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> ToolRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration. Fails (returning it) if the name is taken.
    pub fn insert(&mut self, registration: Registration<H>) -> Result<(), Registration<H>> {
        if self.contains(&registration.name) {
            return Err(registration);
        }

        let shadowed: Vec<&str> = registration
            .tools
            .iter()
            .map(|t| t.name.as_str())
            .filter(|name| self.find_owner(name).is_some())
            .collect();
        if !shadowed.is_empty() {
            tracing::warn!(
                server_name = %registration.name,
                shadowed = ?shadowed,
                "Tools already provided by another server; calls by name keep going to the first"
            );
        }

        self.entries.push(registration);
        Ok(())
    }

    /// Remove the registration for `name`.
    pub fn remove(&mut self, name: &str) -> Option<Registration<H>> {
        let idx = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(idx))
    }

    /// Remove the registration for `name` only if `is_same` accepts its handle.
    pub fn remove_if(
        &mut self,
        name: &str,
        is_same: impl FnOnce(&H) -> bool,
    ) -> Option<Registration<H>> {
        let idx = self.entries.iter().position(|e| e.name == name)?;
        if is_same(&self.entries[idx].handle) {
            Some(self.entries.remove(idx))
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Registration<H>> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Registered server names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration<H>> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every tool across all registrations, in registration order.
    pub fn list_all(&self) -> Vec<ToolDescriptor> {
        self.entries
            .iter()
            .flat_map(|e| e.tools.iter().cloned())
            .collect()
    }

    /// Tools of one server; empty when it is not registered.
    pub fn tools_for(&self, server: &str) -> Vec<ToolDescriptor> {
        self.get(server)
            .map(|e| e.tools.clone())
            .unwrap_or_default()
    }

    /// First registration exposing a tool called `tool_name`.
    pub fn find_owner(&self, tool_name: &str) -> Option<&Registration<H>> {
        self.entries
            .iter()
            .find(|e| e.tools.iter().any(|t| t.name == tool_name))
    }

    /// Prompt rendering of every registered tool.
    pub fn format_for_prompt(&self) -> String {
        format_tools_for_prompt(&self.list_all())
    }
}

/// Render tools for a system prompt.
///
/// ```text
/// Available tools:
///
/// ### read_file
/// Server: filesystem
/// Description: Read a file
/// Parameters:
///   - path: string (required)
///     Path to read
/// ```
///
/// An empty slice renders as [`NO_TOOLS_AVAILABLE`].
pub fn format_tools_for_prompt(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return NO_TOOLS_AVAILABLE.to_string();
    }

    let mut lines = vec!["Available tools:".to_string()];
    for tool in tools {
        lines.push(format!("\n### {}", tool.name));
        lines.push(format!("Server: {}", tool.server_name));
        lines.push(format!("Description: {}", tool.description));

        let params = tool.parameters();
        if !params.is_empty() {
            lines.push("Parameters:".to_string());
            for param in params {
                let mut line = format!("  - {}: {}", param.name, param.type_name);
                if param.required {
                    line.push_str(" (required)");
                }
                lines.push(line);
                if !param.description.is_empty() {
                    lines.push(format!("    {}", param.description));
                }
            }
        }
    }
    lines.join("\n")
}
