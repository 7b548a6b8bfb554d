//! Tool registry with mode-based gating.
//!
//! The [`ToolRegistry`] is built once at startup for a fixed [`ToolMode`].
//! Tools the mode does not allow stay registered but cannot be resolved;
//! [`ToolRegistry::lookup`] reports them as blocked rather than unknown.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::types::{Tool, ToolMode};

/// Why a tool name could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No tool with this name is registered.
    #[error("unknown tool: {0}")]
    Unknown(String),

    /// The tool exists but the registry's mode does not allow it.
    #[error("tool {name} is not available in {} mode", .mode.as_str())]
    Blocked {
        /// Requested tool name.
        name: String,
        /// Mode the registry was built with.
        mode: ToolMode,
    },
}

/// Registry of mail tools, keyed and ordered by name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    mode: ToolMode,
}

impl ToolRegistry {
    /// Create an empty registry for `mode`.
    pub fn new(mode: ToolMode) -> Self {
        Self {
            tools: BTreeMap::new(),
            mode,
        }
    }

    /// Create a registry for `mode` holding `tools`.
    pub fn with_tools(mode: ToolMode, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self::new(mode);
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_owned();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "replaced previously registered tool");
        }
    }

    /// Resolve a tool for execution.
    ///
    /// # Errors
    ///
    /// [`LookupError::Blocked`] if the tool exists but the mode forbids it,
    /// [`LookupError::Unknown`] otherwise.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, LookupError> {
        match self.tools.get(name) {
            Some(tool) if tool.allowed_in_mode(self.mode) => Ok(Arc::clone(tool)),
            Some(_) => Err(LookupError::Blocked {
                name: name.to_owned(),
                mode: self.mode,
            }),
            None => Err(LookupError::Unknown(name.to_owned())),
        }
    }

    fn available(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools
            .values()
            .filter(|t| t.allowed_in_mode(self.mode))
    }

    /// Names of the tools usable in this mode, sorted.
    pub fn list_available(&self) -> Vec<&str> {
        self.available().map(|t| t.name()).collect()
    }

    /// MCP `tools/list` entries (`name`, `description`, `inputSchema`),
    /// sorted by name.
    pub fn descriptors(&self) -> Vec<serde_json::Value> {
        self.available()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.schema(),
                })
            })
            .collect()
    }
}
