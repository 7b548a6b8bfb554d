//! Core tool types.
//!
//! Defines the [`Tool`] trait that every mail tool implements, the
//! [`ToolResult`] it returns, and the [`ToolMode`] used for gating.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Default maximum size of the text rendering of a result (100 KB).
pub const DEFAULT_MAX_BYTES: usize = 100 * 1024;

/// Tool execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    /// Only tools that do not change mailbox state.
    #[default]
    ReadOnly,
    /// All tools, including sending and status updates.
    Full,
}

impl ToolMode {
    /// Config spelling of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolMode::ReadOnly => "read_only",
            ToolMode::Full => "full",
        }
    }
}

impl std::str::FromStr for ToolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read_only" | "readonly" | "read-only" => Ok(ToolMode::ReadOnly),
            "full" => Ok(ToolMode::Full),
            other => Err(format!("unknown tool mode: {other}")),
        }
    }
}

/// Result of a successful tool execution.
///
/// `details` is the structured payload; `content` is its text rendering,
/// bounded to [`DEFAULT_MAX_BYTES`].
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Text rendering of `details`.
    pub content: String,
    /// Structured payload with echoed parameters.
    pub details: serde_json::Value,
    /// Whether `content` was truncated.
    pub truncated: bool,
}

impl ToolResult {
    /// Build a result from a structured payload.
    pub fn success(details: serde_json::Value) -> Self {
        let rendered = serde_json::to_string_pretty(&details).unwrap_or_default();
        let (content, truncated) = truncate_output(&rendered, DEFAULT_MAX_BYTES);
        Self {
            content,
            details,
            truncated,
        }
    }
}

/// Truncate a string to at most `max_bytes`, respecting UTF-8 boundaries.
///
/// Returns `(truncated_string, was_truncated)`.
pub fn truncate_output(s: &str, max_bytes: usize) -> (String, bool) {
    if s.len() <= max_bytes {
        return (s.to_string(), false);
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    (
        format!("{}\n\n[output truncated at {max_bytes} bytes]", &s[..end]),
        true,
    )
}

/// A callable mail operation.
pub trait Tool: Send + Sync {
    /// Returns the tool name (e.g. "list_emails").
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// Returns the JSON Schema for the tool's arguments.
    fn schema(&self) -> serde_json::Value;

    /// Execute the tool with the given JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] for bad arguments (before any
    /// script runs) and [`BridgeError::Execution`] when the script fails.
    fn execute(&self, args: serde_json::Value) -> Result<ToolResult, BridgeError>;

    /// Whether this tool is allowed in the given mode.
    fn allowed_in_mode(&self, mode: ToolMode) -> bool;
}

/// Decode tool arguments into a typed struct.
///
/// A `null` argument object is treated as `{}`.
///
/// # Errors
///
/// Returns [`BridgeError::Validation`] if the arguments do not match.
pub fn decode_args<T: serde::de::DeserializeOwned>(args: serde_json::Value) -> Result<T, BridgeError> {
    let args = if args.is_null() {
        serde_json::json!({})
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| BridgeError::Validation(format!("invalid arguments: {e}")))
}
