//! Mail bridge: Apple Mail operations exposed as typed tools.
//!
//! Each tool call turns into exactly one AppleScript invocation:
//! Tool arguments → marshal → `osascript` → parse → structured result
//!
//! # Architecture
//!
//! - **Marshaling**: typed parameters become positional string arguments
//! - **Runner**: a [`ScriptRunner`] executes the named script (`osascript` in production)
//! - **Parsing**: tab-delimited output is decoded against a fixed record schema
//! - **Tools**: one struct per operation, registered in a mode-gated [`ToolRegistry`]
//! - **Server**: an MCP JSON-RPC loop on stdin/stdout

pub mod config;
pub mod error;
pub mod mail;
pub mod release;
pub mod server;
pub mod tools;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use mail::{MockScriptRunner, OsascriptRunner, ScriptError, ScriptRunner, build_registry};
pub use server::McpServer;
pub use tools::{Tool, ToolMode, ToolRegistry, ToolResult};
