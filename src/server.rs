//! MCP server over stdin/stdout.
//!
//! Reads newline-delimited JSON-RPC 2.0 requests, dispatches `tools/list`
//! and `tools/call` through the [`ToolRegistry`], and writes one JSON
//! response per line.
//!
//! Stdout is exclusively reserved for the protocol; all diagnostic output
//! (tracing, logs) must be routed to stderr.

use std::io::{BufRead, Write};

use serde_json::{Value, json};

use crate::error::{BridgeError, Result};
use crate::tools::ToolRegistry;

/// MCP protocol revision reported when the client does not ask for one.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "mail-bridge";

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// The line was not valid JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON was not a request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Unknown method.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Bad `tools/call` parameters, unknown or mode-blocked tool.
    pub const INVALID_PARAMS: i64 = -32602;
}

fn rpc_result(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() }
    })
}

/// Dispatches JSON-RPC messages to the tool registry.
pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    /// Create a server exposing `registry`.
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Handle one raw line. Returns the response to write, if any.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(line) {
            Ok(msg) => self.handle_message(&msg),
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %line, "failed to parse request");
                Some(rpc_error(
                    Value::Null,
                    rpc_codes::PARSE_ERROR,
                    format!("parse error: {e}"),
                ))
            }
        }
    }

    /// Handle one decoded message. Notifications get no response.
    pub fn handle_message(&self, msg: &Value) -> Option<Value> {
        let id = msg.get("id").cloned();
        let Some(method) = msg.get("method").and_then(Value::as_str) else {
            return Some(rpc_error(
                id.unwrap_or(Value::Null),
                rpc_codes::INVALID_REQUEST,
                "invalid request: missing method",
            ));
        };
        let params = msg.get("params").cloned().unwrap_or_else(|| json!({}));

        // Notifications carry no id and are never answered.
        let Some(id) = id else {
            tracing::debug!(method, "notification");
            return None;
        };

        tracing::debug!(method, "request");
        let response = match method {
            "initialize" => {
                let protocol = params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(PROTOCOL_VERSION);
                rpc_result(
                    id,
                    json!({
                        "protocolVersion": protocol,
                        "capabilities": { "tools": { "listChanged": false } },
                        "serverInfo": {
                            "name": SERVER_NAME,
                            "version": env!("CARGO_PKG_VERSION")
                        }
                    }),
                )
            }
            "ping" => rpc_result(id, json!({})),
            "tools/list" => rpc_result(id, json!({ "tools": self.registry.descriptors() })),
            "tools/call" => self.call_tool(id, &params),
            other => rpc_error(
                id,
                rpc_codes::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        };
        Some(response)
    }

    fn call_tool(&self, id: Value, params: &Value) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return rpc_error(id, rpc_codes::INVALID_PARAMS, "missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let tool = match self.registry.lookup(name) {
            Ok(tool) => tool,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call rejected");
                return rpc_error(id, rpc_codes::INVALID_PARAMS, e.to_string());
            }
        };

        tracing::info!(tool = name, "tool call");
        match tool.execute(arguments) {
            Ok(result) => {
                if result.truncated {
                    tracing::warn!(tool = name, "text content truncated");
                }
                rpc_result(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": result.content }],
                        "structuredContent": result.details,
                        "isError": false
                    }),
                )
            }
            Err(e) => {
                tracing::warn!(tool = name, code = e.code(), error = %e, "tool call failed");
                rpc_result(id, tool_error(&e))
            }
        }
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Io`] if reading or writing fails.
    pub fn serve<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let bytes_read = reader.read_until(b'\n', &mut buf)?;

            // EOF
            if bytes_read == 0 {
                tracing::info!("stdin closed (EOF); shutting down server");
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line.trim()),
                Err(e) => {
                    tracing::warn!(error = %e, "request is not valid UTF-8");
                    Some(rpc_error(
                        Value::Null,
                        rpc_codes::PARSE_ERROR,
                        format!("parse error: {e}"),
                    ))
                }
            };
            if let Some(response) = response {
                write_line(&mut writer, &response)?;
            }
        }
        Ok(())
    }
}

/// `tools/call` result payload for a failed tool.
fn tool_error(error: &BridgeError) -> Value {
    let message = error.message();
    json!({
        "content": [{ "type": "text", "text": message }],
        "structuredContent": { "code": error.code(), "message": message },
        "isError": true
    })
}

fn write_line<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| BridgeError::Io(std::io::Error::other(e)))?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
