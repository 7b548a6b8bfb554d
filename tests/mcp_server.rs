//! End-to-end tests for the MCP server: JSON lines in, JSON lines out,
//! with a mock script runner standing in for `osascript`.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use mail_bridge::mail::{MockScriptRunner, build_registry};
use mail_bridge::server::{McpServer, rpc_codes};
use mail_bridge::tools::ToolMode;
use serde_json::{Value, json};

fn run_session(mode: ToolMode, runner: Arc<MockScriptRunner>, requests: &[Value]) -> Vec<Value> {
    let server = McpServer::new(build_registry(mode, runner));
    let input: String = requests
        .iter()
        .map(|r| format!("{}\n", serde_json::to_string(r).unwrap()))
        .collect();
    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

#[test]
fn handshake_then_list_emails() {
    let runner = Arc::new(MockScriptRunner::new().with_output(
        "mail_list_emails.applescript",
        "123\t2024-01-01\tSender\tWork\tInbox\tfalse\tSubject\tPreview text\n\
         456\t2024-01-02\tAnother\tWork\tInbox\ttrue\tOther\tMore preview\n",
    ));
    let responses = run_session(
        ToolMode::ReadOnly,
        Arc::clone(&runner),
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            call(2, "list_emails", json!({"limit": 5, "mailbox": "Inbox"})),
        ],
    );

    assert_eq!(responses.len(), 2);
    let result = &responses[1]["result"];
    assert_eq!(result["isError"], false);
    let messages = result["structuredContent"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["read"], false);
    assert_eq!(messages[1]["read"], true);
    assert_eq!(result["structuredContent"]["mailbox"], "Inbox");

    let invocation = runner.last_call().unwrap();
    assert_eq!(invocation.args, vec!["5", "any", "", "Inbox", "", "500"]);
}

#[test]
fn script_failure_surfaces_as_tool_error() {
    let runner = Arc::new(
        MockScriptRunner::new()
            .with_output("mail_update_email_status.applescript", "ERROR: message not found"),
    );
    let responses = run_session(
        ToolMode::Full,
        runner,
        &[call(1, "update_email_status", json!({"id": "999", "action": "archive"}))],
    );

    let result = &responses[0]["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["code"], "EXECUTION_FAILED");
    assert_eq!(result["content"][0]["text"], "message not found");
}

#[test]
fn send_is_blocked_in_read_only_mode() {
    let runner = Arc::new(MockScriptRunner::new().with_output("mail_send.applescript", "OK"));
    let responses = run_session(
        ToolMode::ReadOnly,
        Arc::clone(&runner),
        &[call(
            1,
            "send_message",
            json!({"to": "a@example.com", "subject": "Hi", "body": "Body"}),
        )],
    );

    assert_eq!(responses[0]["error"]["code"], rpc_codes::INVALID_PARAMS);
    assert!(runner.calls().is_empty());
}

#[test]
fn send_in_full_mode() {
    let runner = Arc::new(MockScriptRunner::new().with_output("mail_send.applescript", "OK"));
    let responses = run_session(
        ToolMode::Full,
        Arc::clone(&runner),
        &[call(
            1,
            "send_message",
            json!({"to": "a@example.com; b@example.com", "subject": "Hi", "body": "Body"}),
        )],
    );

    let details = &responses[0]["result"]["structuredContent"];
    assert_eq!(details["status"], "sent");
    assert_eq!(details["to"], json!(["a@example.com", "b@example.com"]));
    assert_eq!(
        runner.last_call().unwrap().args,
        vec!["Hi", "Body", "", "2", "0", "a@example.com", "b@example.com"]
    );
}

#[test]
fn unknown_tool_and_method() {
    let responses = run_session(
        ToolMode::Full,
        Arc::new(MockScriptRunner::new()),
        &[
            call(1, "delete_everything", json!({})),
            json!({"jsonrpc": "2.0", "id": 2, "method": "prompts/list"}),
        ],
    );

    assert_eq!(responses[0]["error"]["code"], rpc_codes::INVALID_PARAMS);
    assert_eq!(responses[1]["error"]["code"], rpc_codes::METHOD_NOT_FOUND);
}
