//! Mail.app bridge: argument marshaling, script execution and output parsing.
//!
//! Every operation is one external script invocation:
//!
//! 1. [`marshal`] turns typed tool parameters into positional string arguments
//! 2. [`runner`] executes the named script through a [`ScriptRunner`]
//! 3. [`parse`] decodes the plain-text output into records or a status
//!
//! # Architecture
//!
//! All tools depend on the [`ScriptRunner`] trait, injected as an
//! `Arc<dyn ScriptRunner>`. Production uses [`OsascriptRunner`]; tests use
//! [`MockScriptRunner`], which records every invocation.

pub mod marshal;
pub mod mock_runner;
pub mod parse;
pub mod runner;
pub mod tools;

use std::sync::Arc;

use crate::tools::{Tool, ToolMode, ToolRegistry};

pub use marshal::{
    LimitPolicy, MessageQuery, OutgoingMessage, RecipientInput, RequestedLimit, StatusFilter,
};
pub use mock_runner::{Invocation, MockScriptRunner};
pub use parse::{MESSAGE_SCHEMA, MailRecord, MailboxEntry, RecordSchema};
pub use runner::{DEFAULT_OSASCRIPT, OsascriptRunner, ScriptError, ScriptRunner};
pub use tools::{
    GetLatestTool, GetUnreadTool, ListAccountsTool, ListEmailsTool, ListMailboxesTool,
    MessageQuerySpec, SearchMessagesTool, SendMessageTool, UpdateEmailStatusTool,
};

/// All mail tools, each sharing `runner`.
pub fn mail_tools(runner: Arc<dyn ScriptRunner>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListEmailsTool::new(Arc::clone(&runner))),
        Arc::new(GetUnreadTool::new(Arc::clone(&runner))),
        Arc::new(GetLatestTool::new(Arc::clone(&runner))),
        Arc::new(SearchMessagesTool::new(Arc::clone(&runner))),
        Arc::new(ListAccountsTool::new(Arc::clone(&runner))),
        Arc::new(ListMailboxesTool::new(Arc::clone(&runner))),
        Arc::new(SendMessageTool::new(Arc::clone(&runner))),
        Arc::new(UpdateEmailStatusTool::new(runner)),
    ]
}

/// Build a registry holding every mail tool, gated by `mode`.
pub fn build_registry(mode: ToolMode, runner: Arc<dyn ScriptRunner>) -> ToolRegistry {
    ToolRegistry::with_tools(mode, mail_tools(runner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_eight_tools() {
        let registry = build_registry(ToolMode::Full, Arc::new(MockScriptRunner::new()));
        assert_eq!(registry.list_available().len(), 8);
    }

    #[test]
    fn read_only_registry_hides_mutating_tools() {
        let registry = build_registry(ToolMode::ReadOnly, Arc::new(MockScriptRunner::new()));
        let names = registry.list_available();
        assert_eq!(names.len(), 6);
        assert!(!names.contains(&"send_message"));
        assert!(!names.contains(&"update_email_status"));
        assert!(registry.lookup("send_message").is_err());
    }
}
