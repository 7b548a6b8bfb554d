//! Mail tools.
//!
//! Each tool marshals its arguments, runs exactly one script through the
//! injected [`ScriptRunner`], and parses the output:
//!
//! - [`ListEmailsTool`]: list messages with status/account/mailbox/query filters
//! - [`GetUnreadTool`]: newest unread messages
//! - [`GetLatestTool`]: newest messages regardless of read state
//! - [`SearchMessagesTool`]: full-text search (requires a search term)
//! - [`ListAccountsTool`]: configured Mail accounts
//! - [`ListMailboxesTool`]: mailboxes, optionally for one account
//! - [`SendMessageTool`]: compose and send (Full mode)
//! - [`UpdateEmailStatusTool`]: mark read/unread, archive, etc. (Full mode)

use std::sync::Arc;

use serde::Deserialize;

use crate::error::BridgeError;
use crate::tools::types::{Tool, ToolMode, ToolResult, decode_args};

use super::marshal::{
    LimitPolicy, MessageQuery, OutgoingMessage, RecipientInput, RequestedLimit, StatusFilter,
    mailbox_listing_args, non_blank, require_search_term, status_update_args,
};
use super::parse::{
    MESSAGE_SCHEMA, MailRecord, parse_accounts, parse_mailboxes, parse_records, parse_status,
};
use super::runner::ScriptRunner;

/// Script listing messages (also backs unread/latest).
pub const LIST_EMAILS_SCRIPT: &str = "mail_list_emails.applescript";
/// Script searching message content.
pub const SEARCH_MESSAGES_SCRIPT: &str = "mail_search_messages.applescript";
/// Script sending a message.
pub const SEND_SCRIPT: &str = "mail_send.applescript";
/// Script changing a message's status.
pub const UPDATE_STATUS_SCRIPT: &str = "mail_update_email_status.applescript";
/// Script listing accounts.
pub const LIST_ACCOUNTS_SCRIPT: &str = "mail_list_accounts.applescript";
/// Script listing mailboxes.
pub const LIST_MAILBOXES_SCRIPT: &str = "mail_list_mailboxes.applescript";

/// How one message-producing operation maps onto a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuerySpec {
    /// Tool name.
    pub tool: &'static str,
    /// Script to run.
    pub script: &'static str,
    /// Default and maximum limit.
    pub limits: LimitPolicy,
    /// Status forced by the operation, ignoring the caller.
    pub fixed_status: Option<StatusFilter>,
}

/// `list_emails`
pub const LIST_EMAILS: MessageQuerySpec = MessageQuerySpec {
    tool: "list_emails",
    script: LIST_EMAILS_SCRIPT,
    limits: LimitPolicy { default: 10, max: 30 },
    fixed_status: None,
};

/// `get_unread`
pub const GET_UNREAD: MessageQuerySpec = MessageQuerySpec {
    tool: "get_unread",
    script: LIST_EMAILS_SCRIPT,
    limits: LimitPolicy { default: 10, max: 50 },
    fixed_status: Some(StatusFilter::Unread),
};

/// `get_latest`
pub const GET_LATEST: MessageQuerySpec = MessageQuerySpec {
    tool: "get_latest",
    script: LIST_EMAILS_SCRIPT,
    limits: LimitPolicy { default: 10, max: 50 },
    fixed_status: Some(StatusFilter::Any),
};

/// `search_messages`
pub const SEARCH_MESSAGES: MessageQuerySpec = MessageQuerySpec {
    tool: "search_messages",
    script: SEARCH_MESSAGES_SCRIPT,
    limits: LimitPolicy { default: 10, max: 50 },
    fixed_status: None,
};

impl MessageQuerySpec {
    /// Resolve caller parameters into a query for this operation.
    fn query(
        &self,
        limit: Option<RequestedLimit>,
        status: Option<StatusFilter>,
        account: Option<&str>,
        mailbox: Option<&str>,
        query: Option<String>,
    ) -> MessageQuery {
        MessageQuery {
            limit: self.limits.resolve(limit),
            status: self.fixed_status.or(status).unwrap_or_default(),
            account: non_blank(account),
            mailbox: non_blank(mailbox),
            query,
        }
    }

    /// Run the query and decode the messages.
    fn run(&self, runner: &dyn ScriptRunner, query: &MessageQuery) -> Result<Vec<MailRecord>, BridgeError> {
        let args = query.to_args();
        tracing::debug!(tool = self.tool, script = self.script, args = ?args, "running message query");
        let raw = runner.run(self.script, &args).map_err(|e| {
            tracing::warn!(tool = self.tool, error = %e, "message query failed");
            BridgeError::from(e)
        })?;
        parse_records(&raw, &MESSAGE_SCHEMA)
    }
}

fn limit_schema(policy: LimitPolicy) -> serde_json::Value {
    serde_json::json!({
        "type": "integer",
        "description": format!(
            "Maximum number of messages to return (default {}, max {})",
            policy.default, policy.max
        ),
        "minimum": 0
    })
}

fn status_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "enum": ["any", "read", "unread"],
        "description": "Read-state filter (default \"any\")"
    })
}

fn account_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": "Only include this Mail account"
    })
}

fn mailbox_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": "Only include this mailbox (e.g. \"Inbox\")"
    })
}

fn recipients_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "oneOf": [
            { "type": "string" },
            { "type": "array", "items": { "type": "string" } }
        ]
    })
}

// ─── ListEmailsTool ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListEmailsArgs {
    limit: Option<RequestedLimit>,
    status: Option<StatusFilter>,
    account: Option<String>,
    mailbox: Option<String>,
    query: Option<String>,
}

/// Lists messages with optional filters.
pub struct ListEmailsTool {
    runner: Arc<dyn ScriptRunner>,
}

impl ListEmailsTool {
    /// Create a new `ListEmailsTool` backed by `runner`.
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Tool for ListEmailsTool {
    fn name(&self) -> &str {
        LIST_EMAILS.tool
    }

    fn description(&self) -> &str {
        "List messages from Mail, newest first. Optionally filter by read status, \
         account, mailbox, or a text query matched against subject and sender."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": limit_schema(LIST_EMAILS.limits),
                "status": status_schema(),
                "account": account_schema(),
                "mailbox": mailbox_schema(),
                "query": {
                    "type": "string",
                    "description": "Text matched against subject and sender"
                }
            }
        })
    }

    fn execute(&self, args: serde_json::Value) -> Result<ToolResult, BridgeError> {
        let args: ListEmailsArgs = decode_args(args)?;
        let query = LIST_EMAILS.query(
            args.limit,
            args.status,
            args.account.as_deref(),
            args.mailbox.as_deref(),
            non_blank(args.query.as_deref()),
        );
        let messages = LIST_EMAILS.run(self.runner.as_ref(), &query)?;

        Ok(ToolResult::success(serde_json::json!({
            "messages": messages,
            "limit": query.limit,
            "status": query.status,
            "account": query.account,
            "mailbox": query.mailbox,
            "query": query.query,
        })))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── GetUnreadTool / GetLatestTool ───────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecentArgs {
    limit: Option<RequestedLimit>,
    account: Option<String>,
    mailbox: Option<String>,
}

fn recent_schema(op: &MessageQuerySpec) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "limit": limit_schema(op.limits),
            "account": account_schema(),
            "mailbox": mailbox_schema()
        }
    })
}

fn execute_recent(
    op: &MessageQuerySpec,
    runner: &dyn ScriptRunner,
    args: serde_json::Value,
) -> Result<ToolResult, BridgeError> {
    let args: RecentArgs = decode_args(args)?;
    let query = op.query(
        args.limit,
        None,
        args.account.as_deref(),
        args.mailbox.as_deref(),
        None,
    );
    let messages = op.run(runner, &query)?;

    Ok(ToolResult::success(serde_json::json!({
        "messages": messages,
        "limit": query.limit,
        "account": query.account,
        "mailbox": query.mailbox,
    })))
}

/// Returns the newest unread messages.
pub struct GetUnreadTool {
    runner: Arc<dyn ScriptRunner>,
}

impl GetUnreadTool {
    /// Create a new `GetUnreadTool` backed by `runner`.
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Tool for GetUnreadTool {
    fn name(&self) -> &str {
        GET_UNREAD.tool
    }

    fn description(&self) -> &str {
        "Get the newest unread messages, optionally limited to one account or mailbox."
    }

    fn schema(&self) -> serde_json::Value {
        recent_schema(&GET_UNREAD)
    }

    fn execute(&self, args: serde_json::Value) -> Result<ToolResult, BridgeError> {
        execute_recent(&GET_UNREAD, self.runner.as_ref(), args)
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true
    }
}

/// Returns the newest messages regardless of read state.
pub struct GetLatestTool {
    runner: Arc<dyn ScriptRunner>,
}

impl GetLatestTool {
    /// Create a new `GetLatestTool` backed by `runner`.
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Tool for GetLatestTool {
    fn name(&self) -> &str {
        GET_LATEST.tool
    }

    fn description(&self) -> &str {
        "Get the newest messages (read and unread), optionally limited to one account or mailbox."
    }

    fn schema(&self) -> serde_json::Value {
        recent_schema(&GET_LATEST)
    }

    fn execute(&self, args: serde_json::Value) -> Result<ToolResult, BridgeError> {
        execute_recent(&GET_LATEST, self.runner.as_ref(), args)
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true
    }
}

// ─── SearchMessagesTool ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchArgs {
    search_term: Option<String>,
    limit: Option<RequestedLimit>,
    status: Option<StatusFilter>,
    account: Option<String>,
    mailbox: Option<String>,
}

/// Searches message subjects, senders and bodies.
///
/// # Arguments (JSON)
///
/// - `search_term` (string, required): text to look for
/// - `limit` (integer, optional): max results (default 10, max 50)
/// - `status`, `account`, `mailbox` (optional): filters
pub struct SearchMessagesTool {
    runner: Arc<dyn ScriptRunner>,
}

impl SearchMessagesTool {
    /// Create a new `SearchMessagesTool` backed by `runner`.
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Tool for SearchMessagesTool {
    fn name(&self) -> &str {
        SEARCH_MESSAGES.tool
    }

    fn description(&self) -> &str {
        "Search Mail messages by subject, sender and body text. \
         Requires a non-empty search term."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["search_term"],
            "properties": {
                "search_term": {
                    "type": "string",
                    "description": "Text to search for"
                },
                "limit": limit_schema(SEARCH_MESSAGES.limits),
                "status": status_schema(),
                "account": account_schema(),
                "mailbox": mailbox_schema()
            }
        })
    }

    fn execute(&self, args: serde_json::Value) -> Result<ToolResult, BridgeError> {
        let args: SearchArgs = decode_args(args)?;
        let term = require_search_term(args.search_term.as_deref())?;
        let query = SEARCH_MESSAGES.query(
            args.limit,
            args.status,
            args.account.as_deref(),
            args.mailbox.as_deref(),
            Some(term.clone()),
        );
        let messages = SEARCH_MESSAGES.run(self.runner.as_ref(), &query)?;

        Ok(ToolResult::success(serde_json::json!({
            "messages": messages,
            "limit": query.limit,
            "search_term": term,
            "status": query.status,
            "account": query.account,
            "mailbox": query.mailbox,
        })))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true
    }
}

// ─── ListAccountsTool ────────────────────────────────────────────────────────

/// Lists the accounts configured in Mail.
pub struct ListAccountsTool {
    runner: Arc<dyn ScriptRunner>,
}

impl ListAccountsTool {
    /// Create a new `ListAccountsTool` backed by `runner`.
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Tool for ListAccountsTool {
    fn name(&self) -> &str {
        "list_accounts"
    }

    fn description(&self) -> &str {
        "List the names of all accounts configured in Mail."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    fn execute(&self, _args: serde_json::Value) -> Result<ToolResult, BridgeError> {
        let raw = self.runner.run(LIST_ACCOUNTS_SCRIPT, &[])?;
        let accounts = parse_accounts(&raw)?;
        Ok(ToolResult::success(serde_json::json!({ "accounts": accounts })))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true
    }
}

// ─── ListMailboxesTool ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListMailboxesArgs {
    account: Option<String>,
}

/// Lists mailboxes, optionally for a single account.
pub struct ListMailboxesTool {
    runner: Arc<dyn ScriptRunner>,
}

impl ListMailboxesTool {
    /// Create a new `ListMailboxesTool` backed by `runner`.
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Tool for ListMailboxesTool {
    fn name(&self) -> &str {
        "list_mailboxes"
    }

    fn description(&self) -> &str {
        "List mailboxes as account/mailbox pairs. Optionally restrict to one account."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "account": account_schema() }
        })
    }

    fn execute(&self, args: serde_json::Value) -> Result<ToolResult, BridgeError> {
        let args: ListMailboxesArgs = decode_args(args)?;
        let account = non_blank(args.account.as_deref());
        let raw = self
            .runner
            .run(LIST_MAILBOXES_SCRIPT, &mailbox_listing_args(account.as_deref()))?;
        let mailboxes = parse_mailboxes(&raw, account.as_deref())?;
        Ok(ToolResult::success(serde_json::json!({
            "mailboxes": mailboxes,
            "account": account,
        })))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true
    }
}

// ─── SendMessageTool ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendArgs {
    to: Option<RecipientInput>,
    cc: Option<RecipientInput>,
    subject: Option<String>,
    body: Option<String>,
    message_id: Option<String>,
}

/// Composes and sends a message. Requires `ToolMode::Full`.
///
/// # Arguments (JSON)
///
/// - `to` (string or array, required): recipients; `,` `;` and newlines separate
/// - `subject` (string, required)
/// - `body` (string, required)
/// - `cc` (string or array, optional)
/// - `message_id` (string, optional): reply to this message
pub struct SendMessageTool {
    runner: Arc<dyn ScriptRunner>,
}

impl SendMessageTool {
    /// Create a new `SendMessageTool` backed by `runner`.
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send an email through Mail. Requires recipients, subject and body. \
         Optionally add CC recipients or reply to an existing message by id."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["to", "subject", "body"],
            "properties": {
                "to": recipients_schema("Recipient address(es); comma, semicolon or newline separated"),
                "cc": recipients_schema("CC address(es)"),
                "subject": { "type": "string", "description": "Subject line" },
                "body": { "type": "string", "description": "Plain-text body" },
                "message_id": {
                    "type": "string",
                    "description": "Id of the message this replies to"
                }
            }
        })
    }

    fn execute(&self, args: serde_json::Value) -> Result<ToolResult, BridgeError> {
        let args: SendArgs = decode_args(args)?;
        let message = OutgoingMessage::new(
            args.to.as_ref(),
            args.cc.as_ref(),
            args.subject.as_deref(),
            args.body.as_deref(),
            args.message_id.as_deref(),
        )?;

        tracing::info!(
            to = message.to.len(),
            cc = message.cc.len(),
            reply = message.reply_to.is_some(),
            "sending message"
        );
        let raw = self.runner.run(SEND_SCRIPT, &message.to_args())?;
        parse_status(&raw)?;

        Ok(ToolResult::success(serde_json::json!({
            "status": "sent",
            "to": message.to,
            "cc": message.cc,
            "subject": message.subject,
        })))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── UpdateEmailStatusTool ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateStatusArgs {
    id: Option<String>,
    action: Option<String>,
}

/// Applies a status action (e.g. `mark_read`, `archive`) to one message.
/// Requires `ToolMode::Full`.
pub struct UpdateEmailStatusTool {
    runner: Arc<dyn ScriptRunner>,
}

impl UpdateEmailStatusTool {
    /// Create a new `UpdateEmailStatusTool` backed by `runner`.
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Tool for UpdateEmailStatusTool {
    fn name(&self) -> &str {
        "update_email_status"
    }

    fn description(&self) -> &str {
        "Change the status of a message by id: mark_read, mark_unread, flag, unflag, \
         archive or delete."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["id", "action"],
            "properties": {
                "id": { "type": "string", "description": "Message id" },
                "action": {
                    "type": "string",
                    "description": "Action keyword, e.g. mark_read or archive"
                }
            }
        })
    }

    fn execute(&self, args: serde_json::Value) -> Result<ToolResult, BridgeError> {
        let args: UpdateStatusArgs = decode_args(args)?;
        let script_args = status_update_args(args.id.as_deref(), args.action.as_deref())?;
        let raw = self.runner.run(UPDATE_STATUS_SCRIPT, &script_args)?;
        parse_status(&raw)?;

        Ok(ToolResult::success(serde_json::json!({
            "status": "ok",
            "id": script_args[0],
            "action": script_args[1],
        })))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
