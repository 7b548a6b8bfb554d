//! Decoding of script output.
//!
//! Message scripts print one record per line with tab-separated columns in
//! the order declared by a [`RecordSchema`]. Scalar scripts print `OK` on
//! success. Any output starting with `ERROR:` is a failure reported by the
//! script itself.

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::error::{BridgeError, Result};

/// Prefix a script prints instead of a result when it fails.
pub const ERROR_SENTINEL: &str = "ERROR:";

/// Output of a scalar script that succeeded.
pub const SUCCESS_TOKEN: &str = "OK";

/// Column separator in record output.
pub const COLUMN_DELIMITER: char = '\t';

/// How a column's raw text is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Kept as-is.
    Text,
    /// Coerced to a boolean.
    Flag,
}

/// One named column of a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Field name in the decoded record.
    pub name: &'static str,
    /// Decoding rule.
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
    }
}

const fn flag(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Flag,
    }
}

/// The fixed, ordered column list one operation decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    /// Schema name, used in diagnostics.
    pub name: &'static str,
    /// Columns in output order.
    pub columns: &'static [Column],
}

impl RecordSchema {
    /// Field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

/// Schema shared by every message listing and search.
pub const MESSAGE_SCHEMA: RecordSchema = RecordSchema {
    name: "message",
    columns: &[
        text("id"),
        text("received"),
        text("from"),
        text("account"),
        text("mailbox"),
        flag("read"),
        text("subject"),
        text("preview"),
    ],
};

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text column.
    Text(String),
    /// Flag column.
    Flag(bool),
}

/// One decoded record, fields in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailRecord {
    fields: Vec<(&'static str, FieldValue)>,
}

impl MailRecord {
    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Text value of a field, if it is a text column.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Boolean value of a field, if it is a flag column.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(FieldValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    /// Field names in order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }
}

impl Serialize for MailRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// An account/mailbox pair from the mailbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxEntry {
    /// Owning account name.
    pub account: String,
    /// Mailbox name.
    pub mailbox: String,
}

/// Fail if the script reported an error instead of a result.
pub fn check_error_sentinel(raw: &str) -> Result<()> {
    let Some(rest) = raw.trim_start().strip_prefix(ERROR_SENTINEL) else {
        return Ok(());
    };
    let message = rest.trim();
    let message = if message.is_empty() {
        "script reported an error".to_owned()
    } else {
        message.to_owned()
    };
    Err(BridgeError::bad_output(message, raw))
}

/// Decode a read-state token.
///
/// Returns `None` for tokens that are not a recognised spelling.
pub fn parse_flag(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "true" | "read" | "yes" | "1" => Some(true),
        "false" | "unread" | "no" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Non-empty lines with their 1-based line numbers, CR stripped.
///
/// A line of only tabs is kept: it is a record whose fields are all empty.
fn record_lines(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    raw.split('\n')
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.is_empty())
}

/// Lines of single-value listings, blank ones skipped.
fn listing_lines(raw: &str) -> impl Iterator<Item = &str> {
    record_lines(raw)
        .map(|(_, line)| line)
        .filter(|line| !line.trim().is_empty())
}

/// Decode tab-delimited record output against `schema`.
///
/// The last column absorbs any extra tabs. A line with fewer columns than
/// the schema declares is an error; missing fields are never padded.
///
/// # Errors
///
/// Returns [`BridgeError::Execution`] for an error sentinel, a short line,
/// or an unrecognised flag token.
pub fn parse_records(raw: &str, schema: &RecordSchema) -> Result<Vec<MailRecord>> {
    check_error_sentinel(raw)?;

    let width = schema.columns.len();
    let mut records = Vec::new();
    for (line_no, line) in record_lines(raw) {
        let parts: Vec<&str> = line.splitn(width, COLUMN_DELIMITER).collect();
        if parts.len() < width {
            return Err(BridgeError::bad_output(
                format!(
                    "malformed {} record on line {line_no}: expected {width} fields, got {}",
                    schema.name,
                    parts.len()
                ),
                raw,
            ));
        }

        let mut fields = Vec::with_capacity(width);
        for (column, part) in schema.columns.iter().zip(parts) {
            let value = match column.kind {
                ColumnKind::Text => FieldValue::Text(part.to_owned()),
                ColumnKind::Flag => match parse_flag(part) {
                    Some(b) => FieldValue::Flag(b),
                    None => {
                        return Err(BridgeError::bad_output(
                            format!("unrecognised {} value {part:?} on line {line_no}", column.name),
                            raw,
                        ));
                    }
                },
            };
            fields.push((column.name, value));
        }
        records.push(MailRecord { fields });
    }

    tracing::trace!(schema = schema.name, count = records.len(), "parsed records");
    Ok(records)
}

/// Decode a scalar `OK` result.
///
/// # Errors
///
/// Returns [`BridgeError::Execution`] for an error sentinel or any output
/// other than `OK`.
pub fn parse_status(raw: &str) -> Result<()> {
    check_error_sentinel(raw)?;
    let trimmed = raw.trim();
    if trimmed == SUCCESS_TOKEN {
        return Ok(());
    }
    Err(BridgeError::bad_output(
        format!("unexpected script response: {trimmed}"),
        raw,
    ))
}

/// Decode one account name per line.
pub fn parse_accounts(raw: &str) -> Result<Vec<String>> {
    check_error_sentinel(raw)?;
    Ok(listing_lines(raw)
        .map(|line| line.trim().to_owned())
        .collect())
}

/// Decode `account<TAB>mailbox` lines.
///
/// A line without a tab is a mailbox of `default_account` (or of the empty
/// account when none was requested).
pub fn parse_mailboxes(raw: &str, default_account: Option<&str>) -> Result<Vec<MailboxEntry>> {
    check_error_sentinel(raw)?;
    Ok(listing_lines(raw)
        .map(|line| match line.split_once(COLUMN_DELIMITER) {
            Some((account, mailbox)) => MailboxEntry {
                account: account.trim().to_owned(),
                mailbox: mailbox.trim().to_owned(),
            },
            None => MailboxEntry {
                account: default_account.unwrap_or_default().to_owned(),
                mailbox: line.trim().to_owned(),
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const TWO_RECORDS: &str = "123\t2024-01-01\tSender\tWork\tInbox\tfalse\tSubject\tPreview text\n\
                               456\t2024-01-02\tAnother\tWork\tInbox\ttrue\tOther\tMore preview\n";

    #[test]
    fn two_records_decode_in_schema_order() {
        let records = parse_records(TWO_RECORDS, &MESSAGE_SCHEMA).unwrap();
        assert_eq!(records.len(), 2);
        let expected: Vec<&str> = MESSAGE_SCHEMA.field_names().collect();
        for record in &records {
            assert_eq!(record.field_names(), expected);
        }
        assert_eq!(records[0].text("id"), Some("123"));
        assert_eq!(records[0].flag("read"), Some(false));
        assert_eq!(records[1].text("from"), Some("Another"));
        assert_eq!(records[1].flag("read"), Some(true));
        assert_eq!(records[1].text("preview"), Some("More preview"));
    }

    #[test]
    fn records_serialize_as_ordered_objects_with_booleans() {
        let records = parse_records(TWO_RECORDS, &MESSAGE_SCHEMA).unwrap();
        let json = serde_json::to_string(&records[0]).unwrap();
        assert_eq!(
            json,
            r#"{"id":"123","received":"2024-01-01","from":"Sender","account":"Work","mailbox":"Inbox","read":false,"subject":"Subject","preview":"Preview text"}"#
        );
    }

    #[test]
    fn empty_output_is_empty_list() {
        assert!(parse_records("", &MESSAGE_SCHEMA).unwrap().is_empty());
        assert!(parse_records("\n\n", &MESSAGE_SCHEMA).unwrap().is_empty());
    }

    #[test]
    fn crlf_and_trailing_blank_lines_are_ignored() {
        let raw = "1\td\tf\ta\tm\tRead\ts\tp\r\n\r\n";
        let records = parse_records(raw, &MESSAGE_SCHEMA).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("preview"), Some("p"));
        assert_eq!(records[0].flag("read"), Some(true));
    }

    #[test]
    fn record_with_all_fields_empty_is_kept() {
        let raw = "1\td\tf\ta\tm\ttrue\ts\tp\n\t\t\t\t\t\t\t\n";
        let records = parse_records(raw, &MESSAGE_SCHEMA).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text("id"), Some(""));
        assert_eq!(records[1].flag("read"), Some(false));
        assert_eq!(records[1].text("preview"), Some(""));
    }

    #[test]
    fn last_column_keeps_extra_tabs() {
        let raw = "1\td\tf\ta\tm\tfalse\ts\tline with\ttab";
        let records = parse_records(raw, &MESSAGE_SCHEMA).unwrap();
        assert_eq!(records[0].text("preview"), Some("line with\ttab"));
    }

    #[test]
    fn short_line_fails_fast() {
        let raw = "1\td\tf\ta\tm\tfalse\ts\tp\n2\td\tf\n";
        let err = parse_records(raw, &MESSAGE_SCHEMA).unwrap_err();
        assert_eq!(err.code(), "EXECUTION_FAILED");
        assert!(err.message().contains("line 2"));
        assert!(err.message().contains("expected 8 fields, got 3"));
    }

    #[test]
    fn unknown_flag_token_is_rejected() {
        let raw = "1\td\tf\ta\tm\tmaybe\ts\tp";
        let err = parse_records(raw, &MESSAGE_SCHEMA).unwrap_err();
        assert!(err.message().contains("maybe"));
    }

    #[test]
    fn flag_tokens() {
        for token in ["true", "TRUE", "Read", "yes", "1", " true "] {
            assert_eq!(parse_flag(token), Some(true), "{token}");
        }
        for token in ["false", "Unread", "no", "0", ""] {
            assert_eq!(parse_flag(token), Some(false), "{token}");
        }
        assert_eq!(parse_flag("flagged"), None);
    }

    #[test]
    fn error_sentinel_raises_with_message() {
        let err = parse_records("ERROR: Mail is not running\n", &MESSAGE_SCHEMA).unwrap_err();
        assert_eq!(err.message(), "Mail is not running");
    }

    #[test]
    fn bare_error_sentinel_has_fallback_message() {
        let err = parse_status("ERROR:").unwrap_err();
        assert_eq!(err.message(), "script reported an error");
    }

    #[test]
    fn status_ok_succeeds() {
        assert!(parse_status("OK").is_ok());
        assert!(parse_status("OK\n").is_ok());
    }

    #[test]
    fn status_other_text_fails() {
        let err = parse_status("NOT_OK").unwrap_err();
        assert_eq!(err.code(), "EXECUTION_FAILED");
        assert!(err.message().contains("NOT_OK"));

        let err = parse_status("ERROR: message not found").unwrap_err();
        assert_eq!(err.message(), "message not found");

        assert!(parse_status("").is_err());
        assert!(parse_status("ok").is_err());
    }

    #[test]
    fn accounts_one_per_line() {
        let accounts = parse_accounts("Account A\nAccount B\n").unwrap();
        assert_eq!(accounts, vec!["Account A".to_owned(), "Account B".to_owned()]);
        assert!(parse_accounts("").unwrap().is_empty());
    }

    #[test]
    fn mailboxes_tab_joined_pairs() {
        let mailboxes = parse_mailboxes("Account A\tInbox\nAccount B\tArchive\n", None).unwrap();
        assert_eq!(
            mailboxes,
            vec![
                MailboxEntry {
                    account: "Account A".to_owned(),
                    mailbox: "Inbox".to_owned(),
                },
                MailboxEntry {
                    account: "Account B".to_owned(),
                    mailbox: "Archive".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn mailbox_single_value_uses_requested_account() {
        let mailboxes = parse_mailboxes("Inbox\nSent\n", Some("Work")).unwrap();
        assert_eq!(mailboxes[0].account, "Work");
        assert_eq!(mailboxes[1].mailbox, "Sent");

        let mailboxes = parse_mailboxes("Inbox", None).unwrap();
        assert_eq!(mailboxes[0].account, "");
    }
}
