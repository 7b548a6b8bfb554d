//! Argument marshaling for the Mail scripts.
//!
//! Every script takes a fixed number of positional string arguments in a
//! fixed order. The builders here apply defaults and clamping and never
//! omit a position: an absent value is passed as the empty string.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Hard upper bound on how many messages a script may scan, appended to
/// every message query independent of the requested limit.
pub const SCAN_CEILING: usize = 500;

/// Read-state filter for message queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Both read and unread messages.
    #[default]
    Any,
    /// Only read messages.
    Read,
    /// Only unread messages.
    Unread,
}

impl StatusFilter {
    /// The keyword the scripts expect.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::Any => "any",
            StatusFilter::Read => "read",
            StatusFilter::Unread => "unread",
        }
    }
}

/// Default and maximum result counts for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    /// Used when the caller gives no limit.
    pub default: usize,
    /// Requested limits above this are clamped down to it.
    pub max: usize,
}

impl LimitPolicy {
    /// Resolve a requested limit. Values are clamped down, never up.
    pub fn resolve(self, requested: Option<RequestedLimit>) -> usize {
        requested.map_or(self.default, |RequestedLimit(n)| n).min(self.max)
    }
}

/// A caller-supplied limit.
///
/// Any non-negative JSON number is accepted: fractions are truncated and
/// values beyond `usize` saturate, so [`LimitPolicy::resolve`] can clamp
/// them. Negative numbers and non-numbers are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLimit(pub usize);

impl<'de> Deserialize<'de> for RequestedLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LimitVisitor;

        impl Visitor<'_> for LimitVisitor {
            type Value = RequestedLimit;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative number")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(RequestedLimit(usize::try_from(v).unwrap_or(usize::MAX)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom(format!("limit must not be negative, got {v}")))
                    .and_then(|v| self.visit_u64(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
                if v.is_nan() || v < 0.0 {
                    return Err(E::custom(format!("limit must not be negative, got {v}")));
                }
                // `as` saturates at usize::MAX.
                Ok(RequestedLimit(v as usize))
            }
        }

        deserializer.deserialize_any(LimitVisitor)
    }
}

/// Split a free-form recipient string on commas, semicolons and newlines.
///
/// Surrounding whitespace is trimmed and empty entries are dropped. Order
/// is preserved and duplicates are kept.
pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Recipients as supplied by a caller: one free-form string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecipientInput {
    /// `"a@x, b@x; c@x"`
    One(String),
    /// `["a@x", "b@x; c@x"]`
    Many(Vec<String>),
}

impl RecipientInput {
    /// Flatten into normalized addresses, splitting every entry.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            RecipientInput::One(raw) => split_recipients(raw),
            RecipientInput::Many(entries) => entries
                .iter()
                .flat_map(|entry| split_recipients(entry))
                .collect(),
        }
    }
}

/// Trim an optional text parameter, treating blank input as absent.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// A resolved message listing or search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    /// Effective (clamped) limit.
    pub limit: usize,
    /// Read-state filter.
    pub status: StatusFilter,
    /// Restrict to one account.
    pub account: Option<String>,
    /// Restrict to one mailbox.
    pub mailbox: Option<String>,
    /// Free-text match.
    pub query: Option<String>,
}

impl MessageQuery {
    /// Positional arguments:
    /// `[limit, status, account, mailbox, query, scan-ceiling]`.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.limit.to_string(),
            self.status.as_str().to_owned(),
            self.account.clone().unwrap_or_default(),
            self.mailbox.clone().unwrap_or_default(),
            self.query.clone().unwrap_or_default(),
            SCAN_CEILING.to_string(),
        ]
    }
}

/// Require a non-blank value, returning it exactly as supplied.
fn required_text(value: Option<&str>, message: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_owned()),
        _ => Err(BridgeError::Validation(message.to_owned())),
    }
}

/// Validate a search term. Blank terms are rejected before any script runs.
pub fn require_search_term(term: Option<&str>) -> Result<String> {
    non_blank(term).ok_or_else(|| BridgeError::Validation("Search term is required".to_owned()))
}

/// A validated outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Primary recipients, never empty.
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    pub cc: Vec<String>,
    /// Subject line as supplied, never blank.
    pub subject: String,
    /// Plain-text body as supplied, never blank.
    pub body: String,
    /// Message id of the message being replied to.
    pub reply_to: Option<String>,
}

impl OutgoingMessage {
    /// Validate required fields in order: `to`, then `subject`, then `body`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] naming the first missing field.
    pub fn new(
        to: Option<&RecipientInput>,
        cc: Option<&RecipientInput>,
        subject: Option<&str>,
        body: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<Self> {
        let to = to.map(RecipientInput::normalize).unwrap_or_default();
        if to.is_empty() {
            return Err(BridgeError::Validation(
                "Recipient email (to) is required".to_owned(),
            ));
        }
        let subject = required_text(subject, "Subject is required")?;
        let body = required_text(body, "Body is required")?;

        Ok(Self {
            to,
            cc: cc.map(RecipientInput::normalize).unwrap_or_default(),
            subject,
            body,
            reply_to: non_blank(reply_to),
        })
    }

    /// Positional arguments:
    /// `[subject, body, reply-to, to-count, cc-count, to..., cc...]`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(5 + self.to.len() + self.cc.len());
        args.push(self.subject.clone());
        args.push(self.body.clone());
        args.push(self.reply_to.clone().unwrap_or_default());
        args.push(self.to.len().to_string());
        args.push(self.cc.len().to_string());
        args.extend(self.to.iter().cloned());
        args.extend(self.cc.iter().cloned());
        args
    }
}

/// Positional arguments for a status update: `[id, action]`, unchanged.
pub fn status_update_args(id: Option<&str>, action: Option<&str>) -> Result<Vec<String>> {
    let id = required_text(id, "Message id is required")?;
    let action = required_text(action, "Action is required")?;
    Ok(vec![id, action])
}

/// Positional arguments for the mailbox listing: `[account]`.
pub fn mailbox_listing_args(account: Option<&str>) -> Vec<String> {
    vec![account.unwrap_or_default().to_owned()]
}
