//! Tool system: the [`Tool`] trait, results, mode gating and the registry.
//!
//! # Mode Gating
//!
//! Tools respect [`ToolMode`]:
//! - `ReadOnly`: listing, searching and account/mailbox discovery
//! - `Full`: additionally sending mail and changing message status

pub mod registry;
pub mod types;

pub use registry::{LookupError, ToolRegistry};
pub use types::{DEFAULT_MAX_BYTES, Tool, ToolMode, ToolResult, decode_args, truncate_output};
