//! Error types for the mail bridge.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via
//! [`BridgeError::code()`]. Callers surface [`BridgeError::message()`]
//! verbatim.

use crate::mail::runner::ScriptError;

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// A required tool parameter was missing or empty.
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

    /// The external script failed or reported a failure.
    pub const EXECUTION_FAILED: &str = "EXECUTION_FAILED";

    /// Invalid or unreadable configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Local I/O failure outside of script execution.
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Errors produced by the mail bridge.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Raised before any script invocation for missing or empty required input.
    #[error("[{}] {}", error_codes::VALIDATION_FAILED, .0)]
    Validation(String),

    /// The script exited non-zero, printed an error sentinel, or returned
    /// output that could not be decoded.
    #[error("[{}] {}", error_codes::EXECUTION_FAILED, .message)]
    Execution {
        /// Human-readable failure message.
        message: String,
        /// Captured standard output, when the process ran.
        stdout: Option<String>,
        /// Captured standard error, when the process ran.
        stderr: Option<String>,
        /// Process exit code, when the process exited normally.
        exit_code: Option<i32>,
    },

    /// Invalid or unreadable configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// I/O error.
    #[error("[{}] {}", error_codes::IO_ERROR, .0)]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Execution error for script output that ran fine but could not be
    /// decoded. `raw` is kept as stdout.
    pub fn bad_output(message: impl Into<String>, raw: &str) -> Self {
        Self::Execution {
            message: message.into(),
            stdout: Some(raw.to_owned()),
            stderr: None,
            exit_code: None,
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => error_codes::VALIDATION_FAILED,
            Self::Execution { .. } => error_codes::EXECUTION_FAILED,
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Io(_) => error_codes::IO_ERROR,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Validation(m) | Self::Config(m) => m.clone(),
            Self::Execution { message, .. } => message.clone(),
            Self::Io(e) => e.to_string(),
        }
    }

    /// Whether this error was raised before any external invocation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<ScriptError> for BridgeError {
    fn from(err: ScriptError) -> Self {
        Self::Execution {
            message: err.message,
            stdout: err.stdout,
            stderr: err.stderr,
            exit_code: err.exit_code,
        }
    }
}

/// Convenience alias for bridge results.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_code() {
        let err = BridgeError::Validation("Subject is required".into());
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(err.is_validation());
    }

    #[test]
    fn execution_error_code() {
        let err = BridgeError::bad_output("boom", "NOT_OK\n");
        assert_eq!(err.code(), "EXECUTION_FAILED");
        match &err {
            BridgeError::Execution { stdout, exit_code, .. } => {
                assert_eq!(stdout.as_deref(), Some("NOT_OK\n"));
                assert_eq!(*exit_code, None);
            }
            other => unreachable!("expected execution error, got {other:?}"),
        }
        assert!(!err.is_validation());
    }

    #[test]
    fn display_includes_code_prefix() {
        let err = BridgeError::Validation("Subject is required".into());
        assert_eq!(err.to_string(), "[VALIDATION_FAILED] Subject is required");
    }

    #[test]
    fn message_strips_code_prefix() {
        let err = BridgeError::bad_output("message not found", "ERROR: message not found");
        assert_eq!(err.message(), "message not found");
    }

    #[test]
    fn script_error_keeps_diagnostics() {
        let script_err = ScriptError {
            message: "Mail got an error".to_owned(),
            stdout: Some("partial".to_owned()),
            stderr: Some("Mail got an error".to_owned()),
            exit_code: Some(1),
        };
        let err = BridgeError::from(script_err);
        match err {
            BridgeError::Execution {
                message,
                stdout,
                stderr,
                exit_code,
            } => {
                assert_eq!(message, "Mail got an error");
                assert_eq!(stdout.as_deref(), Some("partial"));
                assert_eq!(stderr.as_deref(), Some("Mail got an error"));
                assert_eq!(exit_code, Some(1));
            }
            other => unreachable!("expected execution error, got {other:?}"),
        }
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BridgeError = io_err.into();
        assert_eq!(err.code(), "IO_ERROR");
        assert!(err.message().contains("missing"));
    }
}
