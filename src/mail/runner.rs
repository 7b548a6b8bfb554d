//! External script invocation.
//!
//! [`ScriptRunner`] is the seam between the mail tools and the scripting
//! runtime that drives Mail.app. Production uses [`OsascriptRunner`]; tests
//! use [`super::mock_runner::MockScriptRunner`].

use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Default location of the `osascript` binary on macOS.
pub const DEFAULT_OSASCRIPT: &str = "/usr/bin/osascript";

/// Failure of a single script invocation.
///
/// Carries whatever diagnostics were captured: stdout and stderr when the
/// process ran, and the exit code when it exited normally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ScriptError {
    /// Human-readable failure message.
    pub message: String,
    /// Captured standard output.
    pub stdout: Option<String>,
    /// Captured standard error.
    pub stderr: Option<String>,
    /// Exit code of the process, if it exited normally.
    pub exit_code: Option<i32>,
}

impl ScriptError {
    /// A failure that happened before the process produced any output.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stdout: None,
            stderr: None,
            exit_code: None,
        }
    }
}

/// Runs a named script with positional string arguments and returns its
/// captured standard output.
pub trait ScriptRunner: Send + Sync {
    /// Run `script` with `args`, blocking until it completes.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError`] if the script cannot be started or exits
    /// with a non-zero status.
    fn run(&self, script: &str, args: &[String]) -> Result<String, ScriptError>;
}

/// Runs AppleScript files from a directory through `osascript`.
#[derive(Debug, Clone)]
pub struct OsascriptRunner {
    osascript: PathBuf,
    scripts_dir: PathBuf,
}

impl OsascriptRunner {
    /// Create a runner that resolves script names inside `scripts_dir`.
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            osascript: PathBuf::from(DEFAULT_OSASCRIPT),
            scripts_dir: scripts_dir.into(),
        }
    }

    /// Override the `osascript` binary.
    pub fn with_osascript(mut self, osascript: impl Into<PathBuf>) -> Self {
        self.osascript = osascript.into();
        self
    }

    /// Full path for a script name.
    pub fn script_path(&self, script: &str) -> PathBuf {
        self.scripts_dir.join(script)
    }
}

impl ScriptRunner for OsascriptRunner {
    fn run(&self, script: &str, args: &[String]) -> Result<String, ScriptError> {
        let path = self.script_path(script);
        if !path.is_file() {
            return Err(ScriptError::message_only(format!(
                "script not found: {}",
                path.display()
            )));
        }

        tracing::debug!(script, args = ?args, "running osascript");

        let output = Command::new(&self.osascript)
            .arg(&path)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                ScriptError::message_only(format!(
                    "failed to spawn {}: {e}",
                    self.osascript.display()
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let exit_code = output.status.code();
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            let message = match exit_code {
                Some(code) => format!("{script} exited with code {code}: {detail}"),
                None => format!("{script} terminated by signal: {detail}"),
            };
            tracing::warn!(script, exit_code = ?exit_code, "script failed");
            return Err(ScriptError {
                message,
                stdout: Some(stdout),
                stderr: Some(stderr),
                exit_code,
            });
        }

        if !stderr.trim().is_empty() {
            tracing::debug!(script, stderr = %stderr.trim(), "script wrote to stderr");
        }

        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn script_path_joins_scripts_dir() {
        let runner = OsascriptRunner::new("/opt/scripts");
        assert_eq!(
            runner.script_path("mail_send.applescript"),
            PathBuf::from("/opt/scripts/mail_send.applescript")
        );
    }

    #[test]
    fn missing_script_is_reported_without_spawning() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let runner = OsascriptRunner::new(dir.path()).with_osascript("/nonexistent/osascript");
        let err = runner
            .run("mail_list_accounts.applescript", &[])
            .expect_err("missing script must fail");
        assert!(err.message.contains("script not found"));
        assert_eq!(err.exit_code, None);
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_captures_output_and_code() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("fail.sh"), "echo out; echo bad >&2; exit 3\n")
            .expect("write script");
        let runner = OsascriptRunner::new(dir.path()).with_osascript("/bin/sh");

        let err = runner.run("fail.sh", &[]).expect_err("script exits 3");
        assert_eq!(err.exit_code, Some(3));
        assert_eq!(err.stdout.as_deref(), Some("out\n"));
        assert_eq!(err.stderr.as_deref(), Some("bad\n"));
        assert!(err.message.contains("bad"));
    }

    #[cfg(unix)]
    #[test]
    fn positional_arguments_are_passed_in_order() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("echo.sh"), "printf '%s|' \"$@\"\n").expect("write script");
        let runner = OsascriptRunner::new(dir.path()).with_osascript("/bin/sh");

        let args = vec!["5".to_owned(), String::new(), "Inbox".to_owned()];
        let out = runner.run("echo.sh", &args).expect("script succeeds");
        assert_eq!(out, "5||Inbox|");
    }
}
