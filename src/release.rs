//! Release helpers used by CI: version detection, packaging and publishing.
//!
//! `detect` compares the package version in `Cargo.toml` with the one in the
//! previous commit and reports whether a release is needed. The results are
//! also appended to the file named by `GITHUB_OUTPUT` so later workflow
//! steps can read them.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable naming the workflow output file.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Environment variable holding the registry token for `publish`.
pub const REGISTRY_TOKEN_ENV: &str = "CARGO_REGISTRY_TOKEN";

/// Errors produced by the release helpers.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    /// A precondition or manifest problem.
    #[error("{0}")]
    Invalid(String),

    /// A subprocess exited unsuccessfully.
    #[error("`{command}` exited with code {code}")]
    Command {
        /// Command line as displayed.
        command: String,
        /// Exit code (1 when the process was killed by a signal).
        code: i32,
    },

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReleaseError {
    /// Process exit code the release binary should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Command { code, .. } => *code,
            _ => 1,
        }
    }
}

/// Outcome of `detect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Version in the working tree.
    pub current: String,
    /// Version at `HEAD^`, if it could be read.
    pub previous: Option<String>,
    /// Whether the versions differ (or there is no previous version).
    pub release_needed: bool,
}

impl Detection {
    /// Compare `current` against `previous`.
    pub fn new(current: String, previous: Option<String>) -> Self {
        let release_needed = previous.as_deref() != Some(current.as_str());
        Self {
            current,
            previous,
            release_needed,
        }
    }

    /// `key=value` pairs for the workflow output file.
    pub fn outputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("version", self.current.clone()),
            ("previous_version", self.previous.clone().unwrap_or_default()),
            ("release_needed", self.release_needed.to_string()),
        ]
    }
}

/// Extract `[package].version` from a Cargo manifest.
///
/// # Errors
///
/// Returns [`ReleaseError::Invalid`] if the manifest does not parse or has no
/// package version.
pub fn version_from_manifest(content: &str) -> Result<String, ReleaseError> {
    let manifest: toml::Table = content
        .parse()
        .map_err(|e| ReleaseError::Invalid(format!("cannot parse Cargo.toml: {e}")))?;
    manifest
        .get("package")
        .and_then(|package| package.get("version"))
        .and_then(toml::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ReleaseError::Invalid("Version not found in Cargo.toml".to_owned()))
}

/// Append `key=value` lines to `path`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or written.
pub fn write_outputs(path: &Path, outputs: &[(&str, String)]) -> Result<(), ReleaseError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (key, value) in outputs {
        writeln!(file, "{key}={value}")?;
    }
    Ok(())
}

/// Release operations rooted at a package directory.
#[derive(Debug, Clone)]
pub struct Release {
    root: PathBuf,
    github_output: Option<PathBuf>,
}

impl Release {
    /// Operate on the package at `root`, without a workflow output file.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            github_output: None,
        }
    }

    /// Operate on `root`, taking the workflow output file from the environment.
    pub fn from_env(root: impl Into<PathBuf>) -> Self {
        let github_output = std::env::var_os(GITHUB_OUTPUT_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            root: root.into(),
            github_output,
        }
    }

    /// Set (or clear) the workflow output file.
    pub fn with_github_output(mut self, path: Option<PathBuf>) -> Self {
        self.github_output = path;
        self
    }

    /// Version in the working-tree `Cargo.toml`.
    ///
    /// # Errors
    ///
    /// Fails if the manifest cannot be read or has no version.
    pub fn current_version(&self) -> Result<String, ReleaseError> {
        let content = std::fs::read_to_string(self.root.join("Cargo.toml"))?;
        version_from_manifest(&content)
    }

    /// Version in `Cargo.toml` at `HEAD^`, or `None` if git cannot show it.
    pub fn previous_version(&self) -> Option<String> {
        let output = Command::new("git")
            .args(["show", "HEAD^:Cargo.toml"])
            .current_dir(&self.root)
            .output()
            .ok()?;
        if !output.status.success() {
            tracing::debug!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "no previous manifest"
            );
            return None;
        }
        version_from_manifest(&String::from_utf8_lossy(&output.stdout)).ok()
    }

    /// Report whether the version changed since the previous commit.
    ///
    /// # Errors
    ///
    /// Fails if the current version cannot be read or outputs cannot be written.
    pub fn detect<W: Write>(&self, out: &mut W) -> Result<Detection, ReleaseError> {
        let detection = Detection::new(self.current_version()?, self.previous_version());

        writeln!(out, "Current version: {}", detection.current)?;
        writeln!(
            out,
            "Previous version: {}",
            detection.previous.as_deref().unwrap_or("[none]")
        )?;
        writeln!(
            out,
            "Release needed: {}",
            if detection.release_needed { "yes" } else { "no" }
        )?;

        if let Some(path) = &self.github_output {
            write_outputs(path, &detection.outputs())?;
        }
        Ok(detection)
    }

    /// Remove stale packages and run `cargo package`.
    ///
    /// Cargo's stdout goes to `out` and its stderr to `err`.
    ///
    /// # Errors
    ///
    /// Fails if the old package directory cannot be removed or cargo fails.
    pub fn build<O: Write, E: Write>(&self, out: &mut O, err: &mut E) -> Result<(), ReleaseError> {
        let package_dir = self.root.join("target").join("package");
        if package_dir.exists() {
            std::fs::remove_dir_all(&package_dir)?;
        }
        let mut command = Command::new("cargo");
        command.arg("package").current_dir(&self.root);
        run_command(&mut command, out, err)
    }

    /// Run `cargo publish` with `token`.
    ///
    /// # Errors
    ///
    /// Fails without a non-empty token or if cargo fails.
    pub fn publish<O: Write, E: Write>(
        &self,
        token: Option<&str>,
        out: &mut O,
        err: &mut E,
    ) -> Result<(), ReleaseError> {
        let token = token.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
            ReleaseError::Invalid(format!("Publishing requires {REGISTRY_TOKEN_ENV} to be set"))
        })?;
        let mut command = Command::new("cargo");
        command
            .arg("publish")
            .env(REGISTRY_TOKEN_ENV, token)
            .current_dir(&self.root);
        run_command(&mut command, out, err)
    }
}

/// Run `command`, forwarding its stdout to `out` and its stderr to `err`
/// whether or not it succeeds.
fn run_command<O: Write, E: Write>(
    command: &mut Command,
    out: &mut O,
    err: &mut E,
) -> Result<(), ReleaseError> {
    let shown = std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "Running: {shown}")?;

    let output = command.output()?;
    out.write_all(&output.stdout)?;
    out.flush()?;
    err.write_all(&output.stderr)?;
    err.flush()?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(1);
        tracing::debug!(command = %shown, code, "command failed");
        return Err(ReleaseError::Command {
            command: shown,
            code,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const MANIFEST: &str = "[package]\nname = \"demo\"\nversion = \"0.3.1\"\n";

    #[test]
    fn reads_package_version() {
        assert_eq!(version_from_manifest(MANIFEST).unwrap(), "0.3.1");
    }

    #[test]
    fn missing_version_is_error() {
        let err = version_from_manifest("[package]\nname = \"demo\"\n").unwrap_err();
        assert_eq!(err.to_string(), "Version not found in Cargo.toml");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn detection_compares_versions() {
        assert!(!Detection::new("1.0.0".into(), Some("1.0.0".into())).release_needed);
        assert!(Detection::new("1.1.0".into(), Some("1.0.0".into())).release_needed);
        assert!(Detection::new("1.0.0".into(), None).release_needed);
    }

    #[test]
    fn detection_outputs() {
        let detection = Detection::new("1.0.0".into(), None);
        assert_eq!(
            detection.outputs(),
            vec![
                ("version", "1.0.0".to_owned()),
                ("previous_version", String::new()),
                ("release_needed", "true".to_owned()),
            ]
        );
    }

    #[test]
    fn detect_without_history_needs_release_and_appends_outputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), MANIFEST).unwrap();
        let output_file = dir.path().join("github_output");
        std::fs::write(&output_file, "existing=1\n").unwrap();

        let release = Release::new(dir.path()).with_github_output(Some(output_file.clone()));
        let mut out = Vec::new();
        let detection = release.detect(&mut out).unwrap();

        assert!(detection.release_needed);
        assert!(detection.previous.is_none());
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(
            printed,
            "Current version: 0.3.1\nPrevious version: [none]\nRelease needed: yes\n"
        );
        let written = std::fs::read_to_string(&output_file).unwrap();
        assert_eq!(
            written,
            "existing=1\nversion=0.3.1\nprevious_version=\nrelease_needed=true\n"
        );
    }

    #[test]
    fn detect_without_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Release::new(dir.path()).detect(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, ReleaseError::Io(_)));
    }

    #[test]
    fn publish_requires_token() {
        let dir = tempfile::tempdir().unwrap();
        let release = Release::new(dir.path());
        for token in [None, Some(""), Some("  ")] {
            let err = release
                .publish(token, &mut Vec::new(), &mut Vec::new())
                .unwrap_err();
            assert!(err.to_string().contains(REGISTRY_TOKEN_ENV));
        }
    }

    #[cfg(unix)]
    #[test]
    fn failed_command_forwards_output_and_keeps_exit_code() {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "echo out; echo err >&2; exit 3"]);
        let (mut out, mut err_out) = (Vec::new(), Vec::new());
        let err = run_command(&mut command, &mut out, &mut err_out).unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert!(matches!(err, ReleaseError::Command { code: 3, .. }));
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Running: /bin/sh -c"));
        assert!(out.ends_with("out\n"));
        assert_eq!(String::from_utf8(err_out).unwrap(), "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn successful_command_forwards_stdout_and_stderr() {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "echo packaged; echo '   Packaging demo v0.3.1' >&2"]);
        let (mut out, mut err_out) = (Vec::new(), Vec::new());
        run_command(&mut command, &mut out, &mut err_out).unwrap();

        assert!(String::from_utf8(out).unwrap().ends_with("packaged\n"));
        assert_eq!(
            String::from_utf8(err_out).unwrap(),
            "   Packaging demo v0.3.1\n"
        );
    }
}
