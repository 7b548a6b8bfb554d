//! Configuration types for the mail bridge.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};
use crate::mail::runner::DEFAULT_OSASCRIPT;
use crate::tools::ToolMode;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Where the Mail scripts live and how to run them.
    pub scripts: ScriptsConfig,
    /// Which tools are exposed.
    pub tools: ToolsConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Script location and interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Directory containing the `mail_*.applescript` files.
    pub dir: PathBuf,
    /// Path to the `osascript` executable.
    pub osascript: PathBuf,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            dir: default_scripts_dir(),
            osascript: PathBuf::from(DEFAULT_OSASCRIPT),
        }
    }
}

/// Tool exposure settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// `read_only` hides `send_message` and `update_email_status`.
    pub mode: ToolMode,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Scripts shipped next to the config, `<config dir>/mail-bridge/scripts`.
fn default_scripts_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("mail-bridge")
        .join("scripts")
}

impl BridgeConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| BridgeError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Load `path` if given, otherwise the default path if it exists,
    /// otherwise defaults.
    ///
    /// # Errors
    ///
    /// An explicit path must be readable; a present default file must parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = Self::default_config_path();
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            tracing::debug!(path = %default_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| BridgeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/mail-bridge/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("mail-bridge")
            .join("config.toml")
    }

    /// Check values that would make every invocation fail.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] for an empty scripts dir or osascript path.
    pub fn validate(&self) -> Result<()> {
        if self.scripts.dir.as_os_str().is_empty() {
            return Err(BridgeError::Config("scripts.dir must not be empty".to_owned()));
        }
        if self.scripts.osascript.as_os_str().is_empty() {
            return Err(BridgeError::Config(
                "scripts.osascript must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}
