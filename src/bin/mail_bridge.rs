//! MCP server binary exposing Apple Mail tools over stdin/stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON-RPC channel.

use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mail_bridge::{BridgeConfig, McpServer, OsascriptRunner, ToolMode, build_registry};
use tracing_subscriber::EnvFilter;

/// Apple Mail bridge: list, search and send mail through AppleScript.
#[derive(Parser)]
#[command(name = "mail-bridge", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing the mail_*.applescript files.
    #[arg(long)]
    scripts_dir: Option<PathBuf>,

    /// Tool mode: read_only or full.
    #[arg(long)]
    mode: Option<ToolMode>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = BridgeConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.scripts_dir {
        config.scripts.dir = dir;
    }
    if let Some(mode) = cli.mode {
        config.tools.mode = mode;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    // Initialise tracing to stderr only (stdout is reserved for the protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    tracing::info!(
        scripts_dir = %config.scripts.dir.display(),
        mode = config.tools.mode.as_str(),
        "mail-bridge starting"
    );

    let runner = OsascriptRunner::new(&config.scripts.dir)
        .with_osascript(&config.scripts.osascript);
    let registry = build_registry(config.tools.mode, Arc::new(runner));
    tracing::debug!(tools = ?registry.list_available(), "tools registered");
    let server = McpServer::new(registry);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    server
        .serve(BufReader::new(stdin.lock()), BufWriter::new(stdout.lock()))
        .map_err(|e| {
            tracing::error!(error = %e, "mail-bridge exited with error");
            anyhow::anyhow!("mail-bridge failed: {e}")
        })?;

    tracing::info!("mail-bridge shut down cleanly");
    Ok(())
}
