//! Release helper for CI: detect version bumps, package and publish.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mail_bridge::release::{REGISTRY_TOKEN_ENV, Release, ReleaseError};
use tracing_subscriber::EnvFilter;

/// Release utility helpers.
#[derive(Parser)]
#[command(name = "mail-release", version, about)]
struct Cli {
    /// Package root containing Cargo.toml.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Command to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Compare the package version with the previous commit.
    Detect,

    /// Remove old packages and run `cargo package`.
    Build,

    /// Run `cargo publish` (requires CARGO_REGISTRY_TOKEN).
    Publish,
}

fn run(cli: Cli) -> Result<(), ReleaseError> {
    let release = Release::from_env(cli.root);
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();
    match cli.command {
        Command::Detect => release.detect(&mut stdout).map(|_| ()),
        Command::Build => release.build(&mut stdout, &mut stderr),
        Command::Publish => {
            let token = std::env::var(REGISTRY_TOKEN_ENV).ok();
            release.publish(token.as_deref(), &mut stdout, &mut stderr)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
