use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dolgen_build::{write_atomic, HostPlatform, ToolKind};
use std::fs;
use std::path::PathBuf;

mod depfile;
mod download;

use depfile::DriveMap;

/// Helper run by dolgen build graphs.
///
/// Downloads pinned tool releases and rewrites compiler dep files written
/// under a Windows emulation layer.
#[derive(Parser, Debug)]
#[command(name = "dolgen-tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a pinned tool release
    Download {
        /// dtk, sjiswrap, wibo, compilers or objdiff-cli
        tool: ToolKind,
        /// Binary path, or directory for zip payloads
        output: PathBuf,
        /// Release tag
        #[arg(long)]
        tag: String,
    },
    /// Convert dependency paths to host paths
    TransformDep {
        /// Dep file written by the compiler
        input: PathBuf,
        /// Destination (may equal the input)
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Download { tool, output, tag } => {
            download::download(tool, &tag, &output, &HostPlatform::current())
        }
        Command::TransformDep { input, output } => {
            let text = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let rewritten = depfile::transform(&text, &DriveMap::from_env());
            write_atomic(&output, &rewritten)
                .with_context(|| format!("Failed to write {}", output.display()))
        }
    }
}
