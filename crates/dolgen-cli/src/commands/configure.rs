//! Configure command - write the build graph and diff metadata

use super::GlobalArgs;
use anyhow::{Context, Result};
use tracing::info;

/// Which outputs to regenerate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outputs {
    /// `build.ninja`, `objdiff.json` and the state file
    All,
    /// Only `objdiff.json` and the state file
    DiffConfig,
}

/// Run the configure or diff-config mode
pub fn run(args: &GlobalArgs, outputs: Outputs) -> Result<()> {
    let generator = args.generator()?;

    let rendered = match outputs {
        Outputs::All => generator.configure().context("Failed to generate build files")?,
        Outputs::DiffConfig => generator
            .diff_config()
            .context("Failed to generate diff metadata")?,
    };

    info!(
        objects = rendered.project.objects().len(),
        compiled = rendered.plan.compile_count(),
        "generated {}",
        match outputs {
            Outputs::All => generator.outputs().graph.display(),
            Outputs::DiffConfig => generator.outputs().diff_config.display(),
        }
    );
    Ok(())
}
