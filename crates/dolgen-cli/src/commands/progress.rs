//! Progress command - report matched code and data

use super::GlobalArgs;
use anyhow::{Context, Result};

/// Aggregate execution results into `progress.json` and print the report
pub fn run(args: &GlobalArgs) -> Result<()> {
    let report = args
        .generator()?
        .progress()
        .context("Failed to calculate progress")?;
    print!("{}", report);
    Ok(())
}
