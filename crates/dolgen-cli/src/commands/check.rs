//! Check command - validate the project without writing anything

use super::GlobalArgs;
use anyhow::{Context, Result};

/// Resolve everything a configure run would and print a summary
pub fn run(args: &GlobalArgs) -> Result<()> {
    let summary = args
        .generator()?
        .check()
        .context("Project check failed")?;
    print!("{}", summary);
    Ok(())
}
