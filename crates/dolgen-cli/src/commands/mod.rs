pub mod check;
pub mod configure;
pub mod progress;

use anyhow::{Context, Result};
use dolgen_build::{Generator, Invocation, Overrides};
use dolgen_config::ConfigLoader;
use std::path::{Path, PathBuf};

/// Default project declaration file
pub const DEFAULT_PROJECT: &str = "dolgen.toml";

/// Flags shared by every mode
///
/// The generated graph replays these when it reruns the generator.
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project declaration file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_PROJECT)]
    pub project: PathBuf,

    /// SDK revision to build (e.g. 36)
    #[arg(long, visible_alias = "version", value_name = "REVISION")]
    pub revision: Option<u32>,

    /// Base build directory
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Path to an extracted compiler collection
    #[arg(long, value_name = "DIR")]
    pub compilers: Option<PathBuf>,

    /// Generate map files
    #[arg(long)]
    pub map: bool,

    /// Build with debug info (output will not match)
    #[arg(long)]
    pub debug: bool,

    /// Windows emulation wrapper for the compilers (e.g. wine, wibo)
    #[cfg(not(windows))]
    #[arg(long, value_name = "BINARY")]
    pub wrapper: Option<PathBuf>,

    /// Build the archiver/disassembler from this source checkout
    #[arg(long, visible_alias = "build-dtk", value_name = "DIR")]
    pub build_toolchain_source: Option<PathBuf>,

    /// Path to the UTF-8 to Shift JIS wrapper
    #[arg(long, visible_alias = "sjiswrap", value_name = "EXE")]
    pub charset_wrapper: Option<PathBuf>,

    /// Verbose logging and per-module progress
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl GlobalArgs {
    #[cfg(not(windows))]
    fn wrapper(&self) -> Option<PathBuf> {
        self.wrapper.clone()
    }

    #[cfg(windows)]
    fn wrapper(&self) -> Option<PathBuf> {
        None
    }

    /// Overrides applied on top of the project declaration
    pub fn overrides(&self) -> Overrides {
        Overrides {
            revision: self.revision,
            build_dir: self.build_dir.clone(),
            compilers: self.compilers.clone(),
            wrapper: self.wrapper(),
            dtk_source: self.build_toolchain_source.clone(),
            sjiswrap: self.charset_wrapper.clone(),
            debug: self.debug,
            map: self.map,
            verbose: self.verbose,
        }
    }

    /// Arguments that reproduce these flags, without the mode
    pub fn replay_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut flag = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                args.push(name.to_string());
                args.push(value);
            }
        };
        let display = |path: &Option<PathBuf>| path.as_ref().map(|p| p.display().to_string());

        if self.project != Path::new(DEFAULT_PROJECT) {
            flag("--project", Some(self.project.display().to_string()));
        }
        flag("--revision", self.revision.map(|r| r.to_string()));
        flag("--build-dir", display(&self.build_dir));
        flag("--compilers", display(&self.compilers));
        flag("--wrapper", display(&self.wrapper()));
        flag("--build-toolchain-source", display(&self.build_toolchain_source));
        flag("--charset-wrapper", display(&self.charset_wrapper));

        for (name, set) in [("--map", self.map), ("--debug", self.debug), ("--verbose", self.verbose)] {
            if set {
                args.push(name.to_string());
            }
        }
        args
    }

    /// Load the project and set up a generator for it
    pub fn generator(&self) -> Result<Generator> {
        let config = ConfigLoader::new()
            .load(&self.project, &self.overrides())
            .with_context(|| format!("Failed to load project {}", self.project.display()))?;

        let generator = std::env::current_exe().context("Failed to locate the dolgen executable")?;
        let tool_helper = generator.with_file_name(format!("dolgen-tool{}", std::env::consts::EXE_SUFFIX));
        let invocation = Invocation::new(generator, tool_helper, self.replay_args());

        Ok(Generator::new(config, invocation))
    }
}
