//! Validated project configuration
//!
//! [`ProjectConfig`] is built once per invocation by [`crate::ConfigLoader`]
//! and only read afterwards. Every component receives it by reference.

use crate::library::{CompilerProfile, Library, TranslationUnit};
use std::path::{Path, PathBuf};

/// A local path or a pinned download tag for one external tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSpec {
    /// Use this file or directory as-is
    pub path: Option<PathBuf>,
    /// Download this release tag
    pub tag: Option<String>,
}

impl ToolSpec {
    /// A spec that only carries a download tag
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            path: None,
            tag: Some(tag.into()),
        }
    }

    /// A spec that only carries a local path
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            tag: None,
        }
    }

    /// Neither a path nor a tag is set
    pub fn is_unset(&self) -> bool {
        self.path.is_none() && self.tag.is_none()
    }
}

/// Specifications for the four external tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolConfig {
    /// Legacy compiler collection (directory of `<mw_version>/mwcceppc.exe`)
    pub compilers: ToolSpec,
    /// Windows emulation layer (wibo/wine); unused on Windows hosts
    pub wrapper: ToolSpec,
    /// Archiver/disassembler/DWARF dumper
    pub dtk: ToolSpec,
    /// Build the archiver from this source checkout instead of downloading it
    pub dtk_source: Option<PathBuf>,
    /// Charset-transcoding wrapper
    pub sjiswrap: ToolSpec,
}

/// Progress report settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressOptions {
    /// Include the combined "All" category
    pub all: bool,
    /// Include the combined "Modules" category
    pub modules: bool,
    /// Include one category per module
    pub each_module: bool,
    pub code_fancy_frac: u32,
    pub code_fancy_item: String,
    pub data_fancy_frac: u32,
    pub data_fancy_item: String,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            all: true,
            modules: true,
            each_module: true,
            code_fancy_frac: 0,
            code_fancy_item: String::new(),
            data_fancy_frac: 0,
            data_fancy_item: String::new(),
        }
    }
}

impl ProgressOptions {
    /// Whether the fancy summary line is printed
    pub fn use_fancy(&self) -> bool {
        self.code_fancy_frac > 0 || self.data_fancy_frac > 0
    }
}

/// Command-line overrides applied on top of the project declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub revision: Option<u32>,
    pub build_dir: Option<PathBuf>,
    pub compilers: Option<PathBuf>,
    pub wrapper: Option<PathBuf>,
    pub dtk_source: Option<PathBuf>,
    pub sjiswrap: Option<PathBuf>,
    /// Add debug info to every unit (output no longer matches)
    pub debug: bool,
    /// Generate map files
    pub map: bool,
    pub verbose: bool,
}

/// Immutable, validated configuration for one generator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    /// Selected revision number
    pub revision: u32,
    /// Version name, e.g. "DOLSDK-2001-05-22"
    pub version: String,
    pub src_dir: PathBuf,
    pub build_dir: PathBuf,
    /// Directory holding this version's reference archives
    pub archive_dir: PathBuf,
    /// Profiles in declaration order
    pub profiles: Vec<CompilerProfile>,
    /// Libraries in declaration order (inline first, then library files)
    pub libraries: Vec<Library>,
    pub tools: ToolConfig,
    pub debug: bool,
    /// `--map`; only replayed into the graph, map files come from the link stage
    pub generate_map: bool,
    pub verbose: bool,
    pub warn_missing_source: bool,
    pub progress: ProgressOptions,
    /// The project declaration file
    pub project_file: PathBuf,
    /// Library declaration files pulled in from `library_dirs`
    pub library_files: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Output root for this version: `<build_dir>/<version>`
    pub fn out_path(&self) -> PathBuf {
        self.build_dir.join(&self.version)
    }

    /// Every file whose change requires regenerating the build graph
    pub fn config_inputs(&self) -> Vec<PathBuf> {
        let mut inputs = Vec::with_capacity(1 + self.library_files.len());
        inputs.push(self.project_file.clone());
        inputs.extend(self.library_files.iter().cloned());
        inputs
    }

    /// Source root for a library
    pub fn source_root<'a>(&'a self, library: &'a Library) -> &'a Path {
        library
            .source_root_override
            .as_deref()
            .unwrap_or(&self.src_dir)
    }

    /// Find a declared unit by name
    ///
    /// Accepts the bare unit name ("OSAlloc.c"), the library-qualified name
    /// ("os/OSAlloc.c") or either form without its extension.
    pub fn find_unit(&self, name: &str) -> Option<(&Library, &TranslationUnit)> {
        self.libraries.iter().find_map(|lib| {
            lib.units()
                .iter()
                .find(|unit| unit_matches(lib, unit, name))
                .map(|unit| (lib, unit))
        })
    }
}

fn unit_matches(lib: &Library, unit: &TranslationUnit, name: &str) -> bool {
    let stem = unit.stem();
    let stem = stem.to_string_lossy();
    if name == unit.name || name == stem {
        return true;
    }
    match name.strip_prefix(lib.name.as_str()).and_then(|r| r.strip_prefix('/')) {
        Some(rest) => rest == unit.name || rest == stem,
        None => false,
    }
}
