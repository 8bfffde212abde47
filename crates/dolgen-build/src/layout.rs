//! Derived filesystem layout
//!
//! Every path the generator emits for an object comes from here. Paths are
//! pure functions of `(profile, library, unit)` and the output root:
//!
//! ```text
//! <src_root>/<library>/<unit source>        source
//! <out>/<profile>/<library>/obj/<name>.o    reference object (extracted)
//! <out>/<profile>/<library>/src/<stem>.o    compiled object
//! <out>/<profile>/<library>/dwarf/<name>.c  DWARF dump
//! <out>/<profile>/<library>/asm/<name>.s    disassembly
//! ```
//!
//! `<stem>` keeps the unit's subdirectories; `<name>` is only its file stem,
//! since archive members are extracted into one flat directory.

use dolgen_config::{CompilerProfile, Library, TranslationUnit};
use std::path::{Path, PathBuf};

/// One family of derived paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathFamily {
    /// Objects extracted from the reference archive
    Reference,
    /// Objects produced by the compiler
    Compiled,
    Dwarf,
    Asm,
}

impl PathFamily {
    /// Directory name of this family under `<out>/<profile>/<library>`
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Reference => "obj",
            Self::Compiled => "src",
            Self::Dwarf => "dwarf",
            Self::Asm => "asm",
        }
    }

    /// Extension of files in this family
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Reference | Self::Compiled => "o",
            Self::Dwarf => "c",
            Self::Asm => "s",
        }
    }
}

/// All paths derived for one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPaths {
    pub source: PathBuf,
    pub reference: PathBuf,
    pub compiled: PathBuf,
    pub dwarf: PathBuf,
    pub asm: PathBuf,
}

/// Resolves paths below one output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    out_root: PathBuf,
}

impl Layout {
    /// Create a layout rooted at `<build_dir>/<version>`
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Self {
            out_root: out_root.into(),
        }
    }

    pub fn out_root(&self) -> &Path {
        &self.out_root
    }

    /// `<out>/<profile>/<library>/<family>`
    pub fn family_dir(&self, profile: &CompilerProfile, library: &Library, family: PathFamily) -> PathBuf {
        self.out_root
            .join(&profile.name)
            .join(&library.name)
            .join(family.dir_name())
    }

    /// Path of a unit inside a family directory
    pub fn family_path(
        &self,
        profile: &CompilerProfile,
        library: &Library,
        unit: &TranslationUnit,
        family: PathFamily,
    ) -> PathBuf {
        let full = unit.stem();
        let stem = match family {
            PathFamily::Compiled => full.as_path(),
            // Archive members are extracted flat, by file name
            PathFamily::Reference | PathFamily::Dwarf | PathFamily::Asm => {
                full.file_name().map_or(full.as_path(), Path::new)
            }
        };
        let file = with_family_extension(stem, family);
        self.family_dir(profile, library, family).join(file)
    }

    /// Every derived path for one `(profile, library, unit)` triple
    pub fn object_paths(
        &self,
        src_root: &Path,
        profile: &CompilerProfile,
        library: &Library,
        unit: &TranslationUnit,
    ) -> ObjectPaths {
        ObjectPaths {
            source: source_path(src_root, library, unit),
            reference: self.family_path(profile, library, unit, PathFamily::Reference),
            compiled: self.family_path(profile, library, unit, PathFamily::Compiled),
            dwarf: self.family_path(profile, library, unit, PathFamily::Dwarf),
            asm: self.family_path(profile, library, unit, PathFamily::Asm),
        }
    }

    /// Execution results consumed by the progress step
    pub fn results_path(&self) -> PathBuf {
        self.out_root.join("config.json")
    }

    /// Progress report written by the progress step
    pub fn progress_path(&self) -> PathBuf {
        self.out_root.join("progress.json")
    }
}

/// `<src_root>/<library>/<unit source>`
pub fn source_path(src_root: &Path, library: &Library, unit: &TranslationUnit) -> PathBuf {
    src_root.join(&library.name).join(unit.source_name())
}

/// Diff name: `<profile>/<library>/<unit stem>` with forward slashes
pub fn diff_name(profile: &CompilerProfile, library: &Library, unit: &TranslationUnit) -> String {
    format!(
        "{}/{}/{}",
        profile.name,
        library.name,
        to_posix(&unit.stem())
    )
}

/// Render a path with forward slashes
pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn with_family_extension(stem: &Path, family: PathFamily) -> PathBuf {
    let mut file = stem.as_os_str().to_owned();
    file.push(".");
    file.push(family.extension());
    PathBuf::from(file)
}
