//! Declared translation units, compiler profiles and libraries
//!
//! These are the validated, immutable declarations every later stage reads.
//! A [`Library`] exclusively owns its units; profiles are shared by all
//! libraries.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Per-unit build options
///
/// Every field has a documented default so a unit can be declared with just
/// a name and a completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOptions {
    /// Source file relative to the library's source root (default: the unit name)
    pub source: Option<PathBuf>,
    /// Compiler identity (default: the library's)
    pub mw_version: Option<String>,
    /// Replaces the library's base flags (default: use the library's)
    pub cflags: Option<Vec<String>>,
    /// Appended after every other flag (default: none)
    pub extra_cflags: Vec<String>,
    /// Compile through the charset-transcoding wrapper (default: true)
    pub shift_jis: bool,
    /// Include in the `all_source` target (default: true)
    pub add_to_all: bool,
}

impl Default for UnitOptions {
    fn default() -> Self {
        Self {
            source: None,
            mw_version: None,
            cflags: None,
            extra_cflags: Vec::new(),
            shift_jis: true,
            add_to_all: true,
        }
    }
}

/// One source file inside a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Relative source path, e.g. "OSAlloc.c"
    pub name: String,
    /// Known to compile byte-identical to the reference
    pub complete: bool,
    /// Compile with `-char signed` instead of `-char unsigned`
    pub signed_char: bool,
    pub options: UnitOptions,
}

impl TranslationUnit {
    /// Create a unit with default options
    pub fn new(name: impl Into<String>, complete: bool) -> Self {
        Self {
            name: name.into(),
            complete,
            signed_char: false,
            options: UnitOptions::default(),
        }
    }

    /// Set character signedness
    pub fn with_signed_char(mut self, signed_char: bool) -> Self {
        self.signed_char = signed_char;
        self
    }

    /// Replace the unit options
    pub fn with_options(mut self, options: UnitOptions) -> Self {
        self.options = options;
        self
    }

    /// Source file relative to the library's source root
    pub fn source_name(&self) -> &Path {
        self.options
            .source
            .as_deref()
            .unwrap_or_else(|| Path::new(&self.name))
    }

    /// Unit name without its extension ("dir/OSAlloc.c" → "dir/OSAlloc")
    pub fn stem(&self) -> PathBuf {
        Path::new(&self.name).with_extension("")
    }

    /// The character signedness flag for this unit
    pub fn char_flag(&self) -> &'static str {
        if self.signed_char {
            "-char signed"
        } else {
            "-char unsigned"
        }
    }
}

/// A named compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerProfile {
    pub name: String,
    /// Appended to the archive stem to find this profile's reference archive
    pub archive_suffix: String,
    pub flags: Vec<String>,
}

impl CompilerProfile {
    /// Create a profile
    pub fn new(name: impl Into<String>, archive_suffix: impl Into<String>, flags: Vec<String>) -> Self {
        Self {
            name: name.into(),
            archive_suffix: archive_suffix.into(),
            flags,
        }
    }
}

/// A named group of units compiled with shared base flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    /// Compiler identity shared by the library's units
    pub mw_version: String,
    /// Base flags shared by the library's units
    pub cflags: Vec<String>,
    /// Replaces the project source root for this library
    pub source_root_override: Option<PathBuf>,
    /// Archive stem when it differs from the library name
    pub archive: Option<String>,
    units: Vec<TranslationUnit>,
}

impl Library {
    /// Create a library, rejecting duplicate unit names
    pub fn new(
        name: impl Into<String>,
        mw_version: impl Into<String>,
        cflags: Vec<String>,
        units: Vec<TranslationUnit>,
    ) -> ConfigResult<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        for unit in &units {
            if !seen.insert(unit.name.as_str()) {
                return Err(ConfigError::DuplicateUnit {
                    library: name,
                    unit: unit.name.clone(),
                });
            }
        }

        Ok(Self {
            name,
            mw_version: mw_version.into(),
            cflags,
            source_root_override: None,
            archive: None,
            units,
        })
    }

    /// Set the source root override
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root_override = Some(root.into());
        self
    }

    /// Set the archive stem
    pub fn with_archive(mut self, archive: impl Into<String>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    /// Units in declaration order
    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    /// Archive file name for a profile, e.g. "osD.a"
    pub fn archive_file_name(&self, profile: &CompilerProfile) -> String {
        let stem = self.archive.as_deref().unwrap_or(&self.name);
        format!("{}{}.a", stem, profile.archive_suffix)
    }
}
