//! Project Declaration (dolgen.toml)
//!
//! Raw, unvalidated shape of the project declaration file and of the
//! library declaration files it pulls in. Every field that may be omitted is
//! optional here; [`crate::ConfigLoader`] turns these into a validated
//! [`crate::ProjectConfig`].

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project declaration from dolgen.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    /// Project metadata and directory roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSection>,

    /// Revision number → release date (e.g. `36 = "2001-05-22"`)
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub revisions: BTreeMap<String, String>,

    /// External tool paths and pinned download tags
    #[serde(default)]
    pub tools: ToolsSection,

    /// Named compiler flag presets
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, Vec<String>>,

    /// Compiler profiles, in declaration order
    #[serde(default, rename = "profile")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<ProfileDecl>,

    /// Libraries declared inline
    #[serde(default, rename = "library")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LibraryDecl>,

    /// Progress report settings
    #[serde(default)]
    pub progress: ProgressSection,
}

/// `[project]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Project name (informational)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Version prefix; the version name is `<prefix>-<revision date>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_prefix: Option<String>,

    /// Revision used when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_revision: Option<u32>,

    /// Source root (default: "src")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_dir: Option<PathBuf>,

    /// Build root (default: "build")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,

    /// Root holding `<version>/<library><suffix>.a` reference archives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<PathBuf>,

    /// Default compiler identity for libraries that don't name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mw_version: Option<String>,

    /// Directories searched recursively for library declaration files
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub library_dirs: Vec<PathBuf>,

    /// Report every missing source file, not just complete ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn_missing_source: Option<bool>,
}

/// `[tools]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilers_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilers_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtk_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtk_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sjiswrap_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sjiswrap_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wibo_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapper_path: Option<PathBuf>,
}

/// `[progress]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProgressSection {
    /// Include the combined "All" category (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,
    /// Include the combined "Modules" category (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<bool>,
    /// Include one category per module (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub each_module: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_fancy_frac: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_fancy_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_fancy_frac: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_fancy_item: Option<String>,
}

/// A compiler flag list: either the name of a preset or an inline list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FlagSpec {
    /// Name of a `[flags]` preset
    Preset(String),
    /// Inline flags; entries of the form `@name` splice a preset
    List(Vec<String>),
}

impl Default for FlagSpec {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// `[[profile]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProfileDecl {
    pub name: String,
    /// Appended to the archive stem, e.g. `"D"` for `osD.a`
    #[serde(default)]
    pub archive_suffix: String,
    #[serde(default)]
    pub cflags: FlagSpec,
}

/// `[[library]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LibraryDecl {
    pub name: String,
    /// Compiler identity, e.g. "GC/1.2.5"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mw_version: Option<String>,
    /// Shared base flags for every unit in the library
    #[serde(default)]
    pub cflags: FlagSpec,
    /// Source root replacing `project.src_dir` for this library
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_dir: Option<PathBuf>,
    /// Archive stem when it differs from the library name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
    #[serde(default)]
    pub units: Vec<UnitDecl>,
}

/// Unit entry inside a `[[library]]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UnitDecl {
    pub name: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub signed_char: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cflags: Option<FlagSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_cflags: Option<FlagSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift_jis: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_to_all: Option<bool>,
}

/// A standalone library declaration file found under `library_dirs`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibraryFile {
    #[serde(default, rename = "library")]
    pub libraries: Vec<LibraryDecl>,
}

impl ProjectFile {
    /// Load the project declaration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = read_config(path)?;
        Self::parse(&content, path)
    }

    /// Parse a project declaration; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })
    }

    /// The `[project]` section, or an empty one
    pub fn project_section(&self) -> ProjectSection {
        self.project.clone().unwrap_or_default()
    }
}

impl LibraryFile {
    /// Load a library declaration file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = read_config(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })
    }
}

fn read_config(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::IoError(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_project() {
        let content = r#"
[project]
archive_dir = "orig"
version_prefix = "DOLSDK"

[revisions]
36 = "2001-05-22"
"#;
        let file = ProjectFile::parse(content, Path::new("dolgen.toml")).unwrap();
        let project = file.project_section();
        assert_eq!(project.archive_dir, Some(PathBuf::from("orig")));
        assert_eq!(file.revisions.get("36").map(String::as_str), Some("2001-05-22"));
        assert!(file.libraries.is_empty());
    }

    #[test]
    fn test_flag_spec_preset_or_list() {
        let content = r#"
[[library]]
name = "os"
cflags = "base"
units = [{ name = "OSAlloc.c", complete = true, extra_cflags = ["-inline deferred"] }]

[[library]]
name = "dvd"
cflags = ["-O4,p", "@base"]
"#;
        let file = ProjectFile::parse(content, Path::new("dolgen.toml")).unwrap();
        assert_eq!(file.libraries[0].cflags, FlagSpec::Preset("base".to_string()));
        assert_eq!(
            file.libraries[1].cflags,
            FlagSpec::List(vec!["-O4,p".to_string(), "@base".to_string()])
        );
        let unit = &file.libraries[0].units[0];
        assert!(unit.complete);
        assert!(!unit.signed_char);
        assert_eq!(
            unit.extra_cflags,
            Some(FlagSpec::List(vec!["-inline deferred".to_string()]))
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let content = r#"
[project]
archive = "orig"
"#;
        let result = ProjectFile::parse(content, Path::new("dolgen.toml"));
        assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = ProjectFile::load_from_file(Path::new("/nonexistent/dolgen.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
