//! Configuration Loader
//!
//! Loads the project declaration, pulls in library declaration files and
//! applies command-line overrides with proper precedence:
//! 1. Project declaration (dolgen.toml) - lowest priority
//! 2. Library declaration files (appended after inline libraries)
//! 3. Command-line overrides - highest priority

use crate::config::{Overrides, ProgressOptions, ProjectConfig, ToolConfig, ToolSpec};
use crate::flags::FlagPresets;
use crate::library::{CompilerProfile, Library, TranslationUnit, UnitOptions};
use crate::project::{LibraryDecl, LibraryFile, ProjectFile, ProjectSection, UnitDecl};
use crate::{ConfigError, ConfigResult};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration loader
pub struct ConfigLoader {
    /// Whether to scan `library_dirs` for declaration files
    scan_library_dirs: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            scan_library_dirs: true,
        }
    }

    /// Only use libraries declared inline in the project file
    pub fn without_library_dirs(mut self) -> Self {
        self.scan_library_dirs = false;
        self
    }

    /// Load and validate the configuration rooted at `project_file`
    pub fn load(&self, project_file: &Path, overrides: &Overrides) -> ConfigResult<ProjectConfig> {
        let file = ProjectFile::load_from_file(project_file)?;

        let mut library_files = Vec::new();
        let mut extra_libraries = Vec::new();
        if self.scan_library_dirs {
            let base = project_file.parent().unwrap_or_else(|| Path::new(""));
            for dir in &file.project_section().library_dirs {
                for path in find_library_files(&base.join(dir))? {
                    extra_libraries.extend(LibraryFile::load_from_file(&path)?.libraries);
                    library_files.push(path);
                }
            }
        }

        resolve(file, extra_libraries, library_files, project_file, overrides)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect `*.toml` files below `dir`, sorted for a stable declaration order
fn find_library_files(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConfigError::InvalidValue {
            field: "project.library_dirs".to_string(),
            reason: format!("'{}' is not a directory", dir.display()),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ConfigError::IoError(e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Validate a parsed project declaration into a [`ProjectConfig`]
///
/// Pure: performs no I/O. `library_files` is recorded for regeneration only.
pub fn resolve(
    file: ProjectFile,
    extra_libraries: Vec<LibraryDecl>,
    library_files: Vec<PathBuf>,
    project_file: &Path,
    overrides: &Overrides,
) -> ConfigResult<ProjectConfig> {
    let section = file.project_section();
    let missing = |field: &str| ConfigError::MissingField {
        field: field.to_string(),
        file: project_file.to_path_buf(),
    };

    let version_prefix = section
        .version_prefix
        .clone()
        .ok_or_else(|| missing("project.version_prefix"))?;
    let archive_root = section
        .archive_dir
        .clone()
        .ok_or_else(|| missing("project.archive_dir"))?;

    let revisions = parse_revisions(&file.revisions)?;
    if revisions.is_empty() {
        return Err(missing("revisions"));
    }
    let revision = select_revision(&revisions, &section, overrides).ok_or_else(|| missing("project.default_revision"))?;
    let date = revisions
        .get(&revision)
        .ok_or_else(|| ConfigError::InvalidRevision {
            revision,
            expected: describe_revisions(&revisions),
        })?;
    let version = format!("{}-{}", version_prefix, date);

    let presets = FlagPresets::new(&file.flags, revision);

    if file.profiles.is_empty() {
        return Err(missing("profile"));
    }
    let mut profiles = Vec::with_capacity(file.profiles.len());
    let mut profile_names = HashSet::new();
    for decl in &file.profiles {
        if !profile_names.insert(decl.name.clone()) {
            return Err(ConfigError::DuplicateProfile(decl.name.clone()));
        }
        let flags = presets.expand(&decl.cflags, &format!("profile '{}'", decl.name))?;
        profiles.push(CompilerProfile::new(&decl.name, &decl.archive_suffix, flags));
    }

    let declarations: Vec<&LibraryDecl> = file.libraries.iter().chain(extra_libraries.iter()).collect();
    if declarations.is_empty() {
        return Err(missing("library"));
    }
    let mut libraries = Vec::with_capacity(declarations.len());
    let mut library_names = HashSet::new();
    for decl in declarations {
        if !library_names.insert(decl.name.clone()) {
            return Err(ConfigError::DuplicateLibrary(decl.name.clone()));
        }
        libraries.push(resolve_library(decl, &section, &presets, project_file)?);
    }

    let tools = resolve_tools(&file, overrides);
    let progress = resolve_progress(&file);

    Ok(ProjectConfig {
        name: section.name.clone().unwrap_or_else(|| version_prefix.clone()),
        revision,
        archive_dir: archive_root.join(&version),
        version,
        src_dir: section.src_dir.clone().unwrap_or_else(|| PathBuf::from("src")),
        build_dir: overrides
            .build_dir
            .clone()
            .or_else(|| section.build_dir.clone())
            .unwrap_or_else(|| PathBuf::from("build")),
        profiles,
        libraries,
        tools,
        debug: overrides.debug,
        generate_map: overrides.map,
        verbose: overrides.verbose,
        warn_missing_source: section.warn_missing_source.unwrap_or(false),
        progress,
        project_file: project_file.to_path_buf(),
        library_files,
    })
}

fn parse_revisions(raw: &BTreeMap<String, String>) -> ConfigResult<BTreeMap<u32, String>> {
    raw.iter()
        .map(|(key, date)| {
            key.parse::<u32>()
                .map(|rev| (rev, date.clone()))
                .map_err(|_| ConfigError::InvalidValue {
                    field: format!("revisions.{}", key),
                    reason: "revision keys must be numbers".to_string(),
                })
        })
        .collect()
}

fn select_revision(
    revisions: &BTreeMap<u32, String>,
    section: &ProjectSection,
    overrides: &Overrides,
) -> Option<u32> {
    overrides.revision.or(section.default_revision).or_else(|| {
        if revisions.len() == 1 {
            revisions.keys().next().copied()
        } else {
            None
        }
    })
}

/// "36", "36 or 37", "36, 37 or 38"
fn describe_revisions(revisions: &BTreeMap<u32, String>) -> String {
    let keys: Vec<String> = revisions.keys().map(|k| k.to_string()).collect();
    match keys.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
        None => String::new(),
    }
}

fn resolve_library(
    decl: &LibraryDecl,
    section: &ProjectSection,
    presets: &FlagPresets<'_>,
    project_file: &Path,
) -> ConfigResult<Library> {
    let owner = format!("library '{}'", decl.name);
    let mw_version = decl
        .mw_version
        .clone()
        .or_else(|| section.mw_version.clone())
        .ok_or_else(|| ConfigError::MissingField {
            field: format!("library.{}.mw_version", decl.name),
            file: project_file.to_path_buf(),
        })?;
    let cflags = presets.expand(&decl.cflags, &owner)?;

    let units = decl
        .units
        .iter()
        .map(|unit| resolve_unit(unit, presets, &owner))
        .collect::<ConfigResult<Vec<_>>>()?;

    let mut library = Library::new(&decl.name, mw_version, cflags, units)?;
    if let Some(ref src_dir) = decl.src_dir {
        library = library.with_source_root(src_dir);
    }
    if let Some(ref archive) = decl.archive {
        library = library.with_archive(archive);
    }
    Ok(library)
}

fn resolve_unit(decl: &UnitDecl, presets: &FlagPresets<'_>, owner: &str) -> ConfigResult<TranslationUnit> {
    let owner = format!("unit '{}' in {}", decl.name, owner);
    let defaults = UnitOptions::default();
    let options = UnitOptions {
        source: decl.source.clone(),
        mw_version: decl.mw_version.clone(),
        cflags: decl
            .cflags
            .as_ref()
            .map(|spec| presets.expand(spec, &owner))
            .transpose()?,
        extra_cflags: match decl.extra_cflags {
            Some(ref spec) => presets.expand(spec, &owner)?,
            None => defaults.extra_cflags,
        },
        shift_jis: decl.shift_jis.unwrap_or(defaults.shift_jis),
        add_to_all: decl.add_to_all.unwrap_or(defaults.add_to_all),
    };

    Ok(TranslationUnit::new(&decl.name, decl.complete)
        .with_signed_char(decl.signed_char)
        .with_options(options))
}

fn resolve_tools(file: &ProjectFile, overrides: &Overrides) -> ToolConfig {
    let tools = &file.tools;
    let spec = |path: Option<PathBuf>, tag: &Option<String>| ToolSpec {
        path,
        tag: tag.clone(),
    };

    ToolConfig {
        compilers: spec(
            overrides.compilers.clone().or_else(|| tools.compilers_path.clone()),
            &tools.compilers_tag,
        ),
        wrapper: spec(
            overrides.wrapper.clone().or_else(|| tools.wrapper_path.clone()),
            &tools.wibo_tag,
        ),
        dtk: spec(tools.dtk_path.clone(), &tools.dtk_tag),
        dtk_source: overrides.dtk_source.clone(),
        sjiswrap: spec(
            overrides.sjiswrap.clone().or_else(|| tools.sjiswrap_path.clone()),
            &tools.sjiswrap_tag,
        ),
    }
}

fn resolve_progress(file: &ProjectFile) -> ProgressOptions {
    let section = &file.progress;
    let defaults = ProgressOptions::default();
    ProgressOptions {
        all: section.all.unwrap_or(defaults.all),
        modules: section.modules.unwrap_or(defaults.modules),
        each_module: section.each_module.unwrap_or(defaults.each_module),
        code_fancy_frac: section.code_fancy_frac.unwrap_or(defaults.code_fancy_frac),
        code_fancy_item: section
            .code_fancy_item
            .clone()
            .unwrap_or(defaults.code_fancy_item),
        data_fancy_frac: section.data_fancy_frac.unwrap_or(defaults.data_fancy_frac),
        data_fancy_item: section
            .data_fancy_item
            .clone()
            .unwrap_or(defaults.data_fancy_item),
    }
}
