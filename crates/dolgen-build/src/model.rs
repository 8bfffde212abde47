//! Project model
//!
//! [`Project::expand`] takes the cross product of libraries, profiles and
//! units and produces fully resolved [`Object`]s, one [`Archive`] per
//! `(library, profile)` and one [`Diff`] per object. Expansion does no I/O and
//! is recomputed from the configuration on every run.

use crate::error::{BuildError, BuildResult};
use crate::flags::{resolve_flags, reverse_fn_order};
use crate::layout::{diff_name, Layout, ObjectPaths, PathFamily};
use dolgen_config::{CompilerProfile, ConfigError, Library, ProjectConfig, TranslationUnit};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A fully resolved compilation target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub profile: String,
    pub library: String,
    pub unit: String,
    pub complete: bool,
    pub paths: ObjectPaths,
    /// Compiler identity, e.g. "GC/1.2.5"
    pub mw_version: String,
    pub flags: Vec<String>,
    /// Compile through the charset-transcoding wrapper
    pub shift_jis: bool,
    /// Part of the `all_source` target
    pub add_to_all: bool,
}

impl Object {
    /// Human-readable owner, used in collision errors
    pub fn label(&self) -> String {
        format!("{}/{}/{}", self.profile, self.library, self.unit)
    }
}

/// One reference archive per `(library, profile)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub profile: String,
    pub library: String,
    /// Reference archive, e.g. `orig/<version>/osD.a`
    pub source: PathBuf,
    /// Extraction directory
    pub destination: PathBuf,
    /// Extracted objects, relative to `destination`
    pub manifest: BTreeSet<PathBuf>,
}

impl Archive {
    /// Manifest entries joined onto the destination directory
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.manifest
            .iter()
            .map(|entry| self.destination.join(entry))
            .collect()
    }
}

/// A comparison between a compiled object and its reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// `<profile>/<library>/<unit stem>`
    pub name: String,
    /// Reference object
    pub target_path: PathBuf,
    /// Compiled object
    pub base_path: PathBuf,
    /// Source the compiled object is built from
    pub source_path: PathBuf,
    pub reverse_fn_order: bool,
    pub complete: bool,
}

/// Expanded project: every object, archive and diff of one configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    layout: Layout,
    objects: Vec<Object>,
    archives: Vec<Archive>,
    diffs: Vec<Diff>,
}

impl Project {
    /// Expand the configuration into objects, archives and diffs
    ///
    /// Fails when the configuration has no profiles or libraries, or when two
    /// objects would write the same reference or compiled path.
    #[tracing::instrument(level = "debug", skip_all, fields(version = %config.version))]
    pub fn expand(config: &ProjectConfig) -> BuildResult<Self> {
        validate(config)?;

        let layout = Layout::new(config.out_path());
        let mut objects = Vec::new();
        let mut archives = Vec::new();
        let mut diffs = Vec::new();

        for library in &config.libraries {
            let src_root = config.source_root(library);
            for profile in &config.profiles {
                let start = objects.len();
                for unit in library.units() {
                    let object = make_object(config, &layout, src_root, profile, library, unit);
                    diffs.push(make_diff(profile, library, unit, &object));
                    objects.push(object);
                }
                archives.push(make_archive(config, &layout, profile, library, &objects[start..]));
            }
        }

        check_unique_paths(&objects)?;

        debug!(
            objects = objects.len(),
            archives = archives.len(),
            "expanded project"
        );

        Ok(Self {
            layout,
            objects,
            archives,
            diffs,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Objects in library → profile → unit order
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn archives(&self) -> &[Archive] {
        &self.archives
    }

    pub fn diffs(&self) -> &[Diff] {
        &self.diffs
    }

    /// Objects extracted from one archive, in unit order
    pub fn archive_objects<'a>(&'a self, archive: &'a Archive) -> impl Iterator<Item = &'a Object> + 'a {
        self.objects
            .iter()
            .filter(move |o| o.library == archive.library && o.profile == archive.profile)
    }
}

fn validate(config: &ProjectConfig) -> BuildResult<()> {
    let missing = |field: &str| ConfigError::MissingField {
        field: field.to_string(),
        file: config.project_file.clone(),
    };
    if config.profiles.is_empty() {
        return Err(missing("profile").into());
    }
    if config.libraries.is_empty() {
        return Err(missing("library").into());
    }
    Ok(())
}

fn make_object(
    config: &ProjectConfig,
    layout: &Layout,
    src_root: &Path,
    profile: &CompilerProfile,
    library: &Library,
    unit: &TranslationUnit,
) -> Object {
    Object {
        profile: profile.name.clone(),
        library: library.name.clone(),
        unit: unit.name.clone(),
        complete: unit.complete,
        paths: layout.object_paths(src_root, profile, library, unit),
        mw_version: unit
            .options
            .mw_version
            .clone()
            .unwrap_or_else(|| library.mw_version.clone()),
        flags: resolve_flags(library, unit, profile, config.debug),
        shift_jis: unit.options.shift_jis,
        add_to_all: unit.options.add_to_all,
    }
}

fn make_diff(profile: &CompilerProfile, library: &Library, unit: &TranslationUnit, object: &Object) -> Diff {
    Diff {
        name: diff_name(profile, library, unit),
        target_path: object.paths.reference.clone(),
        base_path: object.paths.compiled.clone(),
        source_path: object.paths.source.clone(),
        reverse_fn_order: reverse_fn_order(&object.flags),
        complete: unit.complete,
    }
}

fn make_archive(
    config: &ProjectConfig,
    layout: &Layout,
    profile: &CompilerProfile,
    library: &Library,
    objects: &[Object],
) -> Archive {
    let destination = layout.family_dir(profile, library, PathFamily::Reference);
    let manifest = objects
        .iter()
        .filter_map(|o| o.paths.reference.strip_prefix(&destination).ok())
        .map(Path::to_path_buf)
        .collect();

    Archive {
        profile: profile.name.clone(),
        library: library.name.clone(),
        source: config.archive_dir.join(library.archive_file_name(profile)),
        destination,
        manifest,
    }
}

fn check_unique_paths(objects: &[Object]) -> BuildResult<()> {
    let mut owners: HashMap<&Path, &Object> = HashMap::with_capacity(objects.len() * 2);
    for object in objects {
        for path in [&object.paths.reference, &object.paths.compiled] {
            if let Some(first) = owners.insert(path.as_path(), object) {
                return Err(BuildError::collision(path, first.label(), object.label()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scenario_config;

    #[test]
    fn test_scenario_counts() {
        let project = Project::expand(&scenario_config()).unwrap();
        assert_eq!(project.objects().len(), 4);
        assert_eq!(project.archives().len(), 2);
        assert_eq!(project.diffs().len(), 4);
        for archive in project.archives() {
            assert_eq!(archive.manifest.len(), 2);
        }
    }

    #[test]
    fn test_scenario_char_flags() {
        let project = Project::expand(&scenario_config()).unwrap();
        for object in project.objects() {
            let expected = if object.unit == "OSReboot.c" {
                "-char signed"
            } else {
                "-char unsigned"
            };
            assert!(object.flags.iter().any(|f| f == expected), "{:?}", object);
        }
    }

    #[test]
    fn test_archive_source_uses_profile_suffix() {
        let project = Project::expand(&scenario_config()).unwrap();
        let sources: Vec<_> = project.archives().iter().map(|a| a.source.clone()).collect();
        assert_eq!(
            sources,
            vec![
                PathBuf::from("orig/DOLSDK-2001-05-22/os.a"),
                PathBuf::from("orig/DOLSDK-2001-05-22/osD.a"),
            ]
        );
    }

    #[test]
    fn test_manifest_matches_reference_paths() {
        let project = Project::expand(&scenario_config()).unwrap();
        for archive in project.archives() {
            let expected: BTreeSet<PathBuf> = project
                .archive_objects(archive)
                .map(|o| o.paths.reference.clone())
                .collect();
            let outputs: BTreeSet<PathBuf> = archive.outputs().into_iter().collect();
            assert_eq!(outputs, expected);
        }
    }

    #[test]
    fn test_diff_targets() {
        let project = Project::expand(&scenario_config()).unwrap();
        let diff = &project.diffs()[0];
        assert_eq!(diff.name, "release/os/OSAlloc");
        assert_eq!(
            diff.target_path,
            PathBuf::from("build/DOLSDK-2001-05-22/release/os/obj/OSAlloc.o")
        );
        assert_eq!(
            diff.base_path,
            PathBuf::from("build/DOLSDK-2001-05-22/release/os/src/OSAlloc.o")
        );
        assert!(diff.complete);
        assert!(!project.diffs()[1].complete);
    }

    #[test]
    fn test_stem_collision_is_rejected() {
        let mut config = scenario_config();
        let units = vec![
            TranslationUnit::new("OSAlloc.c", true),
            TranslationUnit::new("OSAlloc.cpp", false),
        ];
        config.libraries = vec![Library::new("os", "GC/1.2.5", Vec::new(), units).unwrap()];

        match Project::expand(&config) {
            Err(BuildError::PathCollision { path, first, second }) => {
                assert!(path.ends_with("obj/OSAlloc.o"));
                assert_eq!(first, "release/os/OSAlloc.c");
                assert_eq!(second, "release/os/OSAlloc.cpp");
            }
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_same_name_in_two_directories_collides() {
        let mut config = scenario_config();
        let units = vec![
            TranslationUnit::new("gx/init.c", true),
            TranslationUnit::new("vi/init.c", false),
        ];
        config.libraries = vec![Library::new("os", "GC/1.2.5", Vec::new(), units).unwrap()];

        match Project::expand(&config) {
            Err(BuildError::PathCollision { path, .. }) => {
                assert!(path.ends_with("release/os/obj/init.o"), "{}", path.display())
            }
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_unit_manifest_is_flat() {
        let mut config = scenario_config();
        let units = vec![TranslationUnit::new("db/db.c", true)];
        config.libraries = vec![Library::new("db", "GC/1.2.5", Vec::new(), units).unwrap()];

        let project = Project::expand(&config).unwrap();
        let archive = &project.archives()[0];
        assert_eq!(
            archive.manifest,
            BTreeSet::from([PathBuf::from("db.o")])
        );
        assert_eq!(
            project.objects()[0].paths.compiled,
            PathBuf::from("build/DOLSDK-2001-05-22/release/db/src/db/db.o")
        );
    }

    #[test]
    fn test_no_profiles_is_a_config_error() {
        let mut config = scenario_config();
        config.profiles.clear();
        match Project::expand(&config) {
            Err(BuildError::Config(ConfigError::MissingField { field, .. })) => {
                assert_eq!(field, "profile")
            }
            other => panic!("expected missing profile, got {:?}", other),
        }
    }
}
