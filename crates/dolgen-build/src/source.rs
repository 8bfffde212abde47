//! Source file discovery
//!
//! The synthesizer never touches the filesystem itself; it asks a
//! [`SourceIndex`] built up front whether a unit's source exists.

use dolgen_config::ProjectConfig;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Set of source files known to exist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIndex {
    files: HashSet<PathBuf>,
}

impl SourceIndex {
    /// Build an index from an explicit list of existing files
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Scan every library's source directory
    pub fn scan(config: &ProjectConfig) -> Self {
        let roots: BTreeSet<PathBuf> = config
            .libraries
            .iter()
            .map(|lib| config.source_root(lib).join(&lib.name))
            .collect();

        let mut files = HashSet::new();
        for root in &roots {
            // A missing directory just means no sources yet
            for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_file() {
                    files.insert(entry.into_path());
                }
            }
        }

        debug!(roots = roots.len(), files = files.len(), "scanned sources");
        Self { files }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
