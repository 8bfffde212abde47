//! Generator state tracking
//!
//! After writing its outputs the generator records which version produced
//! them and a content fingerprint in `<build_dir>/dolgen-state.json`. A file
//! written by an incompatible version is reported as stale.

use crate::error::{BuildError, BuildResult};
use crate::objdiff::to_pretty_json;
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Name of the state file inside the build directory
pub const STATE_FILE: &str = "dolgen-state.json";

/// Version of this generator
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hex-encoded SHA-256 over the given documents, in order
pub fn fingerprint<'a>(documents: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for document in documents {
        hasher.update((document.len() as u64).to_le_bytes());
        hasher.update(document.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Whether state written by `found` can be trusted by `current`
///
/// Major versions must match; before 1.0 the minor version must match too.
pub fn is_compatible(found: &str, current: &Version) -> bool {
    let Ok(found) = Version::parse(found) else {
        return false;
    };
    if found.major != current.major {
        return false;
    }
    current.major != 0 || found.minor == current.minor
}

/// Contents of the state file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorState {
    pub generator_version: String,
    pub fingerprint: String,
    /// Files written by the last run
    pub outputs: Vec<PathBuf>,
}

impl GeneratorState {
    /// State for outputs written by this generator
    pub fn new(fingerprint: String, outputs: Vec<PathBuf>) -> Self {
        Self {
            generator_version: GENERATOR_VERSION.to_string(),
            fingerprint,
            outputs,
        }
    }

    /// Location of the state file for a build directory
    pub fn path(build_dir: &Path) -> PathBuf {
        build_dir.join(STATE_FILE)
    }

    /// Load a state file
    ///
    /// Returns `Ok(None)` when the file doesn't exist and
    /// [`BuildError::StaleArtifact`] when it can't be trusted.
    pub fn load(path: &Path) -> BuildResult<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BuildError::io(path, e)),
        };

        let stale = |found: String| BuildError::StaleArtifact {
            path: path.to_path_buf(),
            found,
            expected: GENERATOR_VERSION.to_string(),
        };

        let state: Self = serde_json::from_str(&content).map_err(|_| stale("unknown".to_string()))?;
        let current = Version::parse(GENERATOR_VERSION).map_err(|_| stale(state.generator_version.clone()))?;
        if !is_compatible(&state.generator_version, &current) {
            return Err(stale(state.generator_version));
        }
        Ok(Some(state))
    }

    pub fn to_json(&self) -> BuildResult<String> {
        to_pretty_json(self)
    }
}

/// What was found at the state file location
#[derive(Debug)]
pub enum StateStatus {
    /// No previous run
    Absent,
    /// Written by an incompatible generator
    Stale(BuildError),
    Current(GeneratorState),
}

impl StateStatus {
    /// Inspect the state file without failing on staleness
    pub fn inspect(path: &Path) -> BuildResult<Self> {
        match GeneratorState::load(path) {
            Ok(Some(state)) => Ok(Self::Current(state)),
            Ok(None) => Ok(Self::Absent),
            Err(e @ BuildError::StaleArtifact { .. }) => Ok(Self::Stale(e)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("0.3.0", "0.3.0", true)]
    #[case("0.3.7", "0.3.0", true)]
    #[case("0.2.9", "0.3.0", false)]
    #[case("1.4.0", "1.0.2", true)]
    #[case("2.0.0", "1.0.2", false)]
    #[case("garbage", "1.0.2", false)]
    fn test_compatibility(#[case] found: &str, #[case] current: &str, #[case] expected: bool) {
        let current = Version::parse(current).unwrap();
        assert_eq!(is_compatible(found, &current), expected);
    }

    #[test]
    fn test_fingerprint_is_stable_and_order_sensitive() {
        let a = fingerprint(["build", "diff"]);
        assert_eq!(a, fingerprint(["build", "diff"]));
        assert_ne!(a, fingerprint(["diff", "build"]));
        assert_ne!(fingerprint(["ab", "c"]), fingerprint(["a", "bc"]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = GeneratorState::path(dir.path());
        let state = GeneratorState::new(fingerprint(["x"]), vec![PathBuf::from("build.ninja")]);
        fs::write(&path, state.to_json().unwrap()).unwrap();

        assert_eq!(GeneratorState::load(&path).unwrap(), Some(state));
    }

    #[test]
    fn test_absent_state() {
        let dir = TempDir::new().unwrap();
        let status = StateStatus::inspect(&GeneratorState::path(dir.path())).unwrap();
        assert!(matches!(status, StateStatus::Absent));
    }

    #[test]
    fn test_incompatible_state_is_stale() {
        let dir = TempDir::new().unwrap();
        let path = GeneratorState::path(dir.path());
        fs::write(
            &path,
            r#"{"generator_version": "99.0.0", "fingerprint": "00", "outputs": []}"#,
        )
        .unwrap();

        let err = GeneratorState::load(&path).unwrap_err();
        assert!(matches!(err, BuildError::StaleArtifact { ref found, .. } if found == "99.0.0"));
        assert!(matches!(StateStatus::inspect(&path).unwrap(), StateStatus::Stale(_)));
    }

    #[test]
    fn test_unreadable_state_is_stale() {
        let dir = TempDir::new().unwrap();
        let path = GeneratorState::path(dir.path());
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            GeneratorState::load(&path),
            Err(BuildError::StaleArtifact { .. })
        ));
    }
}
