//! Diff metadata for objdiff
//!
//! One unit entry per [`Diff`]. Units whose source doesn't exist yet only
//! carry their reference object. Units that appear in the execution results
//! without a declaration are listed the same way.

use crate::error::BuildResult;
use crate::layout::to_posix;
use crate::model::{Diff, Project};
use crate::results::ExecutionResults;
use crate::source::SourceIndex;
use dolgen_config::ProjectConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Oldest objdiff release that understands this file
pub const MIN_VERSION: &str = "0.4.3";

/// Files whose change makes objdiff rebuild
pub const WATCH_PATTERNS: &[&str] = &[
    "*.c", "*.cp", "*.cpp", "*.h", "*.hpp", "*.inc", "*.py", "*.yml", "*.txt", "*.json",
];

/// One comparison entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffUnit {
    pub name: String,
    pub target_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_fn_order: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
}

impl DiffUnit {
    fn buildable(diff: &Diff) -> Self {
        Self {
            name: diff.name.clone(),
            target_path: to_posix(&diff.target_path),
            base_path: Some(to_posix(&diff.base_path)),
            reverse_fn_order: Some(diff.reverse_fn_order),
            complete: Some(diff.complete),
        }
    }

    fn target_only(name: impl Into<String>, target_path: String) -> Self {
        Self {
            name: name.into(),
            target_path,
            base_path: None,
            reverse_fn_order: None,
            complete: None,
        }
    }
}

/// The diff metadata file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffConfig {
    pub min_version: String,
    pub custom_make: String,
    pub build_target: bool,
    pub watch_patterns: Vec<String>,
    pub units: Vec<DiffUnit>,
}

impl DiffConfig {
    /// Collect diff entries for every declared object and undeclared result
    pub fn build(
        config: &ProjectConfig,
        project: &Project,
        sources: &SourceIndex,
        results: Option<&ExecutionResults>,
    ) -> Self {
        let mut units: Vec<DiffUnit> = project
            .diffs()
            .iter()
            .map(|diff| {
                if sources.contains(&diff.source_path) {
                    DiffUnit::buildable(diff)
                } else {
                    DiffUnit::target_only(&diff.name, to_posix(&diff.target_path))
                }
            })
            .collect();

        if let Some(results) = results {
            let mut seen: HashSet<String> = units.iter().map(|u| u.name.clone()).collect();
            for unit in results.all_units() {
                if config.find_unit(&unit.name).is_some() {
                    continue;
                }
                let Some(ref object) = unit.object else {
                    continue;
                };
                if seen.insert(unit.name.clone()) {
                    units.push(DiffUnit::target_only(&unit.name, to_posix(object)));
                }
            }
        }

        Self {
            min_version: MIN_VERSION.to_string(),
            custom_make: "ninja".to_string(),
            build_target: false,
            watch_patterns: WATCH_PATTERNS.iter().map(|p| p.to_string()).collect(),
            units,
        }
    }

    /// Serialize with four-space indentation
    pub fn to_json(&self) -> BuildResult<String> {
        to_pretty_json(self)
    }
}

/// Serialize a value as four-space indented JSON with a trailing newline
pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> BuildResult<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
