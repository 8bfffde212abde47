//! Execution results produced by the external toolchain
//!
//! `<out>/config.json` lists every unit of the main binary and of each module
//! with its code and data sizes. Fields this generator doesn't use are
//! ignored.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One unit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultUnit {
    pub name: String,
    /// Reference object of this unit, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<PathBuf>,
    #[serde(default)]
    pub code_size: u64,
    #[serde(default)]
    pub data_size: u64,
    /// No hand-written source exists for this unit
    #[serde(default)]
    pub autogenerated: bool,
}

impl ResultUnit {
    pub fn new(name: impl Into<String>, code_size: u64, data_size: u64) -> Self {
        Self {
            name: name.into(),
            object: None,
            code_size,
            data_size,
            autogenerated: false,
        }
    }

    pub fn autogenerated(mut self) -> Self {
        self.autogenerated = true;
        self
    }

    pub fn with_object(mut self, object: impl Into<PathBuf>) -> Self {
        self.object = Some(object.into());
        self
    }
}

/// A separately linked module and its units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultModule {
    pub name: String,
    #[serde(default)]
    pub units: Vec<ResultUnit>,
}

/// Parsed `config.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResults {
    /// Units of the main binary
    #[serde(default)]
    pub units: Vec<ResultUnit>,
    #[serde(default)]
    pub modules: Vec<ResultModule>,
}

impl ExecutionResults {
    /// Parse results; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> BuildResult<Self> {
        serde_json::from_str(content).map_err(|e| BuildError::invalid_results(path, e))
    }

    pub fn load(path: &Path) -> BuildResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Load results if the file exists
    pub fn load_optional(path: &Path) -> BuildResult<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BuildError::io(path, e)),
        }
    }

    /// Main binary units followed by every module's units
    pub fn all_units(&self) -> impl Iterator<Item = &ResultUnit> {
        self.units
            .iter()
            .chain(self.modules.iter().flat_map(|m| m.units.iter()))
    }
}
