//! dolgen configuration system
//!
//! Provides the project declaration for a decompilation build:
//! - Project declaration file (`dolgen.toml`)
//! - Library declaration files discovered under `project.library_dirs`
//! - Named compiler flag presets and revision substitution
//! - Command-line overrides and validation into an immutable [`ProjectConfig`]
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Project declaration (`./dolgen.toml`)
//! 2. Library declaration files (`<library_dirs>/**/*.toml`)
//! 3. Command-line flags ([`Overrides`])
//!
//! # Example
//!
//! ```no_run
//! use dolgen_config::{ConfigLoader, Overrides};
//! use std::path::Path;
//!
//! let config = ConfigLoader::new()
//!     .load(Path::new("dolgen.toml"), &Overrides::default())
//!     .unwrap();
//! println!("{} libraries", config.libraries.len());
//! ```

pub mod config;
pub mod flags;
pub mod library;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("ProjectConfig.{field} missing (in {file})")]
    MissingField { field: String, file: PathBuf },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid revision '{revision}', expected {expected}")]
    InvalidRevision { revision: u32, expected: String },

    #[error("Library '{0}' is declared more than once")]
    DuplicateLibrary(String),

    #[error("Unit '{unit}' is declared more than once in library '{library}'")]
    DuplicateUnit { library: String, unit: String },

    #[error("Profile '{0}' is declared more than once")]
    DuplicateProfile(String),

    #[error("Unknown flag preset '{name}' referenced by {referenced_by}")]
    UnknownPreset { name: String, referenced_by: String },

    #[error("Flag preset cycle: {0}")]
    PresetCycle(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use config::{Overrides, ProgressOptions, ProjectConfig, ToolConfig, ToolSpec};
pub use flags::FlagPresets;
pub use library::{CompilerProfile, Library, TranslationUnit, UnitOptions};
pub use loader::ConfigLoader;
pub use project::{FlagSpec, LibraryDecl, LibraryFile, ProfileDecl, ProjectFile, UnitDecl};
