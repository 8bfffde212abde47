//! dolgen build file generation
//!
//! Turns a validated [`dolgen_config::ProjectConfig`] into everything the
//! external build executes:
//! - Project model expansion (libraries x profiles x units)
//! - Output path layout and flag resolution
//! - External tool resolution for the host platform
//! - Build step synthesis and the ninja build file
//! - Diff metadata for objdiff
//! - Progress aggregation over execution results
//! - Generator state tracking and atomic output writes

pub mod error;
pub mod flags;
pub mod generator;
pub mod layout;
pub mod model;
pub mod ninja;
pub mod objdiff;
pub mod output;
pub mod progress;
pub mod results;
pub mod source;
pub mod state;
pub mod steps;
pub mod tools;

// Re-export main types
pub use error::{BuildError, BuildResult};
pub use flags::{flag_key, resolve_flags, reverse_fn_order};
pub use generator::{CheckSummary, Freshness, Generator, Rendered};
pub use layout::{diff_name, source_path, Layout, ObjectPaths, PathFamily};
pub use model::{Archive, Diff, Object, Project};
pub use ninja::{render, Invocation, Writer};
pub use objdiff::{DiffConfig, DiffUnit};
pub use output::write_atomic;
pub use progress::{Category, ProgressReport, ProgressUnit};
pub use results::{ExecutionResults, ResultModule, ResultUnit};
pub use source::SourceIndex;
pub use state::{GeneratorState, StateStatus, GENERATOR_VERSION, STATE_FILE};
pub use steps::{synthesize, BuildPlan, BuildStep, CompileStep, OutputPaths, ALL_SOURCE};
pub use tools::{HostOs, HostPlatform, ResolvedTool, ToolKind, ToolPaths, ToolSource};

// Re-export config types for convenience
pub use dolgen_config::{ConfigError, ConfigLoader, Overrides, ProjectConfig};
