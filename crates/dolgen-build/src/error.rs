/// Generator error types
use dolgen_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No {tool} available: set {field} or pass --{flag}")]
    MissingTool {
        tool: &'static str,
        field: &'static str,
        flag: &'static str,
    },

    #[error("Output path {path} is produced by both '{first}' and '{second}'")]
    PathCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Compiler {path} does not exist")]
    MissingCompiler { path: PathBuf },

    #[error("Generator state {path} was written by version {found}, expected {expected}")]
    StaleArtifact {
        path: PathBuf,
        found: String,
        expected: String,
    },

    #[error("Invalid execution results in {path}: {error}")]
    InvalidResults { path: PathBuf, error: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a path collision error
    pub fn collision(path: impl Into<PathBuf>, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self::PathCollision {
            path: path.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create an invalid execution results error
    pub fn invalid_results(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::InvalidResults {
            path: path.into(),
            error: error.to_string(),
        }
    }
}
