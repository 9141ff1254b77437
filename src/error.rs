use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by profile parsing, installation and environment execution.
#[derive(Debug, Error)]
pub enum RaidError {
    /// Malformed YAML/JSON, or a profile without a usable `name`.
    #[error("{0}")]
    Parse(String),

    #[error("unsupported file format '{extension}'. Supported formats are .yaml, .yml, and .json")]
    Format { extension: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ExternalTool(String),

    #[error("path {path:?} exists but is not a git repository")]
    PathConflict { path: PathBuf },

    #[error("unknown task type '{kind}'")]
    TaskKind { kind: String },

    #[error("task {index} of environment '{environment}' failed: {reason}")]
    Task {
        environment: String,
        index: usize,
        reason: String,
    },

    #[error("{context} {path:?}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start worker runtime: {0}")]
    Runtime(std::io::Error),

    #[error("{0}")]
    Aggregate(AggregateError),
}

impl RaidError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RaidError::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

/// A single repository that could not be installed.
#[derive(Debug)]
pub struct RepositoryFailure {
    pub name: String,
    pub error: RaidError,
}

/// Every repository failure from one install run.
#[derive(Debug)]
pub struct AggregateError {
    pub failures: Vec<RepositoryFailure>,
}

impl AggregateError {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|failure| failure.name.as_str())
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.failures.len() == 1 {
            "repository"
        } else {
            "repositories"
        };
        write!(f, "{} {noun} failed to install:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.name, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

pub type Result<T, E = RaidError> = std::result::Result<T, E>;
