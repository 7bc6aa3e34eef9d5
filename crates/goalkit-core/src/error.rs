use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoalkitError {
    #[error("project root not found: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("milestone history at {} is corrupted: {reason}", path.display())]
    CorruptHistory { path: PathBuf, reason: String },

    #[error("invalid config at {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error(
        "invalid window: {0} days (must be between 1 and {max})",
        max = crate::tracker::MAX_WINDOW_DAYS
    )]
    InvalidWindow(i64),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "timed out waiting for history lock at {}; if no other goalkit process is running, delete this file and retry",
        .0.display()
    )]
    LockTimeout(PathBuf),

    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GoalkitError {
    /// The filesystem path this error is about, when it has one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            GoalkitError::ProjectNotFound(p) | GoalkitError::LockTimeout(p) => Some(p),
            GoalkitError::CorruptHistory { path, .. }
            | GoalkitError::InvalidConfig { path, .. }
            | GoalkitError::FileAccess { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Attach `path` to an I/O failure.
pub(crate) fn file_access(
    path: &std::path::Path,
) -> impl FnOnce(std::io::Error) -> GoalkitError + '_ {
    move |source| GoalkitError::FileAccess {
        path: path.to_path_buf(),
        source,
    }
}

pub type Result<T> = std::result::Result<T, GoalkitError>;
