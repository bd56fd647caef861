//! Fatal errors for loading reference data and writing artifacts
//!
//! Malformed individual records never surface here; they are skipped
//! where they are read (see `shape::Skip` and `extract::Rejection`).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubsetError {
    #[error("reference source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("exactly one of a reference directory or a reference archive must be given")]
    ConflictingSource,

    #[error("required artifact {name} not found in {}", source_path.display())]
    MissingArtifact {
        name: &'static str,
        source_path: PathBuf,
    },

    #[error("JSON error in {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {0} must be a JSON object at the top level")]
    NotAnObject(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SubsetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SubsetError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubsetError>;
