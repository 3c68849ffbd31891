use std::path::PathBuf;

use thiserror::Error;

/// Failures while mapping categorical strings to codes and back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("unknown category {value:?} for column '{column}'")]
    UnknownCategory { column: &'static str, value: String },

    #[error("unknown code {code} for column '{column}'")]
    UnknownCode { column: &'static str, code: u32 },

    #[error("no encoder for column '{0}'")]
    UnknownColumn(String),

    #[error("cannot fit encoder for column '{0}' from zero values")]
    EmptyColumn(&'static str),
}

/// Failures loading or saving persisted artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt artifact {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("artifact {path} does not match this build: {detail}")]
    SchemaMismatch { path: PathBuf, detail: String },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("cannot train on an empty dataset")]
    EmptyDataset,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
