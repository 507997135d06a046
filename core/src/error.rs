//! Error types for index construction.
//!
//! Only failures that leave the index unusable are errors. Per-record problems
//! (bad ids, malformed embedding lines, dimension mismatches) are counted in
//! [`crate::BuildReport`] instead.

use crate::index::DocId;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of [`crate::IndexBuilder::build`].
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The corpus is not valid JSON. `source` carries line and column.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON array at the top level of {path}")]
    NotAnArray { path: PathBuf },

    #[error("no indexable entries in {path}")]
    EmptyCorpus { path: PathBuf },

    #[error("forward index is empty, cannot build vector index")]
    EmptyForwardIndex,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("vector index error: {0}")]
    Vector(#[from] VectorError),
}

/// Errors raised by the ANN index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector for document {doc_id} has a non-finite component")]
    NonFiniteComponent { doc_id: DocId },

    #[error("invalid HNSW parameter {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}
