use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, validating or writing the index configuration file.
///
/// All of them are fatal and are reported before the database is contacted.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File {0} does not exist")]
    FileNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    ReadFailed { path: PathBuf, source: std::io::Error },

    #[error("Failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: std::io::Error },

    #[error("Invalid index configuration: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("A non-empty file exists at: {0}")]
    TargetNotEmpty(PathBuf),

    #[error("Collection name must not be empty")]
    EmptyCollectionName,

    #[error("Collection {collection} is declared more than once")]
    DuplicateCollection { collection: String },

    #[error("Index #{position} of collection {collection} declares no fields")]
    EmptyIndex { collection: String, position: usize },

    #[error("Index {name} is declared more than once for collection {collection}")]
    DuplicateIndex { collection: String, name: String },

    #[error("Collection {collection} declares the {field} primary key index, which is managed by MongoDB")]
    SystemIndex { collection: String, field: String },
}
