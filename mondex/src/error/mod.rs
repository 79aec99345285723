use thiserror::Error;

pub use crate::config::ConfigError;
use crate::core::client::database::DatabaseError;

/// Result type for mondex operations
pub type MondexResult<T> = Result<T, MondexError>;

/// Errors that stop a command before it completes.
///
/// Failures of individual index operations during `apply` are not errors at this
/// level: they are collected in an [`ApplyReport`](crate::service::ApplyReport).
#[derive(Error, Debug)]
pub enum MondexError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    /// Command line arguments that parsed but make no sense
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
