use thiserror::Error;

/// Errors that can escape the crate boundary
///
/// In-simulation faults never land here: invalid construction, stale ids,
/// and incompatible weight blobs all degrade in place with a warning. Only
/// config parsing and the persistence surfaces can actually fail.
#[derive(Error, Debug)]
pub enum FaunaError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FaunaError>;
