use thiserror::Error;

/// Top-level error type for the Palaver system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for PalaverError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PalaverError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for PalaverError {
    fn from(err: toml::de::Error) -> Self {
        PalaverError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PalaverError {
    fn from(err: toml::ser::Error) -> Self {
        PalaverError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PalaverError {
    fn from(err: serde_json::Error) -> Self {
        PalaverError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Palaver operations.
pub type Result<T> = std::result::Result<T, PalaverError>;
