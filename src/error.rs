use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Duplicate token in catalog: {0}")]
    DuplicateToken(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Update service is already running")]
    AlreadyStarted,

    #[error("Update service has been disposed")]
    Disposed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PulseResult<T> = Result<T, PulseError>;
