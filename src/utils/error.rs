use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Lookup request failed: {0}")]
    LookupError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Caller contract violation: {message}")]
    ContractViolation { message: String },

    #[error("Session is busy ({state}): {message}")]
    SessionBusy { state: String, message: String },
}

pub type Result<T> = std::result::Result<T, MergeError>;
