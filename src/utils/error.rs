// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 403 Forbidden

    #[error("Could not find document: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Malformed XML: {0}")]
    MalformedInput(String),

    #[error("Document is {size} bytes, above the limit of {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },

    #[error("Document contains no material sections or items")]
    NoMaterialContent,

    #[error("Unknown section name: {0}")]
    UnknownSection(String),

    #[error("Invalid section filter: {0}")]
    InvalidSectionFilter(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid product-line table: {0}")]
    Table(#[from] serde_json::Error),

    #[error("Invalid signature pattern '{pattern}' for line '{line}': {source}")]
    Signature {
        line: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Result has no fingerprint")]
    MissingFingerprint,

    #[error("Environment id must not be empty")]
    EmptyEnvironmentId,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Could not load document: {0}")]
    Source(#[from] SourceError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Output serialization failed: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Document rejected")]
    Rejected,
}
