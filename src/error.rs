use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AvhrrError {
    #[error("catalogue fetch failed: {0}")]
    FetchFailed(String),

    #[error("catalogue server returned status {status}: {message}")]
    FetchStatus { status: u16, message: String },

    #[error("product not found or without the expected file structure: {0}")]
    ProductNotLocated(String),

    #[error("product {0} not found in the catalogue")]
    CatalogueRowNotFound(String),

    #[error("embedded metadata unavailable for {product}: {reason}")]
    EmbeddedMetadataUnavailable { product: String, reason: String },

    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("malformed footprint: {0}")]
    MalformedFootprint(String),

    #[error("invalid processing level pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("csv error: {0}")]
    Csv(String),
}
