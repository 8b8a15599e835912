//! Error types for the layoutcache-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the layoutcache library.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Template store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Template extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Document text could not be loaded.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Observed fields were not usable for learning.
    #[error("invalid observed fields: {0}")]
    InvalidFields(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the persisted template store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the store file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON for the expected layout.
    #[error("malformed store file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A template for this layout signature already exists.
    #[error("template already exists for layout {0}")]
    DuplicateSignature(String),

    /// No template is registered under this layout signature.
    #[error("no template for layout {0}")]
    UnknownSignature(String),
}

/// Errors related to template-based field extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Required fields were not produced by the template's rules.
    #[error("template {template_id} missing required fields: {}", .fields.join(", "))]
    MissingFields {
        template_id: String,
        fields: Vec<String>,
    },

    /// The template is not (or no longer) in the store.
    #[error("template {0} is not registered")]
    UnknownTemplate(String),
}

/// Errors related to loading document text.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to read the input file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to extract the text layer from a PDF.
    #[error("failed to extract PDF text: {0}")]
    Pdf(String),

    /// The input file type is not supported.
    #[error("unsupported input format: {0}")]
    Unsupported(String),

    /// The document yielded too little text to fingerprint.
    #[error("document text too short ({len} < {min} characters)")]
    TooShort { len: usize, min: usize },
}

/// Result type for the layoutcache library.
pub type Result<T> = std::result::Result<T, CacheError>;
