//! Loading document text handed over by OCR or a PDF text layer.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::SourceError;
use crate::models::config::SourceConfig;

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Kind of input a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Plain UTF-8 text, e.g. OCR output.
    Text,
    /// PDF with an embedded text layer.
    Pdf,
}

impl SourceKind {
    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "txt" | "text" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            other => Err(SourceError::Unsupported(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

/// Whether `path` is a document this crate can read.
pub fn is_supported(path: &Path) -> bool {
    SourceKind::from_path(path).is_ok()
}

/// Read the raw text of a document.
pub fn load_text(path: &Path, config: &SourceConfig) -> Result<String> {
    let text = match SourceKind::from_path(path)? {
        SourceKind::Text => fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?,
        SourceKind::Pdf => load_pdf_text(path)?,
    };

    let len = text.chars().filter(|c| !c.is_whitespace()).count();
    if len < config.min_text_length {
        return Err(SourceError::TooShort {
            len,
            min: config.min_text_length,
        });
    }

    debug!("Loaded {} characters from {}", text.len(), path.display());
    Ok(text)
}

#[cfg(feature = "pdf")]
fn load_pdf_text(path: &Path) -> Result<String> {
    let data = fs::read(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    pdf_extract::extract_text_from_mem(&data).map_err(|e| SourceError::Pdf(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn load_pdf_text(_path: &Path) -> Result<String> {
    Err(SourceError::Unsupported("pdf (built without the `pdf` feature)".to_string()))
}
