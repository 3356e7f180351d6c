//! Local text extraction, the fallback input strategy when the oracle
//! cannot take the file directly.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::models::MediaType;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No local text extraction for media type '{0}'")]
    UnsupportedMediaType(String),

    #[error("Extracted text is empty")]
    EmptyOutput,

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("Failed to read document file: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a stored document file into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path, media_type: &MediaType) -> Result<String, ExtractionError>;
}

/// Production extractor: PDF via pdf-extract, plain text via a file read.
/// Word documents have no local extraction path and must go through the
/// oracle's file strategy.
pub struct LocalTextExtractor;

impl TextExtractor for LocalTextExtractor {
    fn extract(&self, path: &Path, media_type: &MediaType) -> Result<String, ExtractionError> {
        let text = match media_type {
            MediaType::Pdf => {
                pdf_extract::extract_text(path).map_err(|e| ExtractionError::Pdf(e.to_string()))?
            }
            MediaType::PlainText => std::fs::read_to_string(path)?,
            MediaType::Docx => {
                return Err(ExtractionError::UnsupportedMediaType(
                    media_type.as_str().to_string(),
                ))
            }
            MediaType::Other(mime) => {
                return Err(ExtractionError::UnsupportedMediaType(mime.clone()))
            }
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyOutput);
        }

        debug!(
            path = %path.display(),
            chars = text.len(),
            "Extracted document text locally"
        );
        Ok(text)
    }
}

/// Test extractor returning canned text, or an error when text is None.
pub struct FixedTextExtractor {
    pub text: Option<String>,
}

impl TextExtractor for FixedTextExtractor {
    fn extract(&self, _path: &Path, media_type: &MediaType) -> Result<String, ExtractionError> {
        self.text.clone().ok_or_else(|| {
            ExtractionError::UnsupportedMediaType(media_type.as_str().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn plain_text_files_read_directly() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(b"Q1. Define osmosis.\n").unwrap();

        let text = LocalTextExtractor
            .extract(file.path(), &MediaType::PlainText)
            .unwrap();
        assert!(text.contains("osmosis"));
    }

    #[test]
    fn whitespace_only_output_is_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(b"  \n\t ").unwrap();

        let err = LocalTextExtractor.extract(file.path(), &MediaType::PlainText);
        assert!(matches!(err, Err(ExtractionError::EmptyOutput)));
    }

    #[test]
    fn docx_has_no_local_path() {
        let file = tempfile::NamedTempFile::with_suffix(".docx").unwrap();
        let err = LocalTextExtractor.extract(file.path(), &MediaType::Docx);
        assert!(matches!(err, Err(ExtractionError::UnsupportedMediaType(_))));
    }
}
