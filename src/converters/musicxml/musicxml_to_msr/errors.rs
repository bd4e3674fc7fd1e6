//! Error types for the MusicXML to MSR skeleton pass
//!
//! Fatal conditions abort the pass for the whole document and surface as
//! [`ConversionError`]. Recoverable ones never appear here: they are collected
//! as warnings by the [`WaeHandler`](super::wae::WaeHandler).

use thiserror::Error;

/// Top-level conversion error type
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    /// Fatal XML parsing error
    #[error("XML parsing failed: {0}")]
    ParseError(#[from] ParseError),

    /// MusicXML structure the skeleton builder cannot interpret
    #[error("{source_name}:{line}: {message}")]
    MusicXml {
        source_name: String,
        line: u32,
        message: String,
    },

    /// Failure reading the input file
    #[error("Cannot read '{path}': {message}")]
    Io { path: String, message: String },

    /// Internal conversion error (should be rare, indicates a bug)
    #[error("Internal conversion error: {0}")]
    InternalError(String),
}

impl ConversionError {
    /// Input line the error refers to, when known
    pub fn line(&self) -> Option<u32> {
        match self {
            ConversionError::MusicXml { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Fatal XML parsing errors
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// XML is malformed (not well-formed)
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// MusicXML format not supported (e.g., timewise instead of partwise)
    #[error("Unsupported MusicXML format: {0}")]
    UnsupportedFormat(String),

    /// Required structural element is missing
    #[error("Missing required element: {0}")]
    MissingRequiredElement(String),
}
