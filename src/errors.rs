// ABOUTME: Error types for the deckgen application
// ABOUTME: Provides structured error handling for generation, storage and export

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    FetchError(#[from] reqwest::Error),

    #[error("Transport failure: {0}")]
    TransportError(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed generation output: {0}")]
    MalformedGenerationOutput(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedExportFormat(String),

    #[error("Insufficient credits for workspace {0}")]
    InsufficientCredits(String),

    #[error("PPTX generation error: {0}")]
    PptxError(String),

    #[error("XML read error: {0}")]
    XmlError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Input validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Deck not found: {0}")]
    DeckNotFound(String),

    #[error("Path not found: {0}")]
    PathNotFoundError(PathBuf),

    #[error("Generation cancelled: {0}")]
    Cancelled(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl DeckError {
    /// Whether the error should be shown to the end user verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DeckError::MalformedGenerationOutput(_)
                | DeckError::UnsupportedExportFormat(_)
                | DeckError::InsufficientCredits(_)
                | DeckError::DeckNotFound(_)
                | DeckError::ValidationError(_)
        )
    }
}

// Implement conversion from anyhow::Error to our DeckError
impl From<anyhow::Error> for DeckError {
    fn from(err: anyhow::Error) -> Self {
        DeckError::UnknownError(err.to_string())
    }
}

// Implement conversion from zip errors
impl From<zip::result::ZipError> for DeckError {
    fn from(err: zip::result::ZipError) -> Self {
        DeckError::PptxError(format!("ZIP operation failed: {}", err))
    }
}

impl From<quick_xml::Error> for DeckError {
    fn from(err: quick_xml::Error) -> Self {
        DeckError::XmlError(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DeckError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DeckError::XmlError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
