//! Error types for the invox-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the invox library.
#[derive(Error, Debug)]
pub enum InvoxError {
    /// Image preprocessing error.
    #[error("preprocessing error: {0}")]
    Preprocess(#[from] PreprocessError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input image was missing or unreadable.
    SourceNotFound,
    /// The image codec could not decode the input.
    UnsupportedFormat,
    /// The OCR engine failed internally.
    RecognitionFailed,
    /// Anything else (I/O, configuration, engine setup).
    Other,
}

impl InvoxError {
    /// Classify this error for callers that only care about the failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Preprocess(PreprocessError::SourceNotFound(_)) => ErrorKind::SourceNotFound,
            Self::Preprocess(PreprocessError::UnsupportedFormat { .. }) => {
                ErrorKind::UnsupportedFormat
            }
            Self::Ocr(OcrError::RecognitionFailed(_)) => ErrorKind::RecognitionFailed,
            _ => ErrorKind::Other,
        }
    }
}

/// Errors related to image preprocessing.
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// The source image does not exist or cannot be opened.
    #[error("source image not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The image codec could not decode the source.
    #[error("unsupported image format for {}: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    /// The derived image could not be written.
    #[error("failed to write derived image {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The engine reported an internal failure.
    #[error("text recognition failed: {0}")]
    RecognitionFailed(String),

    /// The engine could not be started.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),
}

/// Result type for the invox library.
pub type Result<T> = std::result::Result<T, InvoxError>;
