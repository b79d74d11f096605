//! OCR bridge error type definitions

use std::path::PathBuf;

use thiserror::Error;

/// OCR bridge error type
#[derive(Error, Debug)]
pub enum OcrError {
    /// No candidate location contained the native library
    #[error("Native library {name} not found, searched: {searched:?}")]
    LibraryNotFound {
        name: String,
        searched: Vec<PathBuf>,
    },

    /// The library file exists but the dynamic loader rejected it
    #[error("Failed to load native library {}: {reason}", path.display())]
    LibraryLoad { path: PathBuf, reason: String },

    /// The library was opened but an entry point is missing
    #[error("Native entry point {symbol} could not be resolved: {reason}")]
    MissingSymbol { symbol: &'static str, reason: String },

    /// Native initialization returned a null engine
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    /// A native detect call reported failure
    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    /// The native result had an unexpected shape
    #[error("Malformed native result: {0}")]
    ResultDecode(String),

    /// The engine was used after it had been released
    #[error("OCR engine used after teardown")]
    UseAfterTeardown,

    /// Invalid parameter error
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),
}

impl OcrError {
    /// Whether the error invalidates the engine (or prevents it from existing).
    ///
    /// Detection and decode failures are scoped to a single call; the engine
    /// stays usable afterwards.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OcrError::LibraryNotFound { .. }
                | OcrError::LibraryLoad { .. }
                | OcrError::MissingSymbol { .. }
                | OcrError::EngineInit(_)
                | OcrError::UseAfterTeardown
        )
    }
}

/// OCR result type alias
pub type OcrResult<T> = std::result::Result<T, OcrError>;
