//! Error types for the PDF seal library

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF seal library
#[derive(Error, Debug)]
pub enum Error {
    /// Seal image missing or not decodable
    #[error("Seal image not found or unreadable: {}: {reason}", .path.display())]
    AssetNotFound { path: PathBuf, reason: String },

    /// Page or canvas dimensions that cannot be rendered
    #[error("Unsupported page geometry: {width} x {height}")]
    UnsupportedGeometry { width: f32, height: f32 },

    /// Source document cannot be parsed
    #[error("Unreadable PDF {}: {reason}", .path.display())]
    UnreadableDocument { path: PathBuf, reason: String },

    /// Temporary write or atomic rename failed
    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// Invalid stamp configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General error
    #[error("{0}")]
    General(String),
}

/// Per-document failure classes reported by the batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    AssetNotFound,
    UnsupportedGeometry,
    UnreadableDocument,
    WriteFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::AssetNotFound => "asset not found",
            FailureKind::UnsupportedGeometry => "unsupported geometry",
            FailureKind::UnreadableDocument => "unreadable document",
            FailureKind::WriteFailure => "write failure",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Classify this error for the batch summary.
    ///
    /// Raw lopdf errors surface while walking a loaded document, so they count
    /// as unreadable input. Raw IO errors count as write failures.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::AssetNotFound { .. } => FailureKind::AssetNotFound,
            Error::UnsupportedGeometry { .. } => FailureKind::UnsupportedGeometry,
            Error::WriteFailure { .. } | Error::Io(_) => FailureKind::WriteFailure,
            Error::UnreadableDocument { .. }
            | Error::Pdf(_)
            | Error::FileNotFound(_)
            | Error::InvalidGlob(_)
            | Error::InvalidConfig(_)
            | Error::General(_) => FailureKind::UnreadableDocument,
        }
    }
}
