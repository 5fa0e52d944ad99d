//! Error types for pdfstruct.

use std::io;
use thiserror::Error;

/// Result type alias for pdfstruct operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting a PDF.
///
/// Variants fall into three groups. Document-open errors are fatal for the
/// whole run (see [`Error::is_document_open`]). Page-scoped errors describe a
/// failure isolated to one page (see [`Error::is_page_scoped`]). The rest are
/// pipeline errors such as cancellation or invalid configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading the source document.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The document could not be opened (corrupt structure, no pages, ...).
    #[error("Failed to open document: {0}")]
    DocumentOpen(String),

    /// A page's content stream could not be read or decoded.
    #[error("Text extraction failed on page {page}: {message}")]
    TextExtraction { page: u32, message: String },

    /// Table geometry on a page was internally inconsistent.
    #[error("Table extraction failed on page {page}: {message}")]
    TableExtraction { page: u32, message: String },

    /// A page did not finish within the configured timeout.
    #[error("Page {page} timed out after {elapsed_ms} ms")]
    Timeout { page: u32, elapsed_ms: u64 },

    /// The extraction was cancelled before completion.
    #[error("Extraction cancelled")]
    Cancelled,

    /// The extraction options are invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error while rendering the result.
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Whether this error prevented the document from being opened at all.
    pub fn is_document_open(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::Encrypted
                | Error::DocumentOpen(_)
        )
    }

    /// Whether this error is isolated to a single page.
    pub fn is_page_scoped(&self) -> bool {
        self.page().is_some()
    }

    /// The 1-based page number a page-scoped error refers to.
    pub fn page(&self) -> Option<u32> {
        match self {
            Error::TextExtraction { page, .. }
            | Error::TableExtraction { page, .. }
            | Error::Timeout { page, .. } => Some(*page),
            _ => None,
        }
    }

    /// Stable snake_case identifier used for error markers in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::UnknownFormat => "unknown_format",
            Error::UnsupportedVersion(_) => "unsupported_version",
            Error::Encrypted => "encrypted",
            Error::DocumentOpen(_) => "document_open",
            Error::TextExtraction { .. } => "text_extraction",
            Error::TableExtraction { .. } => "table_extraction",
            Error::Timeout { .. } => "timeout",
            Error::Cancelled => "cancelled",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Render(_) => "render",
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::DocumentOpen(err.to_string()),
        }
    }
}
