//! # pdfstruct
//!
//! Parallel PDF content extraction into ordered, per-page JSON.
//!
//! Every page is processed independently on a worker pool: its text is
//! grouped into blocks, its tables are detected and filled, and both are
//! merged into one sequence in reading order. The result keeps source page
//! order no matter which page finishes first.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfstruct::{extract_file, render, ExtractOptions};
//!
//! fn main() -> pdfstruct::Result<()> {
//!     let result = extract_file("document.pdf", &ExtractOptions::default())?;
//!
//!     let json = render::to_json(&result, render::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Text blocks**: lines grouped by proximity, font size and columns
//! - **Tables**: ruled grids, whitespace-aligned columns, or both
//! - **Merged cells**: cell text repeated across every covered slot
//! - **Parallel pages**: bounded worker pool with per-page timeouts
//! - **Failure modes**: fail fast, or record failed pages and continue

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, is_pdf_bytes, PdfFormat};
pub use error::{Error, Result};
pub use model::{
    BBox, ContentItem, ExtractionResult, Metadata, PageError, PageOutcome, PageResult, Table,
    TextBlock, TextLine,
};
pub use parser::{
    ExtractOptions, LoadedDocument, OnPageError, TableStrategy, TableStrategyKind,
};
pub use pipeline::{
    extract, extract_bytes, extract_file, CancellationToken, DocumentSource, Extractor,
    PagePipeline,
};
pub use render::{JsonFormat, JsonOptions};
