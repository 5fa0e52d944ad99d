//! Output model for extracted PDF content.
//!
//! These types are produced by the extraction pipeline and serialized
//! as the JSON document. Every value is built fresh per extraction and
//! handed forward between stages without mutation.

mod bbox;
mod content;
mod document;

pub use bbox::BBox;
pub(crate) use bbox::round2;
pub use content::{ContentItem, Table, TextBlock, TextLine};
pub use document::{ExtractionResult, Metadata, PageError, PageOutcome, PageResult};
