//! PDF parsing: document loading, content-stream interpretation, text
//! layout, table detection and content merging.

mod content;
mod grid;
mod layout;
mod loader;
mod merger;
mod normalize;
mod options;
mod table_detector;

pub use content::{interpret_page, Orientation, PageGeometry, Segment, TextSpan};
pub use grid::TableGrid;
pub use layout::TextExtractor;
pub use loader::{LoadedDocument, PageHandle};
pub use merger::ContentMerger;
pub use normalize::TextNormalizer;
pub use options::{ExtractOptions, OnPageError, TableStrategyKind};
pub use table_detector::{
    Auto, LineBased, TableCandidate, TableExtractor, TableStrategy, WhitespaceBased,
    WhitespaceConfig,
};
