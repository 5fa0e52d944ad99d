//! Document-level result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentItem;
use crate::error::Error;

/// The complete output of one extraction call.
///
/// Only `source`, `page_count` and `pages` belong to the canonical JSON, so
/// extracting the same document twice serializes to identical bytes. The
/// timestamp and metadata can be added by the JSON renderer on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Source identifier (path or caller-supplied name)
    pub source: String,

    /// Number of pages in the document
    pub page_count: usize,

    /// Per-page results, in page order
    pub pages: Vec<PageResult>,

    /// When the extraction finished
    #[serde(skip)]
    pub extracted_at: DateTime<Utc>,

    /// Document information dictionary
    #[serde(skip)]
    pub metadata: Metadata,
}

impl ExtractionResult {
    /// Pages that failed (collect mode only; fail-fast never produces them).
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| p.is_error())
    }

    /// Whether at least one page carries an error marker.
    pub fn is_partial(&self) -> bool {
        self.failed_pages().next().is_some()
    }

    /// All content entries across pages, in document order.
    pub fn content(&self) -> impl Iterator<Item = &ContentItem> {
        self.pages.iter().flat_map(|p| p.content_items().iter())
    }
}

/// The result for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 0-based page index
    pub page_index: usize,

    /// Either the merged content or an error marker
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

impl PageResult {
    /// A successfully extracted page.
    pub fn content(page_index: usize, content: Vec<ContentItem>) -> Self {
        Self {
            page_index,
            outcome: PageOutcome::Content(content),
        }
    }

    /// A failed page.
    pub fn error(page_index: usize, error: PageError) -> Self {
        Self {
            page_index,
            outcome: PageOutcome::Error(error),
        }
    }

    /// Whether the page failed.
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, PageOutcome::Error(_))
    }

    /// The page's content entries (empty for failed pages).
    pub fn content_items(&self) -> &[ContentItem] {
        match &self.outcome {
            PageOutcome::Content(items) => items,
            PageOutcome::Error(_) => &[],
        }
    }

    /// The error marker, if the page failed.
    pub fn error_marker(&self) -> Option<&PageError> {
        match &self.outcome {
            PageOutcome::Error(e) => Some(e),
            PageOutcome::Content(_) => None,
        }
    }
}

/// Content or error for a page, serialized as a `content` or `error` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOutcome {
    /// Merged content in reading order
    Content(Vec<ContentItem>),
    /// Error marker for a failed page
    Error(PageError),
}

/// Error marker recorded in place of a failed page's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    /// Error category (e.g., "timeout", "text_extraction")
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl From<&Error> for PageError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Document metadata read from the information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Document title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Document subject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Creator application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    /// PDF producer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// Creation date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Create metadata with a PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }
}
