//! Turning per-page outcomes into the document result.

use chrono::Utc;

use super::scheduler::PageSlot;
use crate::error::{Error, Result};
use crate::model::{ContentItem, ExtractionResult, Metadata, PageError, PageResult};
use crate::parser::OnPageError;

/// Builds an [`ExtractionResult`] from the page arena.
#[derive(Debug, Clone)]
pub(crate) struct DocumentAssembler {
    source: String,
    metadata: Metadata,
    on_page_error: OnPageError,
}

impl DocumentAssembler {
    pub(crate) fn new(source: impl Into<String>, metadata: Metadata, on_page_error: OnPageError) -> Self {
        Self {
            source: source.into(),
            metadata,
            on_page_error,
        }
    }

    /// Assemble pages in index order.
    ///
    /// Fail-fast mode returns the first unsuccessful page in page order as
    /// the error. Collect mode turns failures into error markers.
    pub(crate) fn assemble(self, slots: Vec<PageSlot<Vec<ContentItem>>>) -> Result<ExtractionResult> {
        let page_count = slots.len();
        let mut pages = Vec::with_capacity(page_count);

        for (index, slot) in slots.into_iter().enumerate() {
            let page = match (slot, self.on_page_error) {
                (PageSlot::Done(content), _) => PageResult::content(index, content),
                (PageSlot::Failed(err), OnPageError::FailFast) => return Err(err),
                (PageSlot::Skipped | PageSlot::Pending, OnPageError::FailFast) => {
                    return Err(Error::Cancelled)
                }
                (PageSlot::Failed(err), OnPageError::Collect) => {
                    PageResult::error(index, PageError::from(&err))
                }
                (PageSlot::Skipped | PageSlot::Pending, OnPageError::Collect) => {
                    PageResult::error(index, PageError::from(&Error::Cancelled))
                }
            };
            pages.push(page);
        }

        let result = ExtractionResult {
            source: self.source,
            page_count,
            pages,
            extracted_at: Utc::now(),
            metadata: self.metadata,
        };

        let failed = result.failed_pages().count();
        if failed > 0 {
            log::warn!(
                "{}: {} of {} pages failed",
                result.source,
                failed,
                page_count
            );
        }

        Ok(result)
    }
}
