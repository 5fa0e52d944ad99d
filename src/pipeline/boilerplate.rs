//! Running header and footer removal.

use std::collections::HashMap;

use crate::model::ContentItem;

/// Drops text blocks whose text repeats across the document.
///
/// Page headers, footers and watermarks show up as the same text on many
/// pages. Every block whose text occurs at least `limit` times in the whole
/// document is removed, except on the first page, where the title usually
/// lives.
#[derive(Debug, Clone, Copy)]
pub struct RepeatedTextFilter {
    limit: usize,
}

impl RepeatedTextFilter {
    /// Create a filter. A `limit` below 2 would remove all text, so it is
    /// raised to 2.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(2),
        }
    }

    /// Filter the given pages in place. Each entry is `(page_index, content)`.
    pub fn apply(&self, pages: &mut [(usize, &mut Vec<ContentItem>)]) {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for (_, items) in pages.iter() {
            for item in items.iter() {
                if let ContentItem::Text(block) = item {
                    *counts.entry(block.text.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut removed = 0;
        for (page_index, items) in pages.iter_mut() {
            if *page_index == 0 {
                continue;
            }
            let before = items.len();
            items.retain(|item| match item {
                ContentItem::Text(block) => {
                    counts.get(&block.text).copied().unwrap_or(0) < self.limit
                }
                ContentItem::Table(_) => true,
            });
            removed += before - items.len();
        }

        if removed > 0 {
            log::debug!(
                "Removed {} repeated text blocks (limit {})",
                removed,
                self.limit
            );
        }
    }
}
