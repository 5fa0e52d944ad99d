//! Merging text blocks and tables into one ordered content sequence.

use std::cmp::Ordering;

use crate::model::{round2, BBox, ContentItem, Table, TextBlock, TextLine};

/// Combines a page's text blocks and tables.
///
/// Text that lies inside a table is already part of its cells, so it is
/// removed from the prose. A block that only partly overlaps a table keeps
/// the lines outside it. Text starting above a table's top edge is kept
/// even when it falls within the containment tolerance, which preserves
/// captions drawn tight against the table.
#[derive(Debug, Clone, Copy)]
pub struct ContentMerger {
    containment_tolerance: f32,
}

impl Default for ContentMerger {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl ContentMerger {
    /// Create a merger with the given containment tolerance in points.
    pub fn new(containment_tolerance: f32) -> Self {
        Self {
            containment_tolerance,
        }
    }

    /// Merge blocks and tables, sorted by (top, left).
    pub fn merge(&self, blocks: Vec<TextBlock>, tables: Vec<Table>) -> Vec<ContentItem> {
        let mut items: Vec<ContentItem> = Vec::with_capacity(blocks.len() + tables.len());

        for block in blocks {
            for kept in self.trim_block(block, &tables) {
                items.push(ContentItem::Text(kept));
            }
        }
        items.extend(tables.into_iter().map(ContentItem::Table));

        items.sort_by(compare_items);

        let mut rank = 0;
        for item in &mut items {
            if let ContentItem::Text(block) = item {
                block.rank = rank;
                rank += 1;
            }
        }

        items
    }

    fn covered(&self, bbox: &BBox, tables: &[Table]) -> bool {
        tables.iter().any(|t| {
            t.bbox.contains(bbox, self.containment_tolerance) && bbox.y0 >= t.bbox.y0
        })
    }

    /// Remove the parts of a block covered by tables.
    fn trim_block(&self, block: TextBlock, tables: &[Table]) -> Vec<TextBlock> {
        if tables.is_empty() {
            return vec![block];
        }

        if block.lines.is_empty() {
            return if self.covered(&block.bbox, tables) {
                Vec::new()
            } else {
                vec![block]
            };
        }

        if !block.lines.iter().any(|l| self.covered(&l.bbox, tables)) {
            return vec![block];
        }

        let rank = block.rank;
        let mut pieces = Vec::new();
        let mut run: Vec<TextLine> = Vec::new();
        for line in block.lines {
            if self.covered(&line.bbox, tables) {
                if let Some(piece) = TextBlock::from_lines(std::mem::take(&mut run)) {
                    pieces.push(piece.with_rank(rank));
                }
            } else {
                run.push(line);
            }
        }
        if let Some(piece) = TextBlock::from_lines(run) {
            pieces.push(piece.with_rank(rank));
        }

        log::debug!(
            "Trimmed block at {:?} into {} piece(s) around tables",
            block.bbox,
            pieces.len()
        );
        pieces
    }
}

/// Total order: top, then left, then text before table, then rank.
fn compare_items(a: &ContentItem, b: &ContentItem) -> Ordering {
    let (ba, bb) = (a.bbox(), b.bbox());
    cmp_f32(round2(ba.y0), round2(bb.y0))
        .then_with(|| cmp_f32(round2(ba.x0), round2(bb.x0)))
        .then_with(|| kind_order(a).cmp(&kind_order(b)))
        .then_with(|| match (a, b) {
            (ContentItem::Text(x), ContentItem::Text(y)) => x.rank.cmp(&y.rank),
            _ => Ordering::Equal,
        })
}

fn kind_order(item: &ContentItem) -> u8 {
    match item {
        ContentItem::Text(_) => 0,
        ContentItem::Table(_) => 1,
    }
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
