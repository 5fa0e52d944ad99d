//! Page content types: text blocks, tables and the merged content sequence.

use serde::{Deserialize, Serialize};

use super::BBox;

/// One line of text inside a [`TextBlock`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Line text
    pub text: String,
    /// Line bounds
    pub bbox: BBox,
}

impl TextLine {
    /// Create a new line.
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// A block of prose: one or more lines merged by the text extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Block text, lines joined by single spaces
    pub text: String,

    /// Block bounds (union of its lines)
    pub bbox: BBox,

    /// Reading-order rank within the page
    #[serde(skip)]
    pub rank: usize,

    /// Constituent lines, kept so a block can be trimmed around tables
    #[serde(skip)]
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Create a block without line structure.
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
            rank: 0,
            lines: Vec::new(),
        }
    }

    /// Build a block from its lines. Returns `None` when `lines` is empty.
    pub fn from_lines(lines: Vec<TextLine>) -> Option<Self> {
        let first = lines.first()?;
        let bbox = lines.iter().skip(1).fold(first.bbox, |acc, l| acc.union(&l.bbox));
        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Some(Self {
            text,
            bbox,
            rank: 0,
            lines,
        })
    }

    /// Set the reading-order rank.
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    /// Check if the block has no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A table as a rectangular grid of cell strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table bounds
    pub bbox: BBox,

    /// Rows in source order, each with the same number of cells
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a table, padding ragged rows with empty cells to the widest row.
    pub fn new(bbox: BBox, mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self { bbox, rows }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Cell text at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// An entry in a page's merged content sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// A block of prose
    Text(TextBlock),
    /// A table
    Table(Table),
}

impl ContentItem {
    /// Bounds of the entry.
    pub fn bbox(&self) -> &BBox {
        match self {
            ContentItem::Text(block) => &block.bbox,
            ContentItem::Table(table) => &table.bbox,
        }
    }

    /// The text block, if this entry is one.
    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            ContentItem::Text(block) => Some(block),
            ContentItem::Table(_) => None,
        }
    }

    /// The table, if this entry is one.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            ContentItem::Table(table) => Some(table),
            ContentItem::Text(_) => None,
        }
    }
}
