//! Layout analysis: turns positioned spans into text blocks.
//!
//! Spans are split into columns by gutter detection, grouped into lines by
//! baseline, and consecutive lines are merged into blocks when they are
//! close together, share a font size and are not separated by a rule.

use std::cmp::Ordering;

use super::content::{is_spaceless_script_char, PageGeometry, Segment, TextSpan};
use super::normalize::TextNormalizer;
use crate::model::{BBox, TextBlock, TextLine};

/// Width of the slices used when searching for a gutter.
const SLICE_WIDTH: f32 = 3.0;

/// Narrowest gutter that separates two columns.
const MIN_GUTTER_WIDTH: f32 = 12.0;

/// Narrowest column accepted on either side of a gutter.
const MIN_COLUMN_WIDTH: f32 = 80.0;

/// Text narrower than this is always one column.
const MIN_MULTI_COLUMN_EXTENT: f32 = 250.0;

/// Left-edge shift that starts a new block.
const INDENT_BREAK: f32 = 20.0;

/// Extracts text blocks from a page.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    line_gap_tolerance: f32,
    normalizer: TextNormalizer,
}

impl TextExtractor {
    /// Create an extractor.
    ///
    /// `line_gap_tolerance` is the largest vertical gap between two lines of
    /// one block, as a multiple of the page's median line height.
    pub fn new(line_gap_tolerance: f32, normalizer: TextNormalizer) -> Self {
        Self {
            line_gap_tolerance,
            normalizer,
        }
    }

    /// Extract blocks in (top, left) order, ranked in that order.
    pub fn extract(&self, geometry: &PageGeometry) -> Vec<TextBlock> {
        if geometry.spans.is_empty() {
            return Vec::new();
        }

        let columns = detect_columns(&geometry.spans);
        log::debug!("Detected {} columns", columns.len());

        let mut column_spans: Vec<Vec<TextSpan>> = vec![Vec::new(); columns.len()];
        for span in &geometry.spans {
            let idx = columns
                .iter()
                .position(|c| c.contains_span(span))
                .unwrap_or(0);
            column_spans[idx].push(span.clone());
        }

        let column_lines: Vec<Vec<Line>> =
            column_spans.into_iter().map(group_into_lines).collect();

        let line_height = median(
            column_lines
                .iter()
                .flatten()
                .map(|l| l.bottom - l.top)
                .collect(),
        )
        .unwrap_or(12.0);
        let max_gap = self.line_gap_tolerance * line_height;

        let mut blocks: Vec<TextBlock> = column_lines
            .into_iter()
            .flat_map(|lines| self.group_into_blocks(lines, max_gap, &geometry.segments))
            .collect();

        blocks.sort_by(|a, b| compare_top_left(&a.bbox, &b.bbox));
        blocks
            .into_iter()
            .enumerate()
            .map(|(rank, block)| block.with_rank(rank))
            .collect()
    }

    fn group_into_blocks(&self, lines: Vec<Line>, max_gap: f32, rules: &[Segment]) -> Vec<TextBlock> {
        let mut blocks = Vec::new();
        let mut current: Vec<&Line> = Vec::new();

        for line in &lines {
            if let Some(prev) = current.last() {
                if should_break_block(prev, line, max_gap, rules) {
                    blocks.extend(self.build_block(&current));
                    current.clear();
                }
            }
            current.push(line);
        }
        blocks.extend(self.build_block(&current));

        blocks
    }

    fn build_block(&self, lines: &[&Line]) -> Option<TextBlock> {
        let lines: Vec<TextLine> = lines
            .iter()
            .filter_map(|l| {
                let text = self.normalizer.normalize(&l.text());
                (!text.is_empty()).then(|| TextLine::new(text, l.bbox()))
            })
            .collect();
        TextBlock::from_lines(lines)
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(0.5, TextNormalizer::default())
    }
}

/// Spans sharing a baseline.
#[derive(Debug, Clone)]
pub(crate) struct Line {
    pub spans: Vec<TextSpan>,
    /// Baseline
    pub y: f32,
    /// Left edge
    pub x: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    /// Dominant font size, weighted by text length
    pub font_size: f32,
}

impl Line {
    fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        let total_chars: usize = spans.iter().map(|s| s.text.chars().count()).sum();
        let weighted: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.chars().count() as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted / total_chars as f32
        } else {
            spans.first().map(|s| s.font_size).unwrap_or(0.0)
        };

        let fold = |init: f32, f: fn(&TextSpan) -> f32, pick: fn(f32, f32) -> f32| {
            spans.iter().map(f).fold(init, pick)
        };
        let x = fold(f32::INFINITY, |s| s.x, f32::min);
        let right = fold(f32::NEG_INFINITY, TextSpan::right, f32::max);
        let top = fold(f32::INFINITY, TextSpan::top, f32::min);
        let bottom = fold(f32::NEG_INFINITY, TextSpan::bottom, f32::max);
        let y = spans.first().map(|s| s.y).unwrap_or(0.0);

        Self {
            spans,
            y,
            x,
            right,
            top,
            bottom,
            font_size,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x, self.top, self.right, self.bottom)
    }

    /// Combined text of the spans.
    ///
    /// A space is inserted where the gap between two spans exceeds a fifth
    /// of the average character width, except between two characters of
    /// scripts written without word spaces.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - prev.right();

                let char_count = span.text.chars().count();
                let avg_char_width = if char_count > 0 && span.width > 0.0 {
                    span.width / char_count as f32
                } else {
                    span.font_size * 0.5
                };

                let both_spaceless = prev
                    .text
                    .chars()
                    .last()
                    .map(is_spaceless_script_char)
                    .unwrap_or(false)
                    && span
                        .text
                        .chars()
                        .next()
                        .map(is_spaceless_script_char)
                        .unwrap_or(false);

                let has_space = prev.text.ends_with([' ', '\u{00A0}'])
                    || span.text.starts_with([' ', '\u{00A0}']);

                if gap > avg_char_width * 0.2 && !both_spaceless && !has_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }
}

/// Group spans into lines by baseline, top to bottom.
pub(crate) fn group_into_lines(mut spans: Vec<TextSpan>) -> Vec<Line> {
    spans.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(Line::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(Line::from_spans(current));
    }

    lines
}

fn should_break_block(prev: &Line, curr: &Line, max_gap: f32, rules: &[Segment]) -> bool {
    let gap = curr.top - prev.bottom;
    if gap > max_gap {
        return true;
    }

    if (prev.font_size - curr.font_size).abs() > 1.0 {
        return true;
    }

    if (prev.x - curr.x).abs() > INDENT_BREAK {
        return true;
    }

    // A horizontal rule drawn between the lines separates them
    let left = prev.x.min(curr.x);
    let right = prev.right.max(curr.right);
    rules.iter().any(|r| {
        r.is_horizontal() && r.y0 > prev.y && r.y0 < curr.top && r.x0 < right && r.x1 > left
    })
}

/// A column of text between gutters.
#[derive(Debug, Clone)]
struct Column {
    left: f32,
    right: f32,
}

impl Column {
    fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    /// A span belongs to a column if its left edge or center falls inside it.
    fn contains_span(&self, span: &TextSpan) -> bool {
        self.contains(span.x) || self.contains(span.x + span.width / 2.0)
    }
}

/// Find at most one gutter splitting the spans into two columns.
fn detect_columns(spans: &[TextSpan]) -> Vec<Column> {
    let min_x = spans.iter().map(|s| s.x).fold(f32::INFINITY, f32::min);
    let max_x = spans
        .iter()
        .map(TextSpan::right)
        .fold(f32::NEG_INFINITY, f32::max);

    let single = || {
        vec![Column {
            left: min_x - 10.0,
            right: max_x + 10.0,
        }]
    };

    let extent = max_x - min_x;
    if !extent.is_finite() || extent < MIN_MULTI_COLUMN_EXTENT {
        return single();
    }

    let num_slices = (extent / SLICE_WIDTH) as usize + 1;
    let mut occupancy = vec![0usize; num_slices];
    for span in spans {
        let start = ((span.x - min_x) / SLICE_WIDTH) as usize;
        let end = ((span.right() - min_x) / SLICE_WIDTH) as usize;
        for slot in occupancy
            .iter_mut()
            .take(end.min(num_slices - 1) + 1)
            .skip(start)
        {
            *slot += 1;
        }
    }

    // Search the middle of the text area, preferring wide gaps near the center
    let search_start = num_slices * 15 / 100;
    let search_end = num_slices * 85 / 100;
    let center = num_slices / 2;

    let mut best: Option<(usize, usize)> = None;
    let mut best_dist = usize::MAX;
    let mut run_start = 0;
    let mut run_len = 0;

    let mut consider = |start: usize, len: usize| {
        let width = len as f32 * SLICE_WIDTH;
        if width < 10.0 {
            return;
        }
        let dist = (start + len / 2).abs_diff(center);
        let best_width = best.map(|(_, l)| l as f32 * SLICE_WIDTH).unwrap_or(0.0);
        if width > best_width * 1.5 || (width >= best_width * 0.7 && dist < best_dist) {
            best = Some((start, len));
            best_dist = dist;
        }
    };

    for (i, &count) in occupancy
        .iter()
        .enumerate()
        .take(search_end)
        .skip(search_start)
    {
        if count == 0 {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
        } else if run_len > 0 {
            consider(run_start, run_len);
            run_len = 0;
        }
    }
    if run_len > 0 {
        consider(run_start, run_len);
    }

    let Some((gap_start, gap_len)) = best else {
        return single();
    };
    if (gap_len as f32 * SLICE_WIDTH) < MIN_GUTTER_WIDTH {
        return single();
    }

    let gutter = min_x + (gap_start as f32 + gap_len as f32 / 2.0) * SLICE_WIDTH;
    if gutter - min_x < MIN_COLUMN_WIDTH || max_x - gutter < MIN_COLUMN_WIDTH {
        log::debug!("Column too narrow, treating as single column");
        return single();
    }

    let left_spans = spans
        .iter()
        .filter(|s| s.x + s.width / 2.0 < gutter)
        .count();
    let right_spans = spans.len() - left_spans;
    let min_spans = (spans.len() / 10).max(2);
    if left_spans < min_spans || right_spans < min_spans {
        log::debug!("Spans too imbalanced, treating as single column");
        return single();
    }

    log::debug!("Gutter at x={:.1}", gutter);
    vec![
        Column {
            left: min_x - 10.0,
            right: gutter,
        },
        Column {
            left: gutter,
            right: max_x + 10.0,
        },
    ]
}

/// Order boxes by top edge, then left edge.
pub(crate) fn compare_top_left(a: &BBox, b: &BBox) -> Ordering {
    a.y0.partial_cmp(&b.y0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    values.retain(|v| v.is_finite() && *v > 0.0);
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Some(values[values.len() / 2])
}
