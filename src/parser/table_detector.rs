//! Table detection and extraction.
//!
//! Detection is pluggable through [`TableStrategy`]. Two heuristics ship
//! with the crate:
//!
//! - [`LineBased`] finds grids drawn with ruling lines (lattice mode).
//! - [`WhitespaceBased`] finds text aligned into columns without rules
//!   (stream mode, in the spirit of Camelot).
//!
//! [`TableExtractor`] runs a strategy, merges overlapping candidates and
//! fills the resulting grids with cell text.

use std::collections::{HashMap, HashSet};

use super::content::{PageGeometry, Segment, TextSpan};
use super::grid::TableGrid;
use super::layout::compare_top_left;
use super::normalize::TextNormalizer;
use super::options::TableStrategyKind;
use crate::error::{Error, Result};
use crate::model::{BBox, Table};

/// A table found by a strategy, before cell text is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCandidate {
    /// Candidate bounds
    pub bbox: BBox,
    /// Cell grid
    pub grid: TableGrid,
    /// Name of the strategy that produced it
    pub strategy: &'static str,
}

impl TableCandidate {
    /// Candidate covering a grid.
    pub fn new(grid: TableGrid, strategy: &'static str) -> Self {
        Self {
            bbox: grid.bbox(),
            grid,
            strategy,
        }
    }
}

/// A table detection heuristic.
pub trait TableStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Find table candidates on a page.
    fn candidates(&self, page: &PageGeometry) -> Result<Vec<TableCandidate>>;
}

impl TableStrategyKind {
    /// Instantiate the strategy with default settings.
    pub fn build(self) -> Box<dyn TableStrategy> {
        match self {
            TableStrategyKind::LineBased => Box::new(LineBased::default()),
            TableStrategyKind::WhitespaceBased => Box::new(WhitespaceBased::default()),
            TableStrategyKind::Auto => Box::new(Auto::default()),
        }
    }
}

// ==================== Lattice ====================

/// Detects tables from ruling lines.
///
/// Collinear segments are snapped together and joined, segments that cross
/// are grouped into connected regions, and each region with at least two
/// horizontal and two vertical rules becomes a grid. Grid walls with no
/// rule behind them are left open, which joins the neighbouring slots into
/// one merged cell.
#[derive(Debug, Clone)]
pub struct LineBased {
    /// Distance within which parallel rules are snapped to one position
    pub snap_tolerance: f32,
    /// Largest gap bridged when joining collinear rules
    pub join_tolerance: f32,
    /// Slack when testing whether two rules cross
    pub intersection_tolerance: f32,
}

impl Default for LineBased {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            intersection_tolerance: 3.0,
        }
    }
}

impl TableStrategy for LineBased {
    fn name(&self) -> &'static str {
        "line_based"
    }

    fn candidates(&self, page: &PageGeometry) -> Result<Vec<TableCandidate>> {
        let (mut horizontals, mut verticals): (Vec<Segment>, Vec<Segment>) =
            page.segments.iter().partition(|s| s.is_horizontal());
        if horizontals.len() < 2 || verticals.len() < 2 {
            return Ok(Vec::new());
        }

        snap(&mut horizontals, self.snap_tolerance, |s| s.y0, |s, v| {
            s.y0 = v;
            s.y1 = v;
        });
        snap(&mut verticals, self.snap_tolerance, |s| s.x0, |s, v| {
            s.x0 = v;
            s.x1 = v;
        });
        let horizontals = join_collinear(
            horizontals,
            self.join_tolerance,
            |s| s.y0,
            |s| (s.x0, s.x1),
            |proto, start, end| Segment::horizontal(proto.y0, start, end),
        );
        let verticals = join_collinear(
            verticals,
            self.join_tolerance,
            |s| s.x0,
            |s| (s.y0, s.y1),
            |proto, start, end| Segment::vertical(proto.x0, start, end),
        );

        let components = self.connected_regions(&horizontals, &verticals);

        let mut candidates = Vec::new();
        for (hs, vs) in components {
            if hs.len() < 2 || vs.len() < 2 {
                continue;
            }
            let xs = distinct(vs.iter().map(|v| v.x0));
            let ys = distinct(hs.iter().map(|h| h.y0));
            if xs.len() < 2 || ys.len() < 2 {
                continue;
            }
            let grid = self.build_grid(xs, ys, &hs, &vs);
            log::debug!(
                "LineBased: {}x{} grid at {:?}",
                grid.rows(),
                grid.cols(),
                grid.bbox()
            );
            candidates.push(TableCandidate::new(grid, self.name()));
        }

        Ok(candidates)
    }
}

impl LineBased {
    /// Group rules that cross each other. Returns the horizontal and
    /// vertical rules of every connected region.
    fn connected_regions(
        &self,
        horizontals: &[Segment],
        verticals: &[Segment],
    ) -> Vec<(Vec<Segment>, Vec<Segment>)> {
        let tol = self.intersection_tolerance;
        let n = horizontals.len();
        let mut parent: Vec<usize> = (0..n + verticals.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for (i, h) in horizontals.iter().enumerate() {
            for (j, v) in verticals.iter().enumerate() {
                let crosses = v.x0 >= h.x0 - tol
                    && v.x0 <= h.x1 + tol
                    && h.y0 >= v.y0 - tol
                    && h.y0 <= v.y1 + tol;
                if crosses {
                    let a = find(&mut parent, i);
                    let b = find(&mut parent, n + j);
                    if a != b {
                        parent[b] = a;
                    }
                }
            }
        }

        let mut regions: HashMap<usize, (Vec<Segment>, Vec<Segment>)> = HashMap::new();
        for (i, h) in horizontals.iter().enumerate() {
            let root = find(&mut parent, i);
            regions.entry(root).or_default().0.push(*h);
        }
        for (j, v) in verticals.iter().enumerate() {
            let root = find(&mut parent, n + j);
            regions.entry(root).or_default().1.push(*v);
        }

        // Deterministic order: by smallest member index
        let mut regions: Vec<(usize, (Vec<Segment>, Vec<Segment>))> = regions.into_iter().collect();
        regions.sort_by_key(|(root, _)| *root);
        regions.into_iter().map(|(_, r)| r).collect()
    }

    fn build_grid(
        &self,
        xs: Vec<f32>,
        ys: Vec<f32>,
        horizontals: &[Segment],
        verticals: &[Segment],
    ) -> TableGrid {
        let tol = self.intersection_tolerance;
        let rows = ys.len() - 1;
        let cols = xs.len() - 1;

        let covered_v = |x: f32, y0: f32, y1: f32| {
            verticals.iter().any(|v| {
                (v.x0 - x).abs() <= tol && v.y0 <= y0 + tol && v.y1 >= y1 - tol
            })
        };
        let covered_h = |y: f32, x0: f32, x1: f32| {
            horizontals.iter().any(|h| {
                (h.y0 - y).abs() <= tol && h.x0 <= x0 + tol && h.x1 >= x1 - tol
            })
        };

        let open_right = (0..rows)
            .map(|r| {
                (0..cols - 1)
                    .map(|c| !covered_v(xs[c + 1], ys[r], ys[r + 1]))
                    .collect()
            })
            .collect();
        let open_below = (0..rows - 1)
            .map(|r| {
                (0..cols)
                    .map(|c| !covered_h(ys[r + 1], xs[c], xs[c + 1]))
                    .collect()
            })
            .collect();

        TableGrid::new(xs, ys, open_right, open_below)
    }
}

/// Cluster segments along one axis and move each cluster to its mean.
fn snap<K, S>(segments: &mut [Segment], tolerance: f32, key: K, mut set: S)
where
    K: Fn(&Segment) -> f32,
    S: FnMut(&mut Segment, f32),
{
    if segments.is_empty() {
        return;
    }
    segments.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal));

    let mut start = 0;
    for i in 1..=segments.len() {
        let end_of_cluster =
            i == segments.len() || (key(&segments[i]) - key(&segments[start])).abs() > tolerance;
        if end_of_cluster {
            let mean = (start..i).map(|j| key(&segments[j])).sum::<f32>() / (i - start) as f32;
            for segment in &mut segments[start..i] {
                set(segment, mean);
            }
            start = i;
        }
    }
}

/// Merge overlapping or nearly touching segments on the same line.
fn join_collinear<K, P, B>(
    mut segments: Vec<Segment>,
    tolerance: f32,
    key: K,
    span: P,
    build: B,
) -> Vec<Segment>
where
    K: Fn(&Segment) -> f32,
    P: Fn(&Segment) -> (f32, f32),
    B: Fn(&Segment, f32, f32) -> Segment,
{
    segments.sort_by(|a, b| {
        key(a)
            .partial_cmp(&key(b))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                span(a)
                    .0
                    .partial_cmp(&span(b).0)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    let mut result = Vec::new();
    let mut i = 0;
    while i < segments.len() {
        let line = key(&segments[i]);
        let mut j = i + 1;
        while j < segments.len() && (key(&segments[j]) - line).abs() < 1e-3 {
            j += 1;
        }

        let (mut start, mut end) = span(&segments[i]);
        for segment in &segments[i + 1..j] {
            let (s, e) = span(segment);
            if s <= end + tolerance {
                end = end.max(e);
            } else {
                result.push(build(&segments[i], start, end));
                start = s;
                end = e;
            }
        }
        result.push(build(&segments[i], start, end));
        i = j;
    }

    result
}

/// Sorted distinct values, comparing at a thousandth of a point.
fn distinct(values: impl Iterator<Item = f32>) -> Vec<f32> {
    let mut seen = HashSet::new();
    let mut out: Vec<f32> = values
        .filter(|v| seen.insert((v * 1000.0).round() as i64))
        .collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

// ==================== Stream ====================

/// Whitespace table detector configuration.
#[derive(Debug, Clone)]
pub struct WhitespaceConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
    /// Spans closer than this (fraction of font size) are one phrase
    pub word_gap_factor: f32,
}

impl Default for WhitespaceConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            word_gap_factor: 0.6,
        }
    }
}

/// Detects tables from text alignment.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceBased {
    config: WhitespaceConfig,
}

/// A row of spans sharing a baseline.
#[derive(Debug, Clone)]
struct Row {
    spans: Vec<TextSpan>,
}

impl Row {
    fn top(&self) -> f32 {
        self.spans.iter().map(TextSpan::top).fold(f32::INFINITY, f32::min)
    }

    fn bottom(&self) -> f32 {
        self.spans
            .iter()
            .map(TextSpan::bottom)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

impl TableStrategy for WhitespaceBased {
    fn name(&self) -> &'static str {
        "whitespace_based"
    }

    fn candidates(&self, page: &PageGeometry) -> Result<Vec<TableCandidate>> {
        let cfg = &self.config;
        if page.spans.len() < cfg.min_rows * cfg.min_columns {
            return Ok(Vec::new());
        }

        let rows = self.group_into_rows(&page.spans);
        if rows.len() < cfg.min_rows {
            return Ok(Vec::new());
        }

        let columns = self.detect_columns(&rows);
        log::debug!(
            "WhitespaceBased: {} rows, column edges {:?}",
            rows.len(),
            columns
        );
        if columns.len() < cfg.min_columns {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for (start, end) in self.find_table_regions(&rows, &columns) {
            let region = &rows[start..=end];

            let region_columns = self.detect_columns(region);
            if region_columns.len() < cfg.min_columns {
                continue;
            }
            if region_columns.len() > cfg.max_columns {
                log::debug!(
                    "WhitespaceBased: skipping region, too many columns ({} > {})",
                    region_columns.len(),
                    cfg.max_columns
                );
                continue;
            }
            if is_list_pattern(region, &region_columns) {
                log::debug!("WhitespaceBased: skipping region, detected as list pattern");
                continue;
            }

            match self.build_grid(region, &region_columns) {
                Some(grid) => candidates.push(TableCandidate::new(grid, self.name())),
                None => log::debug!("WhitespaceBased: skipping region, no consistent grid"),
            }
        }

        Ok(candidates)
    }
}

impl WhitespaceBased {
    /// Detector with custom configuration.
    pub fn with_config(config: WhitespaceConfig) -> Self {
        Self { config }
    }

    /// Group spans into rows, top to bottom, joining spans that sit within
    /// a word gap of each other.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<Row> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut rows: Vec<Row> = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                _ => {
                    if !current.is_empty() {
                        rows.push(self.make_row(std::mem::take(&mut current)));
                    }
                    current_y = Some(span.y);
                    current.push(span);
                }
            }
        }
        if !current.is_empty() {
            rows.push(self.make_row(current));
        }

        rows
    }

    fn make_row(&self, mut spans: Vec<TextSpan>) -> Row {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let mut merged: Vec<TextSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(prev)
                    if span.x - prev.right() <= span.font_size * self.config.word_gap_factor =>
                {
                    if span.x - prev.right() > span.font_size * 0.1 {
                        prev.text.push(' ');
                    }
                    prev.text.push_str(&span.text);
                    prev.width = span.right().max(prev.right()) - prev.x;
                    prev.font_size = prev.font_size.max(span.font_size);
                }
                _ => merged.push(span),
            }
        }

        Row { spans: merged }
    }

    /// Column left edges that align across rows.
    fn detect_columns(&self, rows: &[Row]) -> Vec<f32> {
        let multi_span_rows: Vec<&Row> = rows.iter().filter(|r| r.spans.len() >= 2).collect();

        // With few multi-span rows, count every span instead of every row
        let (sample, per_row): (Vec<&Row>, bool) = if multi_span_rows.len() < self.config.min_rows
        {
            (rows.iter().collect(), false)
        } else {
            (multi_span_rows, true)
        };

        let bucket_size = 5.0;
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &sample {
            let buckets: Vec<i32> = row
                .spans
                .iter()
                .map(|s| (s.x / bucket_size).round() as i32)
                .collect();
            if per_row {
                let unique: HashSet<i32> = buckets.into_iter().collect();
                for bucket in unique {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            } else {
                for bucket in buckets {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            }
        }

        let min_occurrences =
            ((sample.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * bucket_size)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Contiguous runs of rows that align with the columns.
    fn find_table_regions(&self, rows: &[Row], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let is_table_row = row.spans.len() >= 2
                && alignment_score(row, columns) >= self.config.min_alignment_ratio;
            match (is_table_row, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }

    /// Grid boundaries for a region: columns split at the whitespace between
    /// neighbouring columns, rows split halfway between neighbouring rows.
    fn build_grid(&self, rows: &[Row], columns: &[f32]) -> Option<TableGrid> {
        let right_x = rows
            .iter()
            .flat_map(|r| &r.spans)
            .map(TextSpan::right)
            .fold(f32::NEG_INFINITY, f32::max);

        // (min left, max right) of the spans in each column
        let mut extents: Vec<Option<(f32, f32)>> = vec![None; columns.len()];
        for span in rows.iter().flat_map(|r| &r.spans) {
            let col = find_column_for_span(span.x, columns, right_x);
            let entry = &mut extents[col];
            *entry = Some(match *entry {
                Some((l, r)) => (l.min(span.x), r.max(span.right())),
                None => (span.x, span.right()),
            });
        }
        let extents: Vec<(f32, f32)> = extents.into_iter().flatten().collect();
        if extents.len() < self.config.min_columns {
            return None;
        }

        let mut xs = vec![extents[0].0 - 1.0];
        for pair in extents.windows(2) {
            let (_, left_right) = pair[0];
            let (right_left, _) = pair[1];
            xs.push(if left_right < right_left {
                (left_right + right_left) / 2.0
            } else {
                right_left - 0.5
            });
        }
        xs.push(extents.iter().map(|e| e.1).fold(f32::NEG_INFINITY, f32::max) + 1.0);

        let mut ys = vec![rows[0].top() - 1.0];
        for pair in rows.windows(2) {
            ys.push((pair[0].bottom() + pair[1].top()) / 2.0);
        }
        ys.push(rows[rows.len() - 1].bottom() + 1.0);

        let grid = TableGrid::closed(xs, ys);
        grid.validate().ok().map(|_| grid)
    }
}

/// Share of a row's spans starting at a column edge.
fn alignment_score(row: &Row, columns: &[f32]) -> f32 {
    if row.spans.is_empty() || columns.is_empty() {
        return 0.0;
    }
    let aligned = row
        .spans
        .iter()
        .filter(|s| columns.iter().any(|c| (s.x - c).abs() <= 5.0))
        .count();
    aligned as f32 / row.spans.len() as f32
}

/// Column index for a span's left edge.
fn find_column_for_span(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Whether the rows look like a bulleted or numbered list rather than a table.
fn is_list_pattern(rows: &[Row], columns: &[f32]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }

    let mut bullets = 0;
    let mut numbers = 0;
    for row in rows {
        // Spans are sorted by x, so the first is the leftmost
        if let Some(first) = row.spans.first() {
            let text = first.text.trim();
            if is_bullet_marker(text) {
                bullets += 1;
            } else if is_number_marker(text) {
                numbers += 1;
            }
        }
    }

    let bullet_ratio = bullets as f32 / rows.len() as f32;
    let total_ratio = (bullets + numbers) as f32 / rows.len() as f32;

    // Numbered first columns are common in real tables; only reject
    // the two-column case
    bullet_ratio >= 0.5 || (columns.len() == 2 && total_ratio >= 0.5)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "▹" | "►" | "■" | "●" | "※"
            | "□" | "◆" | "◇" | "▶" | "▷" | "☞" | "➤" | "➜"
    )
}

/// Number-style list markers: "1.", "12)", "a.", or a bare number.
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    let mut chars = cleaned.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.' | ')'), None) if c.is_alphabetic()
    )
}

// ==================== Auto ====================

/// Lattice detection first, then stream detection on the text outside the
/// lattice tables.
#[derive(Debug, Clone, Default)]
pub struct Auto {
    lines: LineBased,
    whitespace: WhitespaceBased,
}

impl TableStrategy for Auto {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn candidates(&self, page: &PageGeometry) -> Result<Vec<TableCandidate>> {
        let mut candidates = self.lines.candidates(page)?;
        let covered: Vec<BBox> = candidates.iter().map(|c| c.bbox).collect();
        let rest = page.retain_spans_outside(&covered);
        for candidate in self.whitespace.candidates(&rest)? {
            if looks_like_prose(&candidate, &rest.spans) {
                log::debug!(
                    "Auto: skipping whitespace candidate at {:?}, cells read as running text",
                    candidate.bbox
                );
                continue;
            }
            candidates.push(candidate);
        }
        Ok(candidates)
    }
}

/// Column count at or below which a whitespace grid may be a text layout.
const PROSE_MAX_COLUMNS: usize = 3;

/// Mean words per filled cell from which cells read as sentences.
const PROSE_MIN_WORDS_PER_CELL: f32 = 4.0;

/// Whether a whitespace candidate is really multi-column running text:
/// few columns whose cells hold sentence fragments rather than values.
fn looks_like_prose(candidate: &TableCandidate, spans: &[TextSpan]) -> bool {
    if candidate.grid.cols() > PROSE_MAX_COLUMNS {
        return false;
    }
    let rows = candidate.grid.fill(spans, &TextNormalizer::new(false));
    let word_counts: Vec<usize> = rows
        .iter()
        .flatten()
        .map(|cell| cell.split_whitespace().count())
        .filter(|&n| n > 0)
        .collect();
    if word_counts.is_empty() {
        return false;
    }
    let mean = word_counts.iter().sum::<usize>() as f32 / word_counts.len() as f32;
    mean >= PROSE_MIN_WORDS_PER_CELL
}

// ==================== Extraction ====================

/// Turns table candidates into filled tables.
pub struct TableExtractor {
    strategy: Box<dyn TableStrategy>,
    overlap_threshold: f32,
    normalizer: TextNormalizer,
}

impl TableExtractor {
    /// Create an extractor around a strategy.
    pub fn new(
        strategy: Box<dyn TableStrategy>,
        overlap_threshold: f32,
        normalizer: TextNormalizer,
    ) -> Self {
        Self {
            strategy,
            overlap_threshold,
            normalizer,
        }
    }

    /// Name of the configured strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Detect and fill the tables on a page, ordered by (top, left).
    pub fn extract(&self, page: &PageGeometry, page_number: u32) -> Result<Vec<Table>> {
        let candidates = self.strategy.candidates(page)?;
        let candidates = merge_overlapping(candidates, self.overlap_threshold);

        let mut tables = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            candidate
                .grid
                .validate()
                .map_err(|message| Error::TableExtraction {
                    page: page_number,
                    message: format!("{} candidate: {}", candidate.strategy, message),
                })?;

            if candidate.grid.rows() < 2 || candidate.grid.cols() < 2 {
                log::debug!(
                    "Page {}: dropping {}x{} {} candidate",
                    page_number,
                    candidate.grid.rows(),
                    candidate.grid.cols(),
                    candidate.strategy
                );
                continue;
            }

            let rows = candidate.grid.fill(&page.spans, &self.normalizer);
            tables.push(Table::new(candidate.grid.bbox(), rows));
        }

        tables.sort_by(|a, b| compare_top_left(&a.bbox, &b.bbox));
        Ok(tables)
    }
}

impl std::fmt::Debug for TableExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableExtractor")
            .field("strategy", &self.strategy.name())
            .field("overlap_threshold", &self.overlap_threshold)
            .finish()
    }
}

/// Merge candidates whose overlap exceeds `threshold` until none do.
fn merge_overlapping(mut candidates: Vec<TableCandidate>, threshold: f32) -> Vec<TableCandidate> {
    loop {
        let pair = (0..candidates.len()).find_map(|i| {
            (i + 1..candidates.len())
                .find(|&j| candidates[i].bbox.overlap_ratio(&candidates[j].bbox) > threshold)
                .map(|j| (i, j))
        });
        let Some((i, j)) = pair else {
            return candidates;
        };

        let b = candidates.remove(j);
        let a = &mut candidates[i];
        log::debug!(
            "Merging overlapping {} and {} candidates",
            a.strategy,
            b.strategy
        );
        a.grid = a.grid.union(&b.grid);
        a.bbox = a.grid.bbox();
    }
}
