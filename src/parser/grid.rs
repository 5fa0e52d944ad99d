//! Table grids: cell boundaries, merged cells and cell text.

use std::collections::HashMap;

use super::content::TextSpan;
use super::layout::group_into_lines;
use super::normalize::TextNormalizer;
use crate::model::BBox;

/// Boundaries closer than this are treated as one when grids are merged.
const BOUNDARY_CLUSTER_TOLERANCE: f32 = 1.0;

/// A rectangular grid of cell slots.
///
/// `xs` holds the column boundaries and `ys` the row boundaries, both
/// strictly increasing. A wall between two neighbouring slots is either
/// closed (a rule separates them) or open, in which case the two slots
/// belong to the same merged cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    xs: Vec<f32>,
    ys: Vec<f32>,
    /// `open_right[r][c]`: no wall between `(r, c)` and `(r, c + 1)`
    open_right: Vec<Vec<bool>>,
    /// `open_below[r][c]`: no wall between `(r, c)` and `(r + 1, c)`
    open_below: Vec<Vec<bool>>,
}

impl TableGrid {
    /// A grid with explicit wall state.
    pub fn new(
        xs: Vec<f32>,
        ys: Vec<f32>,
        open_right: Vec<Vec<bool>>,
        open_below: Vec<Vec<bool>>,
    ) -> Self {
        Self {
            xs,
            ys,
            open_right,
            open_below,
        }
    }

    /// A grid whose walls are all closed.
    pub fn closed(xs: Vec<f32>, ys: Vec<f32>) -> Self {
        let rows = ys.len().saturating_sub(1);
        let cols = xs.len().saturating_sub(1);
        Self {
            open_right: vec![vec![false; cols.saturating_sub(1)]; rows],
            open_below: vec![vec![false; cols]; rows.saturating_sub(1)],
            xs,
            ys,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.ys.len().saturating_sub(1)
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.xs.len().saturating_sub(1)
    }

    /// Column boundaries.
    pub fn xs(&self) -> &[f32] {
        &self.xs
    }

    /// Row boundaries.
    pub fn ys(&self) -> &[f32] {
        &self.ys
    }

    /// Whether slots `(row, col)` and `(row, col + 1)` are joined.
    pub fn is_open_right(&self, row: usize, col: usize) -> bool {
        self.open_right
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// Whether slots `(row, col)` and `(row + 1, col)` are joined.
    pub fn is_open_below(&self, row: usize, col: usize) -> bool {
        self.open_below
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// Outer bounds of the grid.
    pub fn bbox(&self) -> BBox {
        match (self.xs.first(), self.xs.last(), self.ys.first(), self.ys.last()) {
            (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) => BBox::new(x0, y0, x1, y1),
            _ => BBox::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Check the grid's geometry. Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        check_boundaries("column", &self.xs)?;
        check_boundaries("row", &self.ys)?;

        let rows = self.rows();
        let cols = self.cols();
        if self.open_right.len() != rows || self.open_right.iter().any(|r| r.len() != cols - 1) {
            return Err(format!(
                "vertical wall matrix does not match a {}x{} grid",
                rows, cols
            ));
        }
        if self.open_below.len() != rows - 1 || self.open_below.iter().any(|r| r.len() != cols) {
            return Err(format!(
                "horizontal wall matrix does not match a {}x{} grid",
                rows, cols
            ));
        }
        Ok(())
    }

    /// Grid covering both grids, using the union of their boundaries.
    /// All walls of the result are closed.
    pub fn union(&self, other: &TableGrid) -> TableGrid {
        TableGrid::closed(
            merge_boundaries(&self.xs, &other.xs),
            merge_boundaries(&self.ys, &other.ys),
        )
    }

    /// Merged-cell id for every slot: slots joined by open walls share an id.
    fn cell_groups(&self) -> Vec<Vec<usize>> {
        let rows = self.rows();
        let cols = self.cols();
        let mut parent: Vec<usize> = (0..rows * cols).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        fn union(parent: &mut [usize], a: usize, b: usize) {
            let ra = find(parent, a);
            let rb = find(parent, b);
            if ra != rb {
                parent[rb.max(ra)] = ra.min(rb);
            }
        }

        for r in 0..rows {
            for c in 0..cols {
                if c + 1 < cols && self.is_open_right(r, c) {
                    union(&mut parent, r * cols + c, r * cols + c + 1);
                }
                if r + 1 < rows && self.is_open_below(r, c) {
                    union(&mut parent, r * cols + c, (r + 1) * cols + c);
                }
            }
        }

        (0..rows)
            .map(|r| (0..cols).map(|c| find(&mut parent, r * cols + c)).collect())
            .collect()
    }

    /// Slot containing a point, if it lies inside the grid.
    fn locate(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        if !self.bbox().contains_point(x, y) {
            return None;
        }
        let col = self.xs.partition_point(|&b| b <= x).saturating_sub(1);
        let row = self.ys.partition_point(|&b| b <= y).saturating_sub(1);
        Some((row.min(self.rows() - 1), col.min(self.cols() - 1)))
    }

    /// Assign spans to cells by their center and build the cell texts.
    ///
    /// The text of a merged cell is repeated in every slot it covers.
    pub fn fill(&self, spans: &[TextSpan], normalizer: &TextNormalizer) -> Vec<Vec<String>> {
        let rows = self.rows();
        let cols = self.cols();
        if rows == 0 || cols == 0 {
            return Vec::new();
        }

        let groups = self.cell_groups();
        let mut group_spans: HashMap<usize, Vec<TextSpan>> = HashMap::new();
        for span in spans {
            let (cx, cy) = span.center();
            if let Some((r, c)) = self.locate(cx, cy) {
                group_spans
                    .entry(groups[r][c])
                    .or_default()
                    .push(span.clone());
            }
        }

        let texts: HashMap<usize, String> = group_spans
            .into_iter()
            .map(|(group, spans)| {
                let text = group_into_lines(spans)
                    .iter()
                    .map(|l| l.text())
                    .collect::<Vec<_>>()
                    .join(" ");
                (group, normalizer.normalize(&text))
            })
            .collect();

        groups
            .iter()
            .map(|row| {
                row.iter()
                    .map(|g| texts.get(g).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

fn check_boundaries(axis: &str, values: &[f32]) -> Result<(), String> {
    if values.len() < 2 {
        return Err(format!("{} boundaries need at least two values", axis));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(format!("non-finite {} boundary", axis));
    }
    if values.windows(2).any(|w| w[1] <= w[0]) {
        return Err(format!("{} boundaries are not strictly increasing", axis));
    }
    Ok(())
}

/// Sorted union of two boundary lists, with near-equal values collapsed.
fn merge_boundaries(a: &[f32], b: &[f32]) -> Vec<f32> {
    let mut all: Vec<f32> = a.iter().chain(b).copied().collect();
    all.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

    let mut merged: Vec<f32> = Vec::with_capacity(all.len());
    for v in all {
        match merged.last() {
            Some(&last) if (v - last).abs() <= BOUNDARY_CLUSTER_TOLERANCE => {}
            _ => merged.push(v),
        }
    }
    merged
}
