//! Axis-aligned bounding boxes in page space.

use serde::{Deserialize, Serialize};

/// A rectangle on a page.
///
/// Coordinates are in points with the origin at the top-left corner of the
/// page's media box and y growing downwards, so `y0` is the top edge.
/// The constructor normalizes swapped corners, which keeps `x0 <= x1` and
/// `y0 <= y1` for every box built through it.
///
/// Serialized as `[x0, y0, x1, y1]`, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl BBox {
    /// Create a box from two corners, in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Area of the box.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Center point `(x, y)`.
    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Whether every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Overlapping region, if the boxes overlap with a positive area.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x0 < x1 && y0 < y1 {
            Some(BBox { x0, y0, x1, y1 })
        } else {
            None
        }
    }

    /// Intersection area divided by the area of the smaller box.
    ///
    /// Returns 0.0 when the boxes do not overlap or one of them is degenerate.
    pub fn overlap_ratio(&self, other: &BBox) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return 0.0;
        }
        self.intersection(other)
            .map(|i| i.area() / smaller)
            .unwrap_or(0.0)
    }

    /// Whether `other` lies inside this box, allowing `tolerance` points of slack
    /// on every side.
    pub fn contains(&self, other: &BBox, tolerance: f32) -> bool {
        other.x0 >= self.x0 - tolerance
            && other.y0 >= self.y0 - tolerance
            && other.x1 <= self.x1 + tolerance
            && other.y1 <= self.y1 + tolerance
    }

    /// Whether the point lies inside the box (edges included).
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Whether the boxes share any horizontal extent.
    pub fn overlaps_horizontally(&self, other: &BBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1
    }

    /// Copy of the box with coordinates rounded to two decimals.
    pub fn rounded(&self) -> BBox {
        BBox {
            x0: round2(self.x0),
            y0: round2(self.y0),
            x1: round2(self.x1),
            y1: round2(self.y1),
        }
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        let r = b.rounded();
        [r.x0, r.y0, r.x1, r.y1]
    }
}

/// Round to two decimals.
pub(crate) fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}
