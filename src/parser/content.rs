//! Content stream interpretation.
//!
//! Walks a page's content operators and produces positioned text spans and
//! axis-aligned ruling segments. Every coordinate leaving this module uses
//! the top-left page origin of [`BBox`].

use std::collections::{BTreeMap, HashMap};

use lopdf::{content::Content, Dictionary, Document, Object};

use super::loader::PageHandle;
use crate::error::{Error, Result};
use crate::model::BBox;

/// TJ adjustments larger than this (in thousandths of an em) become a space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Glyph width used when a font has no metrics, in em.
const FALLBACK_GLYPH_WIDTH: f32 = 0.5;

/// Nesting limit for `q` operators.
const MAX_STATE_DEPTH: usize = 64;

/// A run of text drawn by one show operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Decoded text
    pub text: String,
    /// Left edge
    pub x: f32,
    /// Baseline, measured from the top of the page
    pub y: f32,
    /// Advance width of the run
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
    /// Base font name (e.g., "Helvetica")
    pub font_name: String,
}

impl TextSpan {
    /// Create a new span.
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, font_size: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            font_size,
            font_name: String::new(),
        }
    }

    /// Set the font name.
    pub fn with_font_name(mut self, name: impl Into<String>) -> Self {
        self.font_name = name.into();
        self
    }

    /// Approximate top of the glyphs (ascender).
    pub fn top(&self) -> f32 {
        self.y - self.font_size * 0.8
    }

    /// Approximate bottom of the glyphs (descender).
    pub fn bottom(&self) -> f32 {
        self.y + self.font_size * 0.2
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bounds of the span.
    pub fn bbox(&self) -> BBox {
        BBox::new(self.x, self.top(), self.right(), self.bottom())
    }

    /// Center point of the span's bounds.
    pub fn center(&self) -> (f32, f32) {
        self.bbox().center()
    }
}

/// Direction of a ruling segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned line drawn on the page.
///
/// Horizontal segments have `y0 == y1`, vertical ones `x0 == x1`, and the
/// coordinates are ordered so that `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub orientation: Orientation,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Segment {
    /// Horizontal segment at `y` spanning `x0..x1`.
    pub fn horizontal(y: f32, x0: f32, x1: f32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            x0: x0.min(x1),
            y0: y,
            x1: x0.max(x1),
            y1: y,
        }
    }

    /// Vertical segment at `x` spanning `y0..y1`.
    pub fn vertical(x: f32, y0: f32, y1: f32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            x0: x,
            y0: y0.min(y1),
            x1: x,
            y1: y0.max(y1),
        }
    }

    /// Length along the segment's direction.
    pub fn length(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.y1 - self.y0,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    pub fn is_vertical(&self) -> bool {
        self.orientation == Orientation::Vertical
    }

    /// Classify a straight line between two points. Returns `None` for
    /// diagonal or degenerate lines.
    fn from_points(a: (f32, f32), b: (f32, f32)) -> Option<Self> {
        let dx = (b.0 - a.0).abs();
        let dy = (b.1 - a.1).abs();
        if dy <= 1.0 && dx > 1.0 {
            Some(Segment::horizontal((a.1 + b.1) / 2.0, a.0, b.0))
        } else if dx <= 1.0 && dy > 1.0 {
            Some(Segment::vertical((a.0 + b.0) / 2.0, a.1, b.1))
        } else {
            None
        }
    }
}

/// Everything the extractors need to know about one page.
#[derive(Debug, Clone, Default)]
pub struct PageGeometry {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Text spans in content stream order
    pub spans: Vec<TextSpan>,
    /// Ruling segments
    pub segments: Vec<Segment>,
}

impl PageGeometry {
    /// Create an empty page of the given size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Add a span.
    pub fn with_span(mut self, span: TextSpan) -> Self {
        self.spans.push(span);
        self
    }

    /// Add a segment.
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Copy of the page keeping only spans whose center lies outside all
    /// of `regions`.
    pub fn retain_spans_outside(&self, regions: &[BBox]) -> PageGeometry {
        let spans = self
            .spans
            .iter()
            .filter(|s| {
                let (cx, cy) = s.center();
                !regions.iter().any(|r| r.contains_point(cx, cy))
            })
            .cloned()
            .collect();
        PageGeometry {
            width: self.width,
            height: self.height,
            spans,
            segments: self.segments.clone(),
        }
    }

    /// Whether the page has neither text nor rulings.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.segments.is_empty()
    }
}

/// Interpret a page's content streams.
pub fn interpret_page(doc: &Document, page: &PageHandle) -> Result<PageGeometry> {
    let text_error = |message: String| Error::TextExtraction {
        page: page.number,
        message,
    };

    let data = page_content(doc, page).map_err(text_error)?;

    let mut geometry = PageGeometry::new(page.width(), page.height());
    if data.is_empty() {
        return Ok(geometry);
    }

    let content = Content::decode(&data).map_err(|e| text_error(e.to_string()))?;

    let fonts = match doc.get_page_fonts(page.id) {
        Ok(fonts) => fonts,
        Err(e) => {
            log::warn!("Page {}: cannot read fonts: {}", page.number, e);
            BTreeMap::new()
        }
    };
    let metrics: HashMap<Vec<u8>, FontMetrics> = fonts
        .iter()
        .map(|(name, dict)| (name.clone(), FontMetrics::from_dict(doc, dict)))
        .collect();

    let mut interpreter = Interpreter {
        doc,
        fonts: &fonts,
        metrics: &metrics,
        media_box: page.media_box,
        state: GraphicsState::default(),
        stack: Vec::new(),
        text_matrix: Matrix::IDENTITY,
        line_matrix: Matrix::IDENTITY,
        path: PathBuilder::default(),
        geometry: &mut geometry,
    };

    for op in &content.operations {
        interpreter.apply(&op.operator, &op.operands);
    }

    log::debug!(
        "Page {}: {} spans, {} segments",
        page.number,
        geometry.spans.len(),
        geometry.segments.len()
    );

    Ok(geometry)
}

/// Concatenated, decompressed content of a page. Empty when the page has
/// no `Contents` entry.
fn page_content(doc: &Document, page: &PageHandle) -> std::result::Result<Vec<u8>, String> {
    let page_dict = doc.get_dictionary(page.id).map_err(|e| e.to_string())?;

    let contents = match page_dict.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    match resolve(doc, contents)? {
        Object::Array(items) => {
            let mut data = Vec::new();
            for item in items {
                data.extend(stream_data(resolve(doc, item)?)?);
                data.push(b'\n');
            }
            Ok(data)
        }
        other => stream_data(other),
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> std::result::Result<&'a Object, String> {
    match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .map_err(|e| format!("unresolvable content reference {:?}: {}", id, e)),
        _ => Ok(obj),
    }
}

fn stream_data(obj: &Object) -> std::result::Result<Vec<u8>, String> {
    match obj {
        Object::Stream(stream) => {
            if stream.dict.get(b"Filter").is_ok() {
                stream
                    .decompressed_content()
                    .map_err(|e| format!("cannot decode content stream: {}", e))
            } else {
                Ok(stream.content.clone())
            }
        }
        other => Err(format!("content is not a stream (found {})", kind_name(other))),
    }
}

/// A 2D affine transform `[a b c d e f]`, applied to row vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        let [a0, b0, c0, d0, e0, f0] = self.0;
        let [a1, b1, c1, d1, e1, f1] = other.0;
        Matrix([
            a0 * a1 + b0 * c1,
            a0 * b1 + b0 * d1,
            c0 * a1 + d0 * c1,
            c0 * b1 + d0 * d1,
            e0 * a1 + f0 * c1 + e1,
            e0 * b1 + f0 * d1 + f1,
        ])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (x * a + y * c + e, x * b + y * d + f)
    }

    /// Length of the transformed unit y vector.
    fn vertical_scale(&self) -> f32 {
        self.0[2].hypot(self.0[3])
    }
}

/// Widths for one font, in thousandths of an em.
#[derive(Debug, Clone)]
struct FontMetrics {
    base_font: String,
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
}

impl FontMetrics {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let two_byte = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| n == b"Type0")
            .unwrap_or(false);

        let mut metrics = Self {
            base_font,
            two_byte,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: FALLBACK_GLYPH_WIDTH * 1000.0,
        };

        if two_byte {
            metrics.read_cid_widths(doc, dict);
        } else {
            metrics.first_char = dict
                .get(b"FirstChar")
                .ok()
                .and_then(|o| number(resolved(doc, o)))
                .map(|n| n.max(0.0) as u32)
                .unwrap_or(0);
            if let Some(Object::Array(ws)) = dict.get(b"Widths").ok().map(|o| resolved(doc, o)) {
                metrics.widths = ws
                    .iter()
                    .map(|w| number(resolved(doc, w)).unwrap_or(0.0))
                    .collect();
            }
        }

        metrics
    }

    fn read_cid_widths(&mut self, doc: &Document, dict: &Dictionary) {
        let descendant = match dict.get(b"DescendantFonts").ok().map(|o| resolved(doc, o)) {
            Some(Object::Array(items)) => items.first().map(|o| resolved(doc, o)),
            _ => None,
        };
        let Some(Object::Dictionary(cid_font)) = descendant else {
            return;
        };

        if let Some(dw) = cid_font.get(b"DW").ok().and_then(|o| number(resolved(doc, o))) {
            self.default_width = dw;
        }

        let Some(Object::Array(w)) = cid_font.get(b"W").ok().map(|o| resolved(doc, o)) else {
            return;
        };

        // Entries are either `c [w1 w2 ...]` or `c_first c_last w`
        let mut i = 0;
        while i < w.len() {
            let Some(start) = number(resolved(doc, &w[i])) else {
                break;
            };
            let start = start.max(0.0) as u32;
            match w.get(i + 1).map(|o| resolved(doc, o)) {
                Some(Object::Array(list)) => {
                    for (offset, width) in list.iter().enumerate() {
                        if let Some(width) = number(resolved(doc, width)) {
                            self.cid_widths.insert(start + offset as u32, width);
                        }
                    }
                    i += 2;
                }
                Some(end) => {
                    let (Some(end), Some(width)) =
                        (number(end), w.get(i + 2).and_then(|o| number(resolved(doc, o))))
                    else {
                        break;
                    };
                    let end = end.max(0.0) as u32;
                    // Guard against absurd ranges in broken files
                    for code in start..=end.min(start.saturating_add(0xFFFF)) {
                        self.cid_widths.insert(code, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    /// Character codes in a string operand.
    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u16::from_be_bytes([*hi, *lo]) as u32,
                    [b] => *b as u32,
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| b as u32).collect()
        }
    }

    /// Glyph width for a code, in thousandths of an em.
    fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            base_font: "Unknown".to_string(),
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: FALLBACK_GLYPH_WIDTH * 1000.0,
        }
    }
}

/// Graphics state saved and restored by `q`/`Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Path under construction, in device space.
#[derive(Debug, Default)]
struct PathBuilder {
    lines: Vec<((f32, f32), (f32, f32))>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
}

impl PathBuilder {
    fn move_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    fn line_to(&mut self, p: (f32, f32)) {
        if let Some(from) = self.current {
            self.lines.push((from, p));
        }
        self.current = Some(p);
    }

    fn curve_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
    }

    fn close(&mut self) {
        if let (Some(from), Some(start)) = (self.current, self.subpath_start) {
            if from != start {
                self.lines.push((from, start));
            }
            self.current = Some(start);
        }
    }

    fn take(&mut self) -> Vec<((f32, f32), (f32, f32))> {
        self.current = None;
        self.subpath_start = None;
        std::mem::take(&mut self.lines)
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>,
    metrics: &'a HashMap<Vec<u8>, FontMetrics>,
    media_box: BBox,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: PathBuilder,
    geometry: &'a mut PageGeometry,
}

impl<'a> Interpreter<'a> {
    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let n = |i: usize| operands.get(i).and_then(number);

        match operator {
            "q" => {
                if self.stack.len() < MAX_STATE_DEPTH {
                    self.stack.push(self.state.clone());
                }
            }
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let (Some(a), Some(b), Some(c), Some(d), Some(e), Some(f)) =
                    (n(0), n(1), n(2), n(3), n(4), n(5))
                {
                    self.state.ctm = Matrix([a, b, c, d, e, f]).then(&self.state.ctm);
                }
            }

            // Text state
            "Tc" => self.state.char_spacing = n(0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = n(0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = n(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.leading = n(0).unwrap_or(0.0),
            "Ts" => self.state.rise = n(0).unwrap_or(0.0),
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.state.font = name.clone();
                }
                if let Some(size) = n(1) {
                    self.state.font_size = size;
                }
            }

            // Text positioning
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Td" => {
                if let (Some(tx), Some(ty)) = (n(0), n(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (n(0), n(1)) {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let (Some(a), Some(b), Some(c), Some(d), Some(e), Some(f)) =
                    (n(0), n(1), n(2), n(3), n(4), n(5))
                {
                    self.line_matrix = Matrix([a, b, c, d, e, f]);
                    self.text_matrix = self.line_matrix;
                }
            }
            "T*" => self.next_line(),

            // Text showing
            "Tj" => {
                if let Some(s @ Object::String(..)) = operands.first() {
                    self.show(std::slice::from_ref(s));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(s @ Object::String(..)) = operands.first() {
                    self.show(std::slice::from_ref(s));
                }
            }
            "\"" => {
                self.state.word_spacing = n(0).unwrap_or(self.state.word_spacing);
                self.state.char_spacing = n(1).unwrap_or(self.state.char_spacing);
                self.next_line();
                if let Some(s @ Object::String(..)) = operands.get(2) {
                    self.show(std::slice::from_ref(s));
                }
            }

            // Path construction
            "m" => {
                if let (Some(x), Some(y)) = (n(0), n(1)) {
                    let p = self.state.ctm.apply(x, y);
                    self.path.move_to(p);
                }
            }
            "l" => {
                if let (Some(x), Some(y)) = (n(0), n(1)) {
                    let p = self.state.ctm.apply(x, y);
                    self.path.line_to(p);
                }
            }
            "c" => {
                if let (Some(x), Some(y)) = (n(4), n(5)) {
                    let p = self.state.ctm.apply(x, y);
                    self.path.curve_to(p);
                }
            }
            "v" | "y" => {
                if let (Some(x), Some(y)) = (n(2), n(3)) {
                    let p = self.state.ctm.apply(x, y);
                    self.path.curve_to(p);
                }
            }
            "re" => {
                if let (Some(x), Some(y), Some(w), Some(h)) = (n(0), n(1), n(2), n(3)) {
                    let ctm = self.state.ctm;
                    self.path.move_to(ctm.apply(x, y));
                    self.path.line_to(ctm.apply(x + w, y));
                    self.path.line_to(ctm.apply(x + w, y + h));
                    self.path.line_to(ctm.apply(x, y + h));
                    self.path.close();
                }
            }
            "h" => self.path.close(),

            // Path painting
            "S" | "f" | "F" | "f*" | "B" | "B*" => self.paint(),
            "s" | "b" | "b*" => {
                self.path.close();
                self.paint();
            }
            "n" => {
                self.path.take();
            }

            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    /// Device-space origin of the next glyph.
    fn glyph_origin(&self) -> (f32, f32) {
        let trm = Matrix::translation(0.0, self.state.rise)
            .then(&self.text_matrix)
            .then(&self.state.ctm);
        trm.apply(0.0, 0.0)
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    /// Show a run of strings and TJ adjustments as one span.
    fn show(&mut self, items: &[Object]) {
        let fallback = FontMetrics::default();
        let all_metrics: &'a HashMap<Vec<u8>, FontMetrics> = self.metrics;
        let fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary> = self.fonts;
        let metrics = all_metrics.get(&self.state.font).unwrap_or(&fallback);
        let font_dict = fonts.get(&self.state.font).copied();

        let fs = self.state.font_size;
        let th = self.state.horizontal_scale;
        let start = self.glyph_origin();
        let size = fs.abs() * self.text_matrix.then(&self.state.ctm).vertical_scale();

        let mut text = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    text.push_str(&self.decode(font_dict, bytes));
                    for code in metrics.codes(bytes) {
                        let w0 = metrics.width(code) / 1000.0;
                        let mut tx = w0 * fs + self.state.char_spacing;
                        if !metrics.two_byte && code == 32 {
                            tx += self.state.word_spacing;
                        }
                        self.advance(tx * th);
                    }
                }
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = number(item).unwrap_or(0.0);
                    self.advance(-adjustment / 1000.0 * fs * th);
                    if -adjustment > TJ_SPACE_THRESHOLD {
                        push_word_space(&mut text);
                    }
                }
                _ => {}
            }
        }

        if text.trim().is_empty() {
            return;
        }

        let end = self.glyph_origin();
        let width = (end.0 - start.0).hypot(end.1 - start.1);
        let (x, y) = self.to_page(start);

        self.geometry.spans.push(
            TextSpan::new(text, x, y, width, size).with_font_name(metrics.base_font.clone()),
        );
    }

    fn decode(&self, font: Option<&Dictionary>, bytes: &[u8]) -> String {
        if let Some(dict) = font {
            if let Ok(encoding) = dict.get_font_encoding(self.doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn paint(&mut self) {
        for (a, b) in self.path.take() {
            let a = self.to_page(a);
            let b = self.to_page(b);
            if let Some(segment) = Segment::from_points(a, b) {
                self.geometry.segments.push(segment);
            }
        }
    }

    /// Device space to top-left page space.
    fn to_page(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (x - self.media_box.x0, self.media_box.y1 - y)
    }
}

fn push_word_space(text: &mut String) {
    match text.chars().last() {
        Some(c) if c == ' ' || c == '\u{00A0}' || is_spaceless_script_char(c) => {}
        Some(_) => text.push(' '),
        None => {}
    }
}

fn kind_name(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) | Object::Real(_) => "number",
        Object::Name(_) => "name",
        Object::String(..) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
    }
}

fn resolved<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Helper to extract number from PDF object.
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2EBEF
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x3000..=0x303F)
}

/// Decoding fallback when the font has no usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn single_page(content: &str) -> (Document, PageHandle) {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        let handle = PageHandle {
            number: 1,
            id: page_id,
            media_box: BBox::new(0.0, 0.0, 612.0, 792.0),
        };
        (doc, handle)
    }

    // ==================== Matrix Tests ====================

    #[test]
    fn test_matrix_then() {
        let scale = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let shift = Matrix::translation(10.0, 5.0);
        // Scale first, then translate
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        // Translate first, then scale
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    // ==================== Text Tests ====================

    #[test]
    fn test_simple_text_span() {
        let (doc, page) = single_page("BT /F1 12 Tf 72 720 Td (Hello) Tj ET");
        let geom = interpret_page(&doc, &page).unwrap();

        assert_eq!(geom.spans.len(), 1);
        let span = &geom.spans[0];
        assert_eq!(span.text, "Hello");
        assert!((span.x - 72.0).abs() < 0.01);
        assert!((span.y - 72.0).abs() < 0.01);
        assert!((span.font_size - 12.0).abs() < 0.01);
        // Five glyphs at the fallback width of half an em
        assert!((span.width - 30.0).abs() < 0.01);
        assert_eq!(span.font_name, "Helvetica");
    }

    #[test]
    fn test_tj_array_inserts_word_space() {
        let (doc, page) = single_page("BT /F1 10 Tf 100 700 Td [(Hello) -300 (World)] TJ ET");
        let geom = interpret_page(&doc, &page).unwrap();
        assert_eq!(geom.spans.len(), 1);
        assert_eq!(geom.spans[0].text, "Hello World");
        // 10 glyphs * 5pt + 3pt adjustment
        assert!((geom.spans[0].width - 53.0).abs() < 0.01);
    }

    #[test]
    fn test_leading_and_next_line() {
        let (doc, page) = single_page("BT /F1 10 Tf 14 TL 50 700 Td (One) Tj T* (Two) Tj ET");
        let geom = interpret_page(&doc, &page).unwrap();
        assert_eq!(geom.spans.len(), 2);
        assert!((geom.spans[1].y - geom.spans[0].y - 14.0).abs() < 0.01);
        assert!((geom.spans[1].x - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_ctm_scales_font_size() {
        let (doc, page) = single_page("q 2 0 0 2 0 0 cm BT /F1 10 Tf 10 10 Td (Big) Tj ET Q");
        let geom = interpret_page(&doc, &page).unwrap();
        assert!((geom.spans[0].font_size - 20.0).abs() < 0.01);
        assert!((geom.spans[0].x - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_whitespace_only_span_skipped() {
        let (doc, page) = single_page("BT /F1 10 Tf 10 10 Td (   ) Tj ET");
        let geom = interpret_page(&doc, &page).unwrap();
        assert!(geom.spans.is_empty());
    }

    // ==================== Path Tests ====================

    #[test]
    fn test_stroked_lines_become_segments() {
        let (doc, page) = single_page("100 700 m 400 700 l S 100 700 m 100 600 l S 0 0 m 50 50 l S");
        let geom = interpret_page(&doc, &page).unwrap();
        assert_eq!(geom.segments.len(), 2);
        assert_eq!(geom.segments[0], Segment::horizontal(92.0, 100.0, 400.0));
        assert_eq!(geom.segments[1], Segment::vertical(100.0, 92.0, 192.0));
    }

    #[test]
    fn test_rectangle_edges() {
        let (doc, page) = single_page("100 600 200 100 re S");
        let geom = interpret_page(&doc, &page).unwrap();
        assert_eq!(geom.segments.len(), 4);
        assert_eq!(geom.segments.iter().filter(|s| s.is_horizontal()).count(), 2);
        assert_eq!(geom.segments.iter().filter(|s| s.is_vertical()).count(), 2);
    }

    #[test]
    fn test_discarded_path_ignored() {
        let (doc, page) = single_page("100 700 m 400 700 l n");
        let geom = interpret_page(&doc, &page).unwrap();
        assert!(geom.segments.is_empty());
    }

    // ==================== Helper Tests ====================

    #[test]
    fn test_retain_spans_outside() {
        let geom = PageGeometry::new(612.0, 792.0)
            .with_span(TextSpan::new("in", 110.0, 110.0, 10.0, 10.0))
            .with_span(TextSpan::new("out", 10.0, 10.0, 10.0, 10.0));
        let kept = geom.retain_spans_outside(&[BBox::new(100.0, 100.0, 200.0, 200.0)]);
        assert_eq!(kept.spans.len(), 1);
        assert_eq!(kept.spans[0].text, "out");
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"abc"), "abc");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41]), "A");
        assert_eq!(decode_text_simple(&[0xE9]), "\u{e9}");
    }

    #[test]
    fn test_is_spaceless_script_char() {
        assert!(is_spaceless_script_char('中'));
        assert!(is_spaceless_script_char('あ'));
        assert!(!is_spaceless_script_char('한'));
        assert!(!is_spaceless_script_char('a'));
    }
}
