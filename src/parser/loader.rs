//! Document loading.
//!
//! A [`LoadedDocument`] owns the parsed PDF for the lifetime of one
//! extraction call. Page workers hold cheap clones of it; the underlying
//! document is released when the last clone is dropped.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::content::{interpret_page, number, PageGeometry};
use crate::detect::{detect_format_from_bytes, PdfFormat};
use crate::error::{Error, Result};
use crate::model::{BBox, Metadata};

/// US Letter, used when a page has no usable media box.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Limit when walking `Parent` links for inherited attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A page reference resolved at load time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageHandle {
    /// 1-based page number
    pub number: u32,
    /// Page object id
    pub id: ObjectId,
    /// Media box in PDF user space (origin bottom-left)
    pub media_box: BBox,
}

impl PageHandle {
    /// Page width in points.
    pub fn width(&self) -> f32 {
        self.media_box.width()
    }

    /// Page height in points.
    pub fn height(&self) -> f32 {
        self.media_box.height()
    }
}

#[derive(Debug)]
struct SharedDocument {
    doc: LopdfDocument,
    source: String,
    format: PdfFormat,
    pages: Vec<PageHandle>,
    metadata: Metadata,
}

impl Drop for SharedDocument {
    fn drop(&mut self) {
        log::debug!("Releasing document {}", self.source);
    }
}

/// An opened PDF, shared read-only between page workers.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    shared: Arc<SharedDocument>,
}

impl LoadedDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        Self::from_bytes(&data, path.display().to_string())
    }

    /// Parse a PDF from bytes. `source` names the document in results and logs.
    pub fn from_bytes(data: &[u8], source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let format = detect_format_from_bytes(data)?;

        let doc = LopdfDocument::load_mem(data).map_err(Error::from)?;

        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }

        let pages: Vec<PageHandle> = doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| PageHandle {
                number,
                id,
                media_box: media_box(&doc, id),
            })
            .collect();

        if pages.is_empty() {
            return Err(Error::DocumentOpen("document has no pages".to_string()));
        }

        let metadata = read_metadata(&doc, &format);

        log::debug!(
            "Opened {} ({}, {} pages)",
            source,
            format,
            pages.len()
        );

        Ok(Self {
            shared: Arc::new(SharedDocument {
                doc,
                source,
                format,
                pages,
                metadata,
            }),
        })
    }

    /// Parse a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R, source: impl Into<String>) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data, source)
    }

    /// Source identifier.
    pub fn source(&self) -> &str {
        &self.shared.source
    }

    /// Header information.
    pub fn format(&self) -> &PdfFormat {
        &self.shared.format
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.shared.pages.len()
    }

    /// Page handles in page order.
    pub fn pages(&self) -> &[PageHandle] {
        &self.shared.pages
    }

    /// Document metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.shared.metadata
    }

    /// The underlying lopdf document.
    pub fn inner(&self) -> &LopdfDocument {
        &self.shared.doc
    }

    /// Interpret the page at 0-based `index`.
    pub fn page_geometry(&self, index: usize) -> Result<PageGeometry> {
        let page = self.shared.pages.get(index).ok_or_else(|| Error::TextExtraction {
            page: index as u32 + 1,
            message: format!(
                "page index {} out of range ({} pages)",
                index,
                self.page_count()
            ),
        })?;
        interpret_page(&self.shared.doc, page)
    }
}

/// Media box of a page, inherited through the page tree.
fn media_box(doc: &LopdfDocument, page_id: ObjectId) -> BBox {
    let mut current = doc.get_dictionary(page_id).ok();
    let mut depth = 0;

    while let Some(dict) = current {
        if let Some(found) = dict.get(b"MediaBox").ok().and_then(|o| rect(doc, o)) {
            return found;
        }
        depth += 1;
        if depth > MAX_INHERITANCE_DEPTH {
            break;
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok());
    }

    BBox::from(DEFAULT_MEDIA_BOX)
}

fn rect(doc: &LopdfDocument, obj: &Object) -> Option<BBox> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        _ => obj,
    };
    let values: Vec<f32> = obj.as_array().ok()?.iter().filter_map(number).collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => {
            let b = BBox::new(*x0, *y0, *x1, *y1);
            (b.width() > 0.0 && b.height() > 0.0).then_some(b)
        }
        _ => None,
    }
}

fn read_metadata(doc: &LopdfDocument, format: &PdfFormat) -> Metadata {
    let version = if doc.version.is_empty() {
        format.version.clone()
    } else {
        doc.version.to_string()
    };
    let mut metadata = Metadata::with_version(version);

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|o| match o {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        });

    if let Some(info) = info {
        metadata.title = info_string(info, b"Title");
        metadata.author = info_string(info, b"Author");
        metadata.subject = info_string(info, b"Subject");
        metadata.creator = info_string(info, b"Creator");
        metadata.producer = info_string(info, b"Producer");
        metadata.created = info_string(info, b"CreationDate").and_then(|s| parse_pdf_date(&s));
        metadata.modified = info_string(info, b"ModDate").and_then(|s| parse_pdf_date(&s));
    }

    metadata
}

/// Text string from the info dictionary; empty values count as absent.
fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let text = match dict.get(key).ok()? {
        Object::String(bytes, _) => match bytes.as_slice() {
            [0xFE, 0xFF, rest @ ..] => {
                let utf16: Vec<u16> = rest
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16_lossy(&utf16)
            }
            _ => match std::str::from_utf8(bytes) {
                Ok(s) => s.to_string(),
                Err(_) => bytes.iter().map(|&b| b as char).collect(),
            },
        },
        Object::Name(bytes) => String::from_utf8_lossy(bytes).to_string(),
        _ => return None,
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let field = |range: std::ops::Range<usize>, default: u32| -> u32 {
        s.get(range).and_then(|v| v.parse().ok()).unwrap_or(default)
    };
    let month = field(4..6, 1);
    let day = field(6..8, 1);
    let hour = field(8..10, 0);
    let minute = field(10..12, 0);
    let second = field(12..14, 0);

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    // Offset suffix: Z, or +HH'mm / -HH'mm
    let offset_secs = match s.get(14..15) {
        Some(sign @ ("+" | "-")) => {
            let hh: i64 = s.get(15..17).and_then(|v| v.parse().ok()).unwrap_or(0);
            let mm: i64 = s
                .get(18..20)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let secs = hh * 3600 + mm * 60;
            if sign == "+" {
                secs
            } else {
                -secs
            }
        }
        _ => 0,
    };

    let utc = naive - chrono::Duration::seconds(offset_secs);
    Some(DateTime::from_naive_utc_and_offset(utc, Utc))
}
