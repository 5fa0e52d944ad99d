//! In-memory PDF fixtures for integration tests.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// Content stream snippet drawing `text` with its baseline at `(x, y)`.
pub fn text(x: f32, y: f32, size: f32, text: &str) -> String {
    format!("BT /F1 {} Tf {} {} Td ({}) Tj ET\n", size, x, y, text)
}

/// Stroked horizontal rule.
pub fn hline(y: f32, x0: f32, x1: f32) -> String {
    format!("{} {} m {} {} l S\n", x0, y, x1, y)
}

/// Stroked vertical rule.
pub fn vline(x: f32, y0: f32, y1: f32) -> String {
    format!("{} {} m {} {} l S\n", x, y0, x, y1)
}

enum PageKind {
    Content(Vec<u8>),
    /// `Contents` points at a dictionary instead of a stream
    Broken,
}

/// Builds letter-sized PDFs with a Helvetica font named `/F1`.
pub struct PdfBuilder {
    pages: Vec<PageKind>,
    title: Option<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            title: None,
        }
    }

    pub fn page(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.pages.push(PageKind::Content(content.into()));
        self
    }

    pub fn broken_page(mut self) -> Self {
        self.pages.push(PageKind::Broken);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut page_ids = Vec::new();
        for kind in &self.pages {
            let contents = match kind {
                PageKind::Content(bytes) => {
                    let stream = Stream::new(dictionary! {}, bytes.clone());
                    Object::Reference(doc.add_object(stream))
                }
                PageKind::Broken => Object::Dictionary(dictionary! { "Foo" => Object::Integer(1) }),
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
                "Contents" => contents,
                "Resources" => dictionary! {
                    "Font" => dictionary! {
                        "F1" => Object::Reference(font_id),
                    },
                },
            });
            page_ids.push(page_id);
        }

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => Object::Integer(page_ids.len() as i64),
        });

        for page_id in &page_ids {
            if let Ok(page_obj) = doc.get_object_mut(*page_id) {
                if let Ok(dict) = page_obj.as_dict_mut() {
                    dict.set("Parent", Object::Reference(pages_id));
                }
            }
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        if let Some(title) = &self.title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title.as_str()),
                "Producer" => Object::string_literal("pdfstruct tests"),
            });
            doc.trailer.set("Info", Object::Reference(info_id));
        }

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}

/// One page with "Hello World".
pub fn hello_world() -> Vec<u8> {
    PdfBuilder::new()
        .page(text(72.0, 720.0, 12.0, "Hello World"))
        .build()
}

/// One page with a ruled 2x3 table, optionally with a caption above it.
pub fn ruled_table(caption: bool) -> Vec<u8> {
    let mut content = String::from("1 w\n");
    for y in [700.0, 680.0, 660.0] {
        content.push_str(&hline(y, 100.0, 400.0));
    }
    for x in [100.0, 200.0, 300.0, 400.0] {
        content.push_str(&vline(x, 700.0, 660.0));
    }
    for (x, a, n) in [(110.0, "A", "1"), (210.0, "B", "2"), (310.0, "C", "3")] {
        content.push_str(&text(x, 686.0, 10.0, a));
        content.push_str(&text(x, 666.0, 10.0, n));
    }
    if caption {
        content.push_str(&text(100.0, 720.0, 10.0, "Table 1: Results"));
    }
    PdfBuilder::new().page(content).build()
}
