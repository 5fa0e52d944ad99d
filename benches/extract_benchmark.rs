//! Benchmarks for pdfstruct extraction performance.
//!
//! Run with: cargo bench
//!
//! Documents are generated in memory: every page carries a heading, a
//! paragraph and a ruled 4x3 table.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lopdf::{dictionary, Document, Object, Stream};

/// Content stream for one benchmark page.
fn page_content(page: usize) -> String {
    let mut content = format!(
        "BT /F1 16 Tf 72 740 Td (Section {}) Tj ET\n\
         BT /F1 11 Tf 72 710 Td (Benchmark paragraph text for pdfstruct extraction.) Tj ET\n\
         BT /F1 11 Tf 72 696 Td (A second line that belongs to the same paragraph.) Tj ET\n",
        page
    );
    for row in 0..=4 {
        let y = 640 - row * 20;
        content.push_str(&format!("100 {} m 400 {} l S\n", y, y));
    }
    for x in [100, 200, 300, 400] {
        content.push_str(&format!("{} 640 m {} 560 l S\n", x, x));
    }
    for row in 0..4 {
        for col in 0..3 {
            content.push_str(&format!(
                "BT /F1 10 Tf {} {} Td (r{}c{}) Tj ET\n",
                110 + col * 100,
                626 - row * 20,
                row,
                col
            ));
        }
    }
    content
}

/// Creates a PDF with the given number of pages.
fn create_test_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for i in 0..page_count {
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            page_content(i + 1).into_bytes(),
        ));
        kids.push(doc.add_object(dictionary! {
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
        }));
    }

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "Count" => Object::Integer(page_count as i64),
    });
    for id in &kids {
        if let Ok(dict) = doc.get_object_mut(*id).and_then(Object::as_dict_mut) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save benchmark PDF");
    buf
}

/// Benchmark PDF format detection.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = create_test_pdf(1);
    let non_pdf_data = b"Not a PDF file at all, just random text content";

    c.bench_function("detect_valid_pdf", |b| {
        b.iter(|| pdfstruct::detect_format_from_bytes(black_box(&pdf_data)).unwrap());
    });

    c.bench_function("detect_non_pdf", |b| {
        b.iter(|| pdfstruct::detect_format_from_bytes(black_box(non_pdf_data)).is_err());
    });
}

/// Benchmark extraction at various sizes, sequential and parallel.
fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    for page_count in [1, 10, 50].iter() {
        let data = create_test_pdf(*page_count);

        for workers in [1, 4] {
            let options = pdfstruct::ExtractOptions::new().with_workers(workers);
            group.bench_function(format!("{}_pages_{}_workers", page_count, workers), |b| {
                b.iter(|| {
                    pdfstruct::extract_bytes(black_box(&data), "bench.pdf", &options).unwrap()
                });
            });
        }
    }

    group.finish();
}

/// Benchmark JSON rendering.
fn bench_json(c: &mut Criterion) {
    let data = create_test_pdf(10);
    let result =
        pdfstruct::extract_bytes(&data, "bench.pdf", &pdfstruct::ExtractOptions::default())
            .unwrap();

    c.bench_function("render_json_compact", |b| {
        b.iter(|| {
            pdfstruct::render::to_json(black_box(&result), pdfstruct::JsonFormat::Compact).unwrap()
        });
    });
}

criterion_group!(benches, bench_format_detection, bench_extraction, bench_json);
criterion_main!(benches);
