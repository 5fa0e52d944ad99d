//! End-to-end extraction tests on generated PDFs.

mod common;

use std::io::Write;

use common::{hline, text, vline, PdfBuilder};
use pdfstruct::render::{to_json, JsonFormat};
use pdfstruct::{
    extract_bytes, extract_file, CancellationToken, ContentItem, Error, ExtractOptions,
    Extractor, TableStrategyKind,
};

fn texts(items: &[ContentItem]) -> Vec<&str> {
    items
        .iter()
        .filter_map(|i| i.as_text())
        .map(|b| b.text.as_str())
        .collect()
}

// ==================== Text Tests ====================

#[test]
fn test_hello_world() {
    let result = extract_bytes(&common::hello_world(), "hello.pdf", &ExtractOptions::default())
        .unwrap();

    assert_eq!(result.source, "hello.pdf");
    assert_eq!(result.page_count, 1);
    assert_eq!(result.pages.len(), 1);

    let content = result.pages[0].content_items();
    assert_eq!(content.len(), 1);
    let block = content[0].as_text().expect("text entry");
    assert_eq!(block.text, "Hello World");
    assert!((block.bbox.x0 - 72.0).abs() < 0.01);
    // Baseline at 720 in PDF space is 72 from the top
    assert!(block.bbox.y0 < 72.0 && block.bbox.y1 > 72.0);
}

#[test]
fn test_blank_page() {
    let pdf = PdfBuilder::new().page("").build();
    let result = extract_bytes(&pdf, "blank.pdf", &ExtractOptions::default()).unwrap();
    assert_eq!(result.page_count, 1);
    assert!(result.pages[0].content_items().is_empty());
    assert!(!result.pages[0].is_error());

    let json = to_json(&result, JsonFormat::Compact).unwrap();
    assert!(json.contains(r#""content":[]"#));
}

#[test]
fn test_paragraphs_are_separate_blocks() {
    let mut content = String::new();
    content.push_str(&text(72.0, 720.0, 12.0, "First paragraph line one"));
    content.push_str(&text(72.0, 706.0, 12.0, "first paragraph line two"));
    content.push_str(&text(72.0, 600.0, 12.0, "Second paragraph"));
    let pdf = PdfBuilder::new().page(content).build();

    let result = extract_bytes(&pdf, "paras.pdf", &ExtractOptions::default()).unwrap();
    assert_eq!(
        texts(result.pages[0].content_items()),
        vec![
            "First paragraph line one first paragraph line two",
            "Second paragraph"
        ]
    );
}

// ==================== Table Tests ====================

#[test]
fn test_ruled_table() {
    let result =
        extract_bytes(&common::ruled_table(false), "table.pdf", &ExtractOptions::default())
            .unwrap();

    let content = result.pages[0].content_items();
    assert_eq!(content.len(), 1, "cell text must not repeat as prose");
    let table = content[0].as_table().expect("table entry");
    assert_eq!(table.rows, vec![vec!["A", "B", "C"], vec!["1", "2", "3"]]);
    assert!((table.bbox.x0 - 100.0).abs() < 0.01);
    assert!((table.bbox.y0 - 92.0).abs() < 0.01);
    assert!((table.bbox.x1 - 400.0).abs() < 0.01);
    assert!((table.bbox.y1 - 132.0).abs() < 0.01);
}

#[test]
fn test_caption_precedes_table() {
    let result =
        extract_bytes(&common::ruled_table(true), "caption.pdf", &ExtractOptions::default())
            .unwrap();

    let content = result.pages[0].content_items();
    assert_eq!(content.len(), 2);
    assert_eq!(content[0].as_text().unwrap().text, "Table 1: Results");
    assert_eq!(
        content[1].as_table().unwrap().rows,
        vec![vec!["A", "B", "C"], vec!["1", "2", "3"]]
    );
}

#[test]
fn test_whitespace_table() {
    let rows = [
        ["Name", "Qty", "Price"],
        ["Apple", "3", "1.20"],
        ["Banana", "12", "0.50"],
        ["Cherry", "7", "4.00"],
    ];
    let mut content = String::new();
    for (i, row) in rows.iter().enumerate() {
        let y = 700.0 - 20.0 * i as f32;
        for (x, cell) in [100.0, 250.0, 400.0].iter().zip(row) {
            content.push_str(&text(*x, y, 10.0, cell));
        }
    }
    let pdf = PdfBuilder::new().page(content).build();

    for strategy in [TableStrategyKind::Auto, TableStrategyKind::WhitespaceBased] {
        let options = ExtractOptions::new().with_table_strategy(strategy);
        let result = extract_bytes(&pdf, "stream.pdf", &options).unwrap();
        let content = result.pages[0].content_items();
        assert_eq!(content.len(), 1, "{:?}", strategy);
        assert_eq!(content[0].as_table().unwrap().rows, rows);
    }

    // Line detection alone finds nothing and leaves the text as prose
    let options = ExtractOptions::new().with_table_strategy(TableStrategyKind::LineBased);
    let result = extract_bytes(&pdf, "stream.pdf", &options).unwrap();
    assert!(result.pages[0]
        .content_items()
        .iter()
        .all(|i| i.as_table().is_none()));
}

#[test]
fn test_two_column_prose_is_not_a_table() {
    let left = [
        "The quick brown fox jumps over",
        "the lazy dog while the farmer",
        "watches from behind the old",
        "wooden fence near the red barn",
        "and the sun sets slowly over",
        "the quiet hills of the valley",
    ];
    let right = [
        "Lorem ipsum dolor sit amet text",
        "consectetur adipiscing elit sed do",
        "eiusmod tempor incididunt ut labore",
        "et dolore magna aliqua ut enim",
        "ad minim veniam quis nostrud",
        "exercitation ullamco laboris nisi",
    ];
    let mut content = String::new();
    for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
        let y = 700.0 - 14.0 * i as f32;
        content.push_str(&text(72.0, y, 10.0, l));
        content.push_str(&text(320.0, y, 10.0, r));
    }
    let pdf = PdfBuilder::new().page(content).build();

    let result = extract_bytes(&pdf, "article.pdf", &ExtractOptions::default()).unwrap();
    let items = result.pages[0].content_items();
    assert!(items.iter().all(|i| i.as_table().is_none()));

    let all_text = texts(items).join(" ");
    assert!(all_text.contains("The quick brown fox jumps over"));
    assert!(all_text.contains("Lorem ipsum dolor sit amet text"));
    assert!(all_text.contains("exercitation ullamco laboris nisi"));
}

#[test]
fn test_merged_cell() {
    let mut content = String::new();
    for y in [700.0, 680.0, 660.0] {
        content.push_str(&hline(y, 100.0, 400.0));
    }
    for x in [100.0, 200.0, 400.0] {
        content.push_str(&vline(x, 700.0, 660.0));
    }
    content.push_str(&vline(300.0, 680.0, 660.0));
    content.push_str(&text(110.0, 686.0, 10.0, "Key"));
    content.push_str(&text(230.0, 686.0, 10.0, "Header"));
    for (x, cell) in [(110.0, "a"), (210.0, "b"), (310.0, "c")] {
        content.push_str(&text(x, 666.0, 10.0, cell));
    }
    let pdf = PdfBuilder::new().page(content).build();

    let result = extract_bytes(&pdf, "merged.pdf", &ExtractOptions::default()).unwrap();
    let table = result.pages[0].content_items()[0].as_table().unwrap();
    assert_eq!(table.rows[0], vec!["Key", "Header", "Header"]);
    assert_eq!(table.rows[1], vec!["a", "b", "c"]);
    assert!(table.rows.iter().all(|r| r.len() == 3));
}

// ==================== Document Tests ====================

#[test]
fn test_page_order_with_many_workers() {
    let mut builder = PdfBuilder::new();
    for i in 1..=20 {
        builder = builder.page(text(72.0, 720.0, 12.0, &format!("Page {}", i)));
    }
    let pdf = builder.build();

    let options = ExtractOptions::new().with_workers(4);
    let result = extract_bytes(&pdf, "many.pdf", &options).unwrap();

    assert_eq!(result.page_count, 20);
    assert_eq!(result.pages.len(), 20);
    for (i, page) in result.pages.iter().enumerate() {
        assert_eq!(page.page_index, i);
        assert_eq!(texts(page.content_items()), vec![format!("Page {}", i + 1)]);
    }
}

#[test]
fn test_output_is_idempotent() {
    let pdf = common::ruled_table(true);
    let options = ExtractOptions::new().with_workers(3);
    let a = extract_bytes(&pdf, "same.pdf", &options).unwrap();
    let b = extract_bytes(&pdf, "same.pdf", &options).unwrap();
    assert_eq!(
        to_json(&a, JsonFormat::Pretty).unwrap(),
        to_json(&b, JsonFormat::Pretty).unwrap()
    );
}

#[test]
fn test_extract_file_uses_path_as_source() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&common::hello_world()).unwrap();

    let result = extract_file(file.path(), &ExtractOptions::default()).unwrap();
    assert_eq!(result.source, file.path().display().to_string());
    assert_eq!(texts(result.pages[0].content_items()), vec!["Hello World"]);
}

#[test]
fn test_metadata() {
    let pdf = PdfBuilder::new()
        .title("Annual Report")
        .page(text(72.0, 720.0, 12.0, "Body"))
        .build();
    let result = extract_bytes(&pdf, "meta.pdf", &ExtractOptions::default()).unwrap();
    assert_eq!(result.metadata.title.as_deref(), Some("Annual Report"));
    assert_eq!(result.metadata.producer.as_deref(), Some("pdfstruct tests"));
    assert_eq!(result.metadata.pdf_version, "1.5");
}

#[test]
fn test_repeated_text_filter() {
    let mut builder = PdfBuilder::new();
    for i in 1..=4 {
        let mut content = text(72.0, 760.0, 9.0, "ACME Confidential");
        content.push_str(&text(72.0, 700.0, 12.0, &format!("Body {}", i)));
        builder = builder.page(content);
    }
    let pdf = builder.build();

    let unfiltered = extract_bytes(&pdf, "headers.pdf", &ExtractOptions::default()).unwrap();
    assert!(unfiltered
        .pages
        .iter()
        .all(|p| texts(p.content_items()).contains(&"ACME Confidential")));

    let options = ExtractOptions::new().with_repeated_text_limit(3);
    let result = extract_bytes(&pdf, "headers.pdf", &options).unwrap();
    assert_eq!(
        texts(result.pages[0].content_items()),
        vec!["ACME Confidential", "Body 1"]
    );
    for (i, page) in result.pages.iter().enumerate().skip(1) {
        assert_eq!(texts(page.content_items()), vec![format!("Body {}", i + 1)]);
    }
}

// ==================== Error Tests ====================

#[test]
fn test_corrupted_input() {
    let err = extract_bytes(
        b"%PDF-1.4\n1 0 obj << /Type /Catalog",
        "broken.pdf",
        &ExtractOptions::default(),
    )
    .unwrap_err();
    assert!(err.is_document_open(), "{:?}", err);

    let err = extract_bytes(b"PK\x03\x04 zip data", "zip.pdf", &ExtractOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFormat));
}

#[test]
fn test_failing_page_fail_fast() {
    let pdf = PdfBuilder::new()
        .page(text(72.0, 720.0, 12.0, "One"))
        .broken_page()
        .page(text(72.0, 720.0, 12.0, "Three"))
        .build();

    let err = extract_bytes(&pdf, "bad.pdf", &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(err, Error::TextExtraction { page: 2, .. }),
        "{:?}",
        err
    );
    assert!(err.is_page_scoped());
}

#[test]
fn test_failing_page_collect() {
    let pdf = PdfBuilder::new()
        .page(text(72.0, 720.0, 12.0, "One"))
        .broken_page()
        .page(text(72.0, 720.0, 12.0, "Three"))
        .build();

    let options = ExtractOptions::new().collect_errors();
    let result = extract_bytes(&pdf, "bad.pdf", &options).unwrap();

    assert_eq!(result.page_count, 3);
    assert!(result.is_partial());
    assert_eq!(texts(result.pages[0].content_items()), vec!["One"]);
    assert_eq!(
        result.pages[1].error_marker().unwrap().kind,
        "text_extraction"
    );
    assert_eq!(texts(result.pages[2].content_items()), vec!["Three"]);

    let json: serde_json::Value =
        serde_json::from_str(&to_json(&result, JsonFormat::Compact).unwrap()).unwrap();
    assert!(json["pages"][1].get("content").is_none());
    assert_eq!(json["pages"][1]["error"]["kind"], "text_extraction");
}

#[test]
fn test_failing_page_collect_single_worker() {
    let pdf = PdfBuilder::new()
        .broken_page()
        .page(text(72.0, 720.0, 12.0, "Two"))
        .page(text(72.0, 720.0, 12.0, "Three"))
        .page(text(72.0, 720.0, 12.0, "Four"))
        .build();

    let options = ExtractOptions::new().sequential().collect_errors();
    let result = extract_bytes(&pdf, "bad.pdf", &options).unwrap();

    assert_eq!(result.failed_pages().count(), 1);
    assert_eq!(
        result.pages[0].error_marker().unwrap().kind,
        "text_extraction"
    );
    assert_eq!(texts(result.pages[1].content_items()), vec!["Two"]);
    assert_eq!(texts(result.pages[2].content_items()), vec!["Three"]);
    assert_eq!(texts(result.pages[3].content_items()), vec!["Four"]);
}

#[test]
fn test_cancelled_before_start() {
    let pdf = PdfBuilder::new()
        .page(text(72.0, 720.0, 12.0, "One"))
        .page(text(72.0, 720.0, 12.0, "Two"))
        .build();

    let token = CancellationToken::new();
    token.cancel();

    let err = Extractor::new()
        .with_cancellation(token.clone())
        .extract_bytes(&pdf, "cancel.pdf")
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let result = Extractor::new()
        .collect_errors()
        .with_cancellation(token)
        .extract_bytes(&pdf, "cancel.pdf")
        .unwrap();
    assert_eq!(result.page_count, 2);
    assert!(result
        .pages
        .iter()
        .all(|p| p.error_marker().map(|e| e.kind.as_str()) == Some("cancelled")));
}

#[test]
fn test_invalid_options() {
    let options = ExtractOptions::new().with_table_overlap_threshold(1.5);
    let err = extract_bytes(&common::hello_world(), "x.pdf", &options).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}
