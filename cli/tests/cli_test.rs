//! Integration tests for the pdfstruct binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("pdfstruct").unwrap()
}

/// Build a PDF whose pages have the given content streams. `None` makes a
/// page whose `Contents` is not a stream.
fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    use lopdf::{dictionary, Object, Stream};

    let mut doc = lopdf::Document::with_version("1.5");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for page in pages {
        let contents = match page {
            Some(content) => Object::Reference(
                doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec())),
            ),
            None => Object::Dictionary(dictionary! { "Bogus" => Object::Integer(1) }),
        };
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ];
        kids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => media_box,
            "Contents" => contents,
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => Object::Reference(font_id),
                },
            },
        }));
    }

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "Count" => Object::Integer(kids.len() as i64),
    });

    for id in &kids {
        if let Ok(page_obj) = doc.get_object_mut(*id) {
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

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

const HELLO: &str = "BT /F1 12 Tf 72 720 Td (Hello World) Tj ET";

const TABLE: &str = "
    100 700 m 400 700 l S
    100 680 m 400 680 l S
    100 660 m 400 660 l S
    100 700 m 100 660 l S
    200 700 m 200 660 l S
    300 700 m 300 660 l S
    400 700 m 400 660 l S
    BT /F1 10 Tf 110 686 Td (A) Tj ET
    BT /F1 10 Tf 210 686 Td (B) Tj ET
    BT /F1 10 Tf 310 686 Td (C) Tj ET
    BT /F1 10 Tf 110 666 Td (1) Tj ET
    BT /F1 10 Tf 210 666 Td (2) Tj ET
    BT /F1 10 Tf 310 666 Td (3) Tj ET
";

fn write_pdf(dir: &Path, name: &str, pages: &[Option<&str>]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, build_pdf(pages)).unwrap();
    path
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ==================== Extraction ====================

#[test]
fn test_writes_json_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "hello.pdf", &[Some(HELLO)]);

    cmd()
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved to"));

    let json = read_json(&dir.path().join("hello.json"));
    assert_eq!(json["page_count"], 1);
    assert_eq!(json["pages"][0]["page_index"], 0);
    assert_eq!(json["pages"][0]["content"][0]["type"], "text");
    assert_eq!(json["pages"][0]["content"][0]["text"], "Hello World");
}

#[test]
fn test_output_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", &[Some(HELLO)]);
    let out = dir.path().join("out").join("nested");

    cmd().arg(&pdf).arg("-o").arg(&out).assert().success();

    assert!(out.join("doc.json").is_file());
}

#[test]
fn test_output_json_path() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", &[Some(TABLE)]);
    let out = dir.path().join("result.json");

    cmd()
        .args(["extract", pdf.to_str().unwrap(), "--output", out.to_str().unwrap()])
        .assert()
        .success();

    let json = read_json(&out);
    let table = &json["pages"][0]["content"][0];
    assert_eq!(table["type"], "table");
    assert_eq!(table["rows"], serde_json::json!([["A", "B", "C"], ["1", "2", "3"]]));
}

#[test]
fn test_stdout_compact() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", &[Some(HELLO)]);

    let output = cmd()
        .arg(&pdf)
        .args(["--stdout", "--compact"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim().lines().count(), 1);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(json["pages"][0]["content"][0]["text"], "Hello World");
    assert!(json.get("extracted_at").is_none());
    assert!(!dir.path().join("doc.json").exists());
}

#[test]
fn test_timestamp_flag() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", &[Some(HELLO)]);

    cmd()
        .arg(&pdf)
        .args(["--stdout", "--timestamp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"extracted_at\""))
        .stdout(predicate::str::contains("\"metadata\""));
}

// ==================== Failures ====================

#[test]
fn test_corrupted_file_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("broken.pdf");
    fs::write(&pdf, b"%PDF-1.4\nnot really a pdf").unwrap();

    cmd()
        .arg(&pdf)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));

    assert!(!dir.path().join("broken.json").exists());
}

#[test]
fn test_missing_file() {
    cmd()
        .arg("/nonexistent/input.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_failed_page_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "mixed.pdf", &[Some(HELLO), None]);

    cmd()
        .arg(&pdf)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("page 2"));

    assert!(!dir.path().join("mixed.json").exists());
}

#[test]
fn test_failed_page_collect_is_partial() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "mixed.pdf", &[Some(HELLO), None, Some(HELLO)]);

    cmd()
        .arg(&pdf)
        .arg("--collect")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("1 of 3 pages failed"));

    let json = read_json(&dir.path().join("mixed.json"));
    assert_eq!(json["pages"][1]["error"]["kind"], "text_extraction");
    assert_eq!(json["pages"][2]["content"][0]["text"], "Hello World");
}

#[test]
fn test_invalid_option_value() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", &[Some(HELLO)]);

    cmd()
        .arg(&pdf)
        .args(["--overlap", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_timeout_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", &[Some(HELLO)]);

    for value in ["inf", "1e300"] {
        cmd()
            .arg(&pdf)
            .args(["--timeout", value])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid configuration"));
    }
    assert!(!dir.path().join("doc.json").exists());
}

// ==================== Other Commands ====================

#[test]
fn test_info() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", &[Some(HELLO), Some(TABLE)]);

    cmd()
        .arg("info")
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("Pages"))
        .stdout(predicate::str::contains("2"))
        .stdout(predicate::str::contains("PDF 1.5"));
}

#[test]
fn test_version() {
    cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pdfstruct"));
}
