//! Export tests over real fixtures: Markdown, DOCX and PDF read-back.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use codedoc::export::{self, ExportError, ExportFormat, ExportOptions, Exporter};
use lopdf::content::Content;
use lopdf::{Document as PdfDocument, Encoding};
use quick_xml::events::Event;
use quick_xml::Reader;

fn read_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name);
    std::fs::read_to_string(path).expect("fixture should exist")
}

fn exporter() -> Exporter {
    Exporter::new(ExportOptions {
        title: "Project Docs".to_string(),
        footer: Some("Generated by codedoc".to_string()),
        include_timestamp: false,
        pdf_font: None,
    })
}

/// Paragraph texts of `word/document.xml`, tabs read back as `\t`.
fn docx_paragraphs(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
            Event::Empty(e) if e.local_name().as_ref() == b"tab" => current.push('\t'),
            Event::Text(t) if in_text => current.push_str(&t.unescape().unwrap()),
            Event::End(e) if e.local_name().as_ref() == b"p" => {
                paragraphs.push(std::mem::take(&mut current))
            }
            Event::Eof => break,
            _ => {}
        }
    }
    paragraphs
}

/// Page count and every string shown with `Tj`, decoded through its font.
fn pdf_text(bytes: &[u8]) -> (usize, Vec<String>) {
    let doc = PdfDocument::load_mem(bytes).unwrap();
    let pages = doc.get_pages();
    let mut shown = Vec::new();
    for page_id in pages.values() {
        let encodings: BTreeMap<Vec<u8>, Encoding> = doc
            .get_page_fonts(*page_id)
            .unwrap()
            .into_iter()
            .map(|(name, font)| (name, font.get_font_encoding(&doc).unwrap()))
            .collect();
        let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
        let mut current = None;
        for op in &content.operations {
            match op.operator.as_str() {
                "Tf" => current = encodings.get(op.operands[0].as_name().unwrap()),
                "Tj" => {
                    let raw = op.operands[0].as_str().unwrap();
                    shown.push(PdfDocument::decode_text(current.unwrap(), raw).unwrap());
                }
                _ => {}
            }
        }
    }
    (pages.len(), shown)
}

#[test]
fn test_markdown_embeds_text_verbatim() {
    for name in ["inventory.py", "cart.js", "store.go", "settings.rb"] {
        let text = read_fixture(name);
        let artifact = export::render(&text, name, "markdown").unwrap();
        let md = String::from_utf8(artifact.bytes).unwrap();
        assert!(md.contains(&text), "{}", name);
        assert_eq!(artifact.mime_type, "text/markdown");
    }
}

#[test]
fn test_suggested_filenames() {
    let cases = [
        ("script.py", "docx", "script_documented.docx"),
        ("app.js", "pdf", "app_documented.pdf"),
        ("Account.java", "md", "Account_documented.md"),
        ("polygon.cpp", "markdown", "polygon_documented.md"),
    ];
    for (filename, format, expected) in cases {
        let artifact = export::render("x = 1\n", filename, format).unwrap();
        assert_eq!(artifact.suggested_filename, expected);
    }
}

#[test]
fn test_unsupported_format() {
    let err = export::render("x", "a.py", "html").unwrap_err();
    assert!(matches!(err, ExportError::UnsupportedFormat(ref f) if f == "html"));
    assert!(err.to_string().contains("html"));
}

#[test]
fn test_docx_keeps_every_source_line() {
    let text = read_fixture("store.go");
    let artifact = exporter()
        .render(&text, "store.go", ExportFormat::Docx)
        .unwrap();
    assert_eq!(
        artifact.mime_type,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(artifact.suggested_filename, "store_documented.docx");

    let paragraphs = docx_paragraphs(&artifact.bytes);
    assert_eq!(paragraphs[0], "Project Docs");
    assert!(paragraphs.contains(&"Language: Go".to_string()));
    assert!(paragraphs.contains(&"Documented functions: 2 (67%)".to_string()));

    let start = paragraphs
        .iter()
        .position(|p| p == "Documented Code")
        .unwrap()
        + 1;
    let lines: Vec<&str> = text.lines().collect();
    let code: Vec<&str> = paragraphs[start..start + lines.len()]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(code, lines);
    assert_eq!(paragraphs.last().unwrap(), "Generated by codedoc");
}

#[test]
fn test_pdf_contains_source_and_summary() {
    let text = read_fixture("polygon.cpp");
    let artifact = exporter()
        .render(&text, "polygon.cpp", ExportFormat::Pdf)
        .unwrap();
    assert!(artifact.bytes.starts_with(b"%PDF-"));

    let (pages, shown) = pdf_text(&artifact.bytes);
    assert!(pages >= 1);
    assert_eq!(shown[0], "Project Docs");
    assert!(shown.contains(&"File: polygon.cpp".to_string()));
    assert!(shown.contains(&"Documented functions: 3 (30%)".to_string()));
    assert!(shown.contains(&"double Polygon::area() const {".to_string()));
    assert_eq!(shown.last().unwrap(), "Generated by codedoc");
}

#[test]
fn test_preview_matches_markdown_export() {
    let text = read_fixture("Greeter.php");
    let exporter = exporter();
    let preview = exporter.preview(&text, "Greeter.php").unwrap();
    let artifact = exporter
        .render(&text, "Greeter.php", ExportFormat::Markdown)
        .unwrap();
    assert_eq!(preview.as_bytes(), artifact.bytes.as_slice());
    assert!(preview.starts_with("# Project Docs\n"));
    assert!(preview.contains("```php\n"));
}

#[test]
fn test_summary_reflects_final_text_not_filename_alone() {
    let text = read_fixture("settings.rb");
    let md = exporter().preview(&text, "settings").unwrap();
    assert!(md.contains("**Language:** Ruby"));
    assert!(md.contains("**Functions:** 5"));
}

const MULTILINGUAL: &str = "\
def total(prices):
    \"\"\"Sum prices in \u{20ac} \u{2014} see \u{201c}pricing\u{201d}\u{2026}

    Caf\u{e9} na\u{ef}ve r\u{e9}sum\u{e9} \u{2192} \u{3bb} \u{416}
    \u{5408}\u{8a08}\u{3092}\u{8fd4}\u{3059}
    \"\"\"
\treturn sum(prices)  # \u{2264} 10\u{b0}
";

#[test]
fn test_non_ascii_text_survives_docx_and_pdf() {
    let exporter = exporter();

    let docx = exporter
        .render(MULTILINGUAL, "prices.py", ExportFormat::Docx)
        .unwrap();
    let paragraphs = docx_paragraphs(&docx.bytes);
    for line in MULTILINGUAL.lines() {
        assert!(paragraphs.iter().any(|p| p == line), "docx lost {:?}", line);
    }

    let pdf = exporter
        .render(MULTILINGUAL, "prices.py", ExportFormat::Pdf)
        .unwrap();
    let (_, shown) = pdf_text(&pdf.bytes);
    assert!(shown.contains(&"Documented functions: 1 (100%)".to_string()));
    for line in MULTILINGUAL.lines() {
        let expected = line.replace('\t', "    ");
        assert!(shown.contains(&expected), "pdf lost {:?}", expected);
    }
}
