//! DOCX rendering: a minimal WordprocessingML package.
//!
//! The package holds three parts: `[Content_Types].xml`, `_rels/.rels` and
//! `word/document.xml`. Source lines become one Consolas paragraph each so
//! indentation survives; tabs are written as `<w:tab/>`.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{Document, ExportError, ExportFormat};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const CODE_FONT: &str = "Consolas";

/// Run formatting.
#[derive(Debug, Clone, Copy, Default)]
struct RunStyle {
    bold: bool,
    italic: bool,
    mono: bool,
    /// Half-points.
    size: Option<u32>,
}

fn err(e: impl std::fmt::Display) -> ExportError {
    ExportError::render(ExportFormat::Docx, e)
}

/// Render the document as DOCX bytes.
pub fn render(doc: &Document<'_>) -> Result<Vec<u8>, ExportError> {
    let body = document_xml(doc)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("word/document.xml", body.as_slice()),
    ] {
        zip.start_file(name, options).map_err(err)?;
        zip.write_all(data).map_err(err)?;
    }
    let cursor = zip.finish().map_err(err)?;
    Ok(cursor.into_inner())
}

/// Build `word/document.xml`.
fn document_xml(doc: &Document<'_>) -> Result<Vec<u8>, ExportError> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(err)?;

    let mut root = BytesStart::new("w:document");
    root.push_attribute(("xmlns:w", W_NS));
    w.write_event(Event::Start(root)).map_err(err)?;
    w.write_event(Event::Start(BytesStart::new("w:body")))
        .map_err(err)?;

    paragraph(
        &mut w,
        doc.title,
        RunStyle {
            bold: true,
            size: Some(36),
            ..RunStyle::default()
        },
        true,
    )?;
    for (label, value) in doc.summary() {
        paragraph(
            &mut w,
            &format!("{}: {}", label, value),
            RunStyle::default(),
            false,
        )?;
    }
    paragraph(
        &mut w,
        "Documented Code",
        RunStyle {
            bold: true,
            size: Some(28),
            ..RunStyle::default()
        },
        false,
    )?;

    let code = RunStyle {
        mono: true,
        size: Some(18),
        ..RunStyle::default()
    };
    for line in doc.text.lines() {
        paragraph(&mut w, line, code, false)?;
    }

    if let Some(footer) = doc.footer {
        paragraph(
            &mut w,
            footer,
            RunStyle {
                italic: true,
                size: Some(16),
                ..RunStyle::default()
            },
            true,
        )?;
    }

    w.write_event(Event::End(BytesEnd::new("w:body")))
        .map_err(err)?;
    w.write_event(Event::End(BytesEnd::new("w:document")))
        .map_err(err)?;
    Ok(w.into_inner().into_inner())
}

/// Write a single-run paragraph; tabs become `<w:tab/>`.
fn paragraph<W: Write>(
    w: &mut Writer<W>,
    text: &str,
    style: RunStyle,
    centered: bool,
) -> Result<(), ExportError> {
    w.write_event(Event::Start(BytesStart::new("w:p")))
        .map_err(err)?;

    w.write_event(Event::Start(BytesStart::new("w:pPr")))
        .map_err(err)?;
    if style.mono {
        let mut spacing = BytesStart::new("w:spacing");
        spacing.push_attribute(("w:before", "0"));
        spacing.push_attribute(("w:after", "0"));
        w.write_event(Event::Empty(spacing)).map_err(err)?;
    }
    if centered {
        let mut jc = BytesStart::new("w:jc");
        jc.push_attribute(("w:val", "center"));
        w.write_event(Event::Empty(jc)).map_err(err)?;
    }
    w.write_event(Event::End(BytesEnd::new("w:pPr")))
        .map_err(err)?;

    w.write_event(Event::Start(BytesStart::new("w:r")))
        .map_err(err)?;
    run_properties(w, style)?;

    for (i, segment) in text.split('\t').enumerate() {
        if i > 0 {
            w.write_event(Event::Empty(BytesStart::new("w:tab")))
                .map_err(err)?;
        }
        if segment.is_empty() {
            continue;
        }
        let mut t = BytesStart::new("w:t");
        t.push_attribute(("xml:space", "preserve"));
        w.write_event(Event::Start(t)).map_err(err)?;
        let clean = xml_safe(segment);
        w.write_event(Event::Text(BytesText::new(&clean)))
            .map_err(err)?;
        w.write_event(Event::End(BytesEnd::new("w:t")))
            .map_err(err)?;
    }

    w.write_event(Event::End(BytesEnd::new("w:r")))
        .map_err(err)?;
    w.write_event(Event::End(BytesEnd::new("w:p")))
        .map_err(err)?;
    Ok(())
}

fn run_properties<W: Write>(w: &mut Writer<W>, style: RunStyle) -> Result<(), ExportError> {
    w.write_event(Event::Start(BytesStart::new("w:rPr")))
        .map_err(err)?;
    if style.mono {
        let mut fonts = BytesStart::new("w:rFonts");
        fonts.push_attribute(("w:ascii", CODE_FONT));
        fonts.push_attribute(("w:hAnsi", CODE_FONT));
        fonts.push_attribute(("w:cs", CODE_FONT));
        w.write_event(Event::Empty(fonts)).map_err(err)?;
    }
    if style.bold {
        w.write_event(Event::Empty(BytesStart::new("w:b")))
            .map_err(err)?;
    }
    if style.italic {
        w.write_event(Event::Empty(BytesStart::new("w:i")))
            .map_err(err)?;
    }
    if let Some(size) = style.size {
        let mut sz = BytesStart::new("w:sz");
        sz.push_attribute(("w:val", size.to_string().as_str()));
        w.write_event(Event::Empty(sz)).map_err(err)?;
    }
    w.write_event(Event::End(BytesEnd::new("w:rPr")))
        .map_err(err)?;
    Ok(())
}

/// Replace characters XML 1.0 cannot carry.
fn xml_safe(s: &str) -> std::borrow::Cow<'_, str> {
    let invalid = |c: char| {
        (c < ' ' && !matches!(c, '\t' | '\n' | '\r')) || matches!(c, '\u{fffe}' | '\u{ffff}')
    };
    if s.chars().any(invalid) {
        s.chars()
            .map(|c| if invalid(c) { '\u{fffd}' } else { c })
            .collect::<String>()
            .into()
    } else {
        s.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StructuralStatistics;
    use crate::language::Language;
    use quick_xml::events::Event as XmlEvent;
    use quick_xml::Reader;
    use std::io::Read;

    fn sample(text: &str) -> Document<'_> {
        Document {
            title: "Code Documentation",
            filename: "main.go",
            language: Language::Go,
            statistics: StructuralStatistics::default(),
            generated_at: None,
            footer: Some("Footer"),
            text,
        }
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut out = String::new();
        part.read_to_string(&mut out).unwrap();
        out
    }

    /// Paragraph texts, with `<w:tab/>` read back as `\t`.
    fn paragraphs(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut out = Vec::new();
        let mut current = String::new();
        let mut in_text = false;
        loop {
            match reader.read_event().unwrap() {
                XmlEvent::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
                XmlEvent::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
                XmlEvent::Empty(e) if e.local_name().as_ref() == b"tab" => current.push('\t'),
                XmlEvent::Text(t) if in_text => current.push_str(&t.unescape().unwrap()),
                XmlEvent::End(e) if e.local_name().as_ref() == b"p" => {
                    out.push(std::mem::take(&mut current))
                }
                XmlEvent::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_package_parts() {
        let bytes = render(&sample("package main\n")).unwrap();
        assert!(read_part(&bytes, "[Content_Types].xml").contains("/word/document.xml"));
        assert!(read_part(&bytes, "_rels/.rels").contains("word/document.xml"));
        assert!(read_part(&bytes, "word/document.xml").contains(CODE_FONT));
    }

    #[test]
    fn test_source_lines_survive() {
        let text = "func main() {\n\tif a < b && c > \"d\" {\n\t\tx :=   1\n\t}\n\n}\n";
        let bytes = render(&sample(text)).unwrap();
        let paras = paragraphs(&read_part(&bytes, "word/document.xml"));

        assert_eq!(paras[0], "Code Documentation");
        assert!(paras.contains(&"File: main.go".to_string()));
        let start = paras.iter().position(|p| p == "Documented Code").unwrap() + 1;
        let code: Vec<&str> = paras[start..start + 6].iter().map(|s| s.as_str()).collect();
        assert_eq!(code, text.lines().collect::<Vec<_>>());
        assert_eq!(paras.last().unwrap(), "Footer");
    }

    #[test]
    fn test_control_characters_are_replaced() {
        assert_eq!(xml_safe("a\u{1}b"), "a\u{fffd}b");
        assert_eq!(xml_safe("plain\ttext"), "plain\ttext");
    }
}
