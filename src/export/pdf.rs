//! PDF rendering: paginated A4 pages of fixed-width text.
//!
//! Text that WinAnsi can encode is set in the base-14 Courier fonts, which
//! need no embedding. Any other text is set in a TrueType font embedded as a
//! CID-keyed Type0 font with a ToUnicode map, so every character stays in
//! the text layer. The bundled DejaVu Sans Mono draws Latin, Greek, Cyrillic
//! and most symbols; CJK needs a font configured through `export.pdf_font`.

use std::collections::HashMap;
use std::fmt::Write as _;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{name_id, Face, GlyphId};

use super::{expand_tabs, Document, ExportError, ExportFormat};

/// Monospace font embedded when the text needs more than WinAnsi.
pub const BUNDLED_FONT: &[u8] = include_bytes!("../fonts/DejaVuSansMono.ttf");

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: f32 = 50.0;
const FONT_SIZE: f32 = 9.0;
const LEADING: f32 = 11.0;
/// Courier advance width in thousandths of an em.
const COURIER_ADVANCE: f32 = 600.0;
const TAB_WIDTH: usize = 4;
/// Stroke width for simulated bold in embedded fonts.
const BOLD_STROKE: f32 = 0.3;
/// Entries per `bfchar` block of the ToUnicode map.
const CMAP_CHUNK: usize = 100;

/// A laid-out line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PdfLine {
    text: String,
    bold: bool,
}

impl PdfLine {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

fn err(e: impl std::fmt::Display) -> ExportError {
    ExportError::render(ExportFormat::Pdf, e)
}

/// Lines per page that fit between the margins.
fn rows() -> usize {
    ((PAGE_HEIGHT as f32 - 2.0 * MARGIN) / LEADING) as usize
}

/// Usable line width in points.
fn line_width() -> f32 {
    PAGE_WIDTH as f32 - 2.0 * MARGIN
}

/// Render the document as PDF bytes.
///
/// `font` is a TrueType program to embed for all text. Without one, Courier
/// is used when WinAnsi covers the document and the bundled font otherwise.
pub fn render(doc: &Document<'_>, font: Option<&[u8]>) -> Result<Vec<u8>, ExportError> {
    let mut typeface = match font {
        Some(data) => Typeface::Embedded(EmbeddedFont::parse(data)?),
        None if win_ansi_covers(doc) => Typeface::Courier,
        None => Typeface::Embedded(EmbeddedFont::parse(BUNDLED_FONT)?),
    };
    let lines = layout(doc, &typeface);

    let mut pdf = PdfDocument::with_version("1.5");
    let pages_id = pdf.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for chunk in lines.chunks(rows().max(1)) {
        let content = page_content(chunk, &mut typeface)?;
        let encoded = content.encode().map_err(err)?;
        let content_id = pdf.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let fonts = typeface.write_fonts(&mut pdf)?;
    let resources_id = pdf.add_object(dictionary! { "Font" => fonts });

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    pdf.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    pdf.save_to(&mut out).map_err(err)?;
    Ok(out)
}

/// Font used for one render.
enum Typeface<'f> {
    /// Base-14 Courier and Courier-Bold, WinAnsi encoded.
    Courier,
    /// A TrueType program embedded as a Type0 font; bold is simulated.
    Embedded(EmbeddedFont<'f>),
}

impl Typeface<'_> {
    /// Advance width of `c` in points.
    fn advance(&self, c: char) -> f32 {
        let units = match self {
            Typeface::Courier => COURIER_ADVANCE,
            Typeface::Embedded(font) => font.advance(c),
        };
        units / 1000.0 * FONT_SIZE
    }

    /// Operators that switch to the regular or bold face.
    fn select(&self, bold: bool) -> Vec<Operation> {
        match self {
            Typeface::Courier => {
                let name = if bold { "F2" } else { "F1" };
                vec![tf(name)]
            }
            Typeface::Embedded(_) => {
                let mode = if bold { 2 } else { 0 };
                vec![tf("F1"), Operation::new("Tr", vec![Object::Integer(mode)])]
            }
        }
    }

    fn encode(&mut self, text: &str) -> Result<Object, ExportError> {
        match self {
            Typeface::Courier => Ok(Object::String(
                text.chars().map(|c| win_ansi(c).unwrap_or(b'?')).collect(),
                StringFormat::Literal,
            )),
            Typeface::Embedded(font) => Ok(Object::String(
                font.encode(text)?,
                StringFormat::Hexadecimal,
            )),
        }
    }

    /// Add the font objects and return the `/Font` resource dictionary.
    fn write_fonts(&self, pdf: &mut PdfDocument) -> Result<Dictionary, ExportError> {
        match self {
            Typeface::Courier => {
                let regular = pdf.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Courier",
                    "Encoding" => "WinAnsiEncoding",
                });
                let bold = pdf.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Courier-Bold",
                    "Encoding" => "WinAnsiEncoding",
                });
                Ok(dictionary! { "F1" => regular, "F2" => bold })
            }
            Typeface::Embedded(font) => {
                let missing = font.missing_glyphs();
                if missing > 0 {
                    tracing::warn!(
                        missing,
                        font = %font.postscript_name(),
                        "characters without a glyph in the PDF font"
                    );
                }
                let id = font.write(pdf)?;
                Ok(dictionary! { "F1" => id })
            }
        }
    }
}

fn tf(name: &str) -> Operation {
    Operation::new(
        "Tf",
        vec![Object::Name(name.as_bytes().to_vec()), Object::Real(FONT_SIZE)],
    )
}

/// A parsed TrueType program and the characters drawn with it.
///
/// Each distinct character gets its own CID, in order of first use starting
/// at 1, so the ToUnicode map stays exact even for characters the font has no
/// glyph for.
struct EmbeddedFont<'f> {
    data: &'f [u8],
    face: Face<'f>,
    used: Vec<char>,
    cids: HashMap<char, u16>,
}

impl<'f> EmbeddedFont<'f> {
    fn parse(data: &'f [u8]) -> Result<Self, ExportError> {
        let face = Face::parse(data, 0).map_err(|e| err(format!("invalid font: {}", e)))?;
        Ok(Self {
            data,
            face,
            used: Vec::new(),
            cids: HashMap::new(),
        })
    }

    fn scale(&self) -> f32 {
        1000.0 / f32::from(self.face.units_per_em())
    }

    fn glyph(&self, c: char) -> GlyphId {
        self.face.glyph_index(c).unwrap_or(GlyphId(0))
    }

    /// Advance width in thousandths of an em.
    fn advance(&self, c: char) -> f32 {
        let units = self.face.glyph_hor_advance(self.glyph(c)).unwrap_or(0);
        (f32::from(units) * self.scale()).round()
    }

    fn cid(&mut self, c: char) -> Result<u16, ExportError> {
        if let Some(cid) = self.cids.get(&c) {
            return Ok(*cid);
        }
        let cid = u16::try_from(self.used.len() + 1)
            .ok()
            .filter(|cid| *cid < u16::MAX)
            .ok_or_else(|| err("too many distinct characters for one font"))?;
        self.used.push(c);
        self.cids.insert(c, cid);
        Ok(cid)
    }

    /// Two-byte big-endian CIDs for `text`.
    fn encode(&mut self, text: &str) -> Result<Vec<u8>, ExportError> {
        let mut out = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            out.extend_from_slice(&self.cid(c)?.to_be_bytes());
        }
        Ok(out)
    }

    fn missing_glyphs(&self) -> usize {
        self.used
            .iter()
            .filter(|c| self.face.glyph_index(**c).is_none())
            .count()
    }

    fn postscript_name(&self) -> String {
        let name: String = self
            .face
            .names()
            .into_iter()
            .filter(|n| n.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
            .collect();
        if name.is_empty() {
            "EmbeddedMono".to_string()
        } else {
            name
        }
    }

    /// Add the Type0 font with its descendant, descriptor, program and maps.
    fn write(&self, pdf: &mut PdfDocument) -> Result<ObjectId, ExportError> {
        let name = self.postscript_name();
        let scale = self.scale();
        let scaled = |v: i16| Object::Integer((f32::from(v) * scale).round() as i64);

        let mut program = Stream::new(
            dictionary! { "Length1" => self.data.len() as i64 },
            self.data.to_vec(),
        );
        program.compress().map_err(err)?;
        let program_id = pdf.add_object(program);

        let bbox = self.face.global_bounding_box();
        let ascent = self.face.ascender();
        let flags: i64 = if self.face.is_monospaced() { 1 | 32 } else { 32 };
        let descriptor_id = pdf.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(name.clone().into_bytes()),
            "Flags" => flags,
            "FontBBox" => vec![
                scaled(bbox.x_min),
                scaled(bbox.y_min),
                scaled(bbox.x_max),
                scaled(bbox.y_max),
            ],
            "ItalicAngle" => Object::Real(self.face.italic_angle()),
            "Ascent" => scaled(ascent),
            "Descent" => scaled(self.face.descender()),
            "CapHeight" => scaled(self.face.capital_height().unwrap_or(ascent)),
            "StemV" => 80,
            "FontFile2" => program_id,
        });

        let mut gid_map = vec![0u8, 0u8];
        for c in &self.used {
            gid_map.extend_from_slice(&self.glyph(*c).0.to_be_bytes());
        }
        let mut gid_stream = Stream::new(dictionary! {}, gid_map);
        gid_stream.compress().map_err(err)?;
        let gid_map_id = pdf.add_object(gid_stream);

        let mut descendant = dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(name.clone().into_bytes()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => self.advance(' ') as i64,
            "CIDToGIDMap" => gid_map_id,
        };
        if !self.used.is_empty() {
            let widths: Vec<Object> = self
                .used
                .iter()
                .map(|c| Object::Integer(self.advance(*c) as i64))
                .collect();
            descendant.set("W", vec![Object::Integer(1), Object::Array(widths)]);
        }
        let descendant_id = pdf.add_object(descendant);

        let mut to_unicode = Stream::new(dictionary! {}, self.to_unicode_cmap().into_bytes());
        to_unicode.compress().map_err(err)?;
        let to_unicode_id = pdf.add_object(to_unicode);

        Ok(pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(name.into_bytes()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(descendant_id)],
            "ToUnicode" => to_unicode_id,
        }))
    }

    /// CMap program mapping every CID back to its character.
    fn to_unicode_cmap(&self) -> String {
        let mut out = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );
        for (block, chars) in self.used.chunks(CMAP_CHUNK).enumerate() {
            let _ = writeln!(out, "{} beginbfchar", chars.len());
            for (i, c) in chars.iter().enumerate() {
                let cid = block * CMAP_CHUNK + i + 1;
                let mut units = [0u16; 2];
                let target: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{:04X}", u))
                    .collect();
                let _ = writeln!(out, "<{:04X}> <{}>", cid, target);
            }
            out.push_str("endbfchar\n");
        }
        out.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );
        out
    }
}

/// Turn the document into lines that fit the page width.
fn layout(doc: &Document<'_>, typeface: &Typeface<'_>) -> Vec<PdfLine> {
    let measure = |c: char| typeface.advance(c);
    let width = line_width();

    let mut lines = Vec::new();
    push_wrapped(&mut lines, doc.title, true, &measure, width);
    lines.push(PdfLine::plain(""));
    for (label, value) in doc.summary() {
        push_wrapped(&mut lines, &format!("{}: {}", label, value), false, &measure, width);
    }
    lines.push(PdfLine::plain(""));
    lines.push(PdfLine::bold("Documented Code"));
    lines.push(PdfLine::plain(""));
    for line in doc.text.lines() {
        push_wrapped(&mut lines, &expand_tabs(line, TAB_WIDTH), false, &measure, width);
    }
    if let Some(footer) = doc.footer {
        lines.push(PdfLine::plain(""));
        push_wrapped(&mut lines, footer, false, &measure, width);
    }
    lines
}

/// Hard-wrap `text` once the next character would pass `max_width`.
/// Empty text still takes a line.
fn push_wrapped(
    lines: &mut Vec<PdfLine>,
    text: &str,
    bold: bool,
    measure: &dyn Fn(char) -> f32,
    max_width: f32,
) {
    let mut current = String::new();
    let mut width = 0.0;
    for c in text.chars() {
        let advance = measure(c);
        if !current.is_empty() && width + advance > max_width {
            lines.push(PdfLine {
                text: std::mem::take(&mut current),
                bold,
            });
            width = 0.0;
        }
        current.push(c);
        width += advance;
    }
    lines.push(PdfLine {
        text: current,
        bold,
    });
}

fn page_content(lines: &[PdfLine], typeface: &mut Typeface<'_>) -> Result<Content, ExportError> {
    let top = PAGE_HEIGHT as f32 - MARGIN - FONT_SIZE;
    let mut operations = vec![
        Operation::new("w", vec![Object::Real(BOLD_STROKE)]),
        Operation::new("BT", vec![]),
        Operation::new("TL", vec![Object::Real(LEADING)]),
        Operation::new("Td", vec![Object::Real(MARGIN), Object::Real(top)]),
    ];
    let mut current_bold = None;
    for line in lines {
        if current_bold != Some(line.bold) {
            operations.extend(typeface.select(line.bold));
            current_bold = Some(line.bold);
        }
        operations.push(Operation::new("Tj", vec![typeface.encode(&line.text)?]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    Ok(Content { operations })
}

/// Whether Courier with WinAnsi can show every character of the document.
fn win_ansi_covers(doc: &Document<'_>) -> bool {
    let fits = |s: &str| {
        s.chars()
            .all(|c| matches!(c, '\t' | '\n' | '\r') || win_ansi(c).is_some())
    };
    fits(doc.title)
        && fits(doc.text)
        && doc.footer.map_or(true, fits)
        && doc
            .summary()
            .iter()
            .all(|(label, value)| fits(*label) && fits(value.as_str()))
}

/// WinAnsi code for `c`. No-break space and soft hyphen are left out since
/// readers map those codes back to a plain space and hyphen.
fn win_ansi(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7e | 0xa1..=0xac | 0xae..=0xff => Some(code as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(_, u)| *u == c)
            .map(|(byte, _)| *byte),
    }
}

/// The 0x80..=0x9F block, where WinAnsi departs from Latin-1.
const WIN_ANSI_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20ac}'),
    (0x82, '\u{201a}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201e}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02c6}'),
    (0x89, '\u{2030}'),
    (0x8a, '\u{0160}'),
    (0x8b, '\u{2039}'),
    (0x8c, '\u{0152}'),
    (0x8e, '\u{017d}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201c}'),
    (0x94, '\u{201d}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02dc}'),
    (0x99, '\u{2122}'),
    (0x9a, '\u{0161}'),
    (0x9b, '\u{203a}'),
    (0x9c, '\u{0153}'),
    (0x9e, '\u{017e}'),
    (0x9f, '\u{0178}'),
];
