//! Export pipeline: render accepted text into downloadable documents.
//!
//! Every format renders the same logical [`Document`]: a title, the
//! original filename, an optional timestamp, a statistics summary of the
//! final text, the full text in fixed-width form and an optional footer.
//! Rendering is synchronous and keeps no state between calls.

pub mod docx;
pub mod markdown;
pub mod pdf;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::analysis::{self, StructuralStatistics};
use crate::config::ExportConfig;
use crate::detect;
use crate::language::Language;

/// Errors from rendering.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unsupported export format {0:?} (expected docx, pdf or markdown)")]
    UnsupportedFormat(String),
    #[error("failed to render {format}: {reason}")]
    RenderFailed { format: ExportFormat, reason: String },
}

impl ExportError {
    pub(crate) fn render(format: ExportFormat, reason: impl std::fmt::Display) -> Self {
        ExportError::RenderFailed {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Docx,
    Pdf,
    Markdown,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Docx, ExportFormat::Pdf, ExportFormat::Markdown];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "markdown",
        }
    }

    /// File extension of rendered artifacts.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Markdown => "text/markdown",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(ExportFormat::Docx),
            "pdf" => Ok(ExportFormat::Pdf),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A rendered document, owned by the caller.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub suggested_filename: String,
}

/// The logical document shared by all renderers.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub title: &'a str,
    pub filename: &'a str,
    pub language: Language,
    pub statistics: StructuralStatistics,
    pub generated_at: Option<DateTime<Utc>>,
    pub footer: Option<&'a str>,
    pub text: &'a str,
}

impl Document<'_> {
    /// Metadata lines shown under the title, as `(label, value)` pairs.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let s = &self.statistics;
        let mut rows = vec![
            ("File", self.filename.to_string()),
            ("Language", self.language.display_name().to_string()),
        ];
        if let Some(ts) = self.generated_at {
            rows.push(("Generated", ts.format("%Y-%m-%d %H:%M UTC").to_string()));
        }
        rows.push(("Lines", s.total_lines.to_string()));
        rows.push(("Functions", s.functions_count.to_string()));
        rows.push((
            "Documented functions",
            format!(
                "{} ({}%)",
                s.documented_functions_count, s.documentation_percentage
            ),
        ));
        rows.push(("Classes", s.classes_count.to_string()));
        rows
    }
}

/// Document options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub title: String,
    pub footer: Option<String>,
    pub include_timestamp: bool,
    /// TrueType font embedded in PDFs in place of the built-in choice.
    pub pdf_font: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

impl ExportOptions {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            title: config.title.clone(),
            footer: config.footer.clone(),
            include_timestamp: config.include_timestamp,
            pdf_font: config.pdf_font.clone(),
        }
    }
}

/// Renders final text into export artifacts.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// Render `final_text` in the requested format.
    pub fn render(
        &self,
        final_text: &str,
        filename: &str,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ExportError> {
        let doc = self.document(final_text, filename);
        let bytes = match format {
            ExportFormat::Markdown => markdown::render(&doc).into_bytes(),
            ExportFormat::Docx => docx::render(&doc)?,
            ExportFormat::Pdf => {
                let font = self.pdf_font()?;
                pdf::render(&doc, font.as_deref())?
            }
        };

        tracing::debug!(
            format = %format,
            filename = %filename,
            bytes = bytes.len(),
            "rendered export"
        );

        Ok(ExportArtifact {
            bytes,
            mime_type: format.mime_type(),
            suggested_filename: suggested_filename(filename, format),
        })
    }

    /// Markdown rendering of the accepted text, for review before export.
    pub fn preview(&self, final_text: &str, filename: &str) -> Result<String, ExportError> {
        Ok(markdown::render(&self.document(final_text, filename)))
    }

    /// The configured PDF font program, if any.
    fn pdf_font(&self) -> Result<Option<Vec<u8>>, ExportError> {
        let Some(path) = &self.options.pdf_font else {
            return Ok(None);
        };
        std::fs::read(path).map(Some).map_err(|e| {
            ExportError::render(
                ExportFormat::Pdf,
                format!("reading font {}: {}", path.display(), e),
            )
        })
    }

    fn document<'a>(&'a self, final_text: &'a str, filename: &'a str) -> Document<'a> {
        let language = detect::detect(filename, final_text);
        Document {
            title: &self.options.title,
            filename: base_name(filename),
            language,
            statistics: analysis::analyze(final_text, language),
            generated_at: self.options.include_timestamp.then(Utc::now),
            footer: self.options.footer.as_deref(),
            text: final_text,
        }
    }
}

/// Render with default options, parsing the format name.
pub fn render(
    final_text: &str,
    filename: &str,
    format: &str,
) -> Result<ExportArtifact, ExportError> {
    let format: ExportFormat = format.parse()?;
    Exporter::default().render(final_text, filename, format)
}

/// Markdown preview with default options.
pub fn preview(final_text: &str, filename: &str) -> Result<String, ExportError> {
    Exporter::default().preview(final_text, filename)
}

/// `<stem>_documented.<ext>`, where a known source extension is dropped from the name.
///
/// Other extensions stay part of the stem (`notes.txt` gives
/// `notes.txt_documented.md`). A dotfile keeps its whole name, so `.py`
/// gives `.py_documented.pdf`. An empty name becomes `document`.
pub fn suggested_filename(filename: &str, format: ExportFormat) -> String {
    let base = base_name(filename);
    let stem = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && Language::is_known_extension(ext) => stem,
        _ => base,
    };
    let stem = if stem.is_empty() { "document" } else { stem };
    format!("{}_documented.{}", stem, format.extension())
}

/// Final path component, for either separator style.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename)
        .trim()
}

/// Expand tabs to the next multiple of `width` columns.
pub(crate) fn expand_tabs(line: &str, width: usize) -> String {
    let mut out = String::with_capacity(line.len());
    let mut col = 0;
    for c in line.chars() {
        if c == '\t' {
            let n = width - col % width;
            out.extend(std::iter::repeat(' ').take(n));
            col += n;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}
