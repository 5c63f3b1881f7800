//! Structural analysis of source text.
//!
//! Counts lines, function and class definitions, and how many functions
//! carry documentation. Analysis is line-oriented and lightweight:
//!
//! ```text
//! ┌────────────┐     ┌───────────┐     ┌────────────┐     ┌──────────────┐
//! │ Source     │────▶│ Lexer     │────▶│ Scanner    │────▶│ Definitions  │
//! │ text       │     │ (masking) │     │ (patterns, │     │ + statistics │
//! └────────────┘     └───────────┘     │  scopes)   │     └──────────────┘
//!                                      └────────────┘
//! ```
//!
//! The lexer blanks comments and string contents so that definition
//! patterns never fire on text inside literals. The scanner matches
//! per-language patterns and confirms ambiguous ones (typed signatures,
//! constructors, class members) by looking at what follows the parameter
//! list. A definition counts as documented when a comment precedes it, or
//! for Python when a docstring opens its body.
//!
//! Analysis is pure and deterministic: the same text and language always
//! give the same result.

mod docs;
mod lexer;
mod rules;
mod scanner;
mod stats;

pub use scanner::{Definition, DefinitionKind};
pub use stats::StructuralStatistics;

pub(crate) use stats::percentage;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::language::Language;

const BOM: char = '\u{feff}';

/// Errors raised while turning raw bytes into analysable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    #[error("payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// Full analysis result: statistics plus the definitions behind them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub language: Language,
    pub statistics: StructuralStatistics,
    pub definitions: Vec<Definition>,
}

impl Analysis {
    /// Functions without documentation, in source order.
    pub fn undocumented_functions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions
            .iter()
            .filter(|d| d.kind == DefinitionKind::Function && !d.documented)
    }
}

/// Analyze source text, keeping the definition list.
pub fn scan(text: &str, language: Language) -> Analysis {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let rules = rules::rules_for(language);
    let lexed = lexer::lex(text, &rules.lex);
    let definitions = scanner::scan_definitions(&lexed, rules, language);
    let statistics = StructuralStatistics::from_definitions(lexed.lines.len(), &definitions);

    tracing::debug!(
        language = %language,
        lines = statistics.total_lines,
        functions = statistics.functions_count,
        classes = statistics.classes_count,
        documented = statistics.documented_functions_count,
        "analyzed source"
    );

    Analysis {
        language,
        statistics,
        definitions,
    }
}

/// Compute structural statistics for source text.
pub fn analyze(text: &str, language: Language) -> StructuralStatistics {
    scan(text, language).statistics
}

/// Decode and analyze raw bytes.
pub fn analyze_bytes(bytes: &[u8], language: Language) -> Result<StructuralStatistics, AnalysisError> {
    let text = decode_text(bytes)?;
    Ok(analyze(text, language))
}

/// Validate raw bytes as UTF-8 source text, dropping a leading BOM.
///
/// NUL bytes are rejected: they mark binary content, not source.
pub fn decode_text(bytes: &[u8]) -> Result<&str, AnalysisError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        AnalysisError::InvalidEncoding(format!(
            "not valid UTF-8 at byte {}",
            e.valid_up_to()
        ))
    })?;
    if let Some(pos) = text.find('\0') {
        return Err(AnalysisError::InvalidEncoding(format!(
            "NUL byte at offset {}",
            pos
        )));
    }
    Ok(text.strip_prefix(BOM).unwrap_or(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        for lang in Language::ALL {
            assert_eq!(analyze("", lang), StructuralStatistics::default());
        }
    }

    #[test]
    fn test_line_counting() {
        assert_eq!(analyze("a", Language::Python).total_lines, 1);
        assert_eq!(analyze("a\n", Language::Python).total_lines, 1);
        assert_eq!(analyze("a\nb", Language::Python).total_lines, 2);
        assert_eq!(analyze("a\r\nb\r\n", Language::Python).total_lines, 2);
        assert_eq!(analyze("\n\n", Language::Python).total_lines, 2);
    }

    #[test]
    fn test_python_half_documented() {
        let src = r#"import os


def documented(path):
    """Return the absolute path."""
    return os.path.abspath(path)


def bare(x):
    return x * 2
"#;
        let stats = analyze(src, Language::Python);
        assert_eq!(stats.functions_count, 2);
        assert_eq!(stats.documented_functions_count, 1);
        assert_eq!(stats.documentation_percentage, 50);
    }

    #[test]
    fn test_definitions_in_strings_are_ignored() {
        let src = "const doc = \"function fake() {}\";\n// function alsoFake() {}\nfunction real() {}\n";
        let analysis = scan(src, Language::JavaScript);
        let names: Vec<_> = analysis.definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["real"]);
        // The masked comment still documents the definition below it.
        assert!(analysis.definitions[0].documented);
        assert_eq!(analysis.definitions[0].line, 3);
    }

    #[test]
    fn test_undocumented_functions() {
        let src = "# Adds.\ndef add(a, b):\n    return a + b\n\ndef sub(a, b):\n    return a - b\n";
        let analysis = scan(src, Language::Python);
        let missing: Vec<_> = analysis.undocumented_functions().map(|d| d.name.as_str()).collect();
        assert_eq!(missing, vec!["sub"]);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(b"\xef\xbb\xbfprint(1)").unwrap(), "print(1)");
        assert!(matches!(
            decode_text(b"\xff\xfe"),
            Err(AnalysisError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode_text(b"abc\0def"),
            Err(AnalysisError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_bom_does_not_change_statistics() {
        let plain = analyze("def f():\n    pass\n", Language::Python);
        let with_bom = analyze("\u{feff}def f():\n    pass\n", Language::Python);
        assert_eq!(plain, with_bom);
    }

    #[test]
    fn test_deterministic() {
        let src = "class A {\n  // m\n  m() {}\n}\n";
        assert_eq!(scan(src, Language::JavaScript), scan(src, Language::JavaScript));
    }
}
