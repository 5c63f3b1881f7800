//! Source artifacts: an uploaded file after detection and baseline analysis.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::analysis::{self, AnalysisError, StructuralStatistics};
use crate::config::LimitsConfig;
use crate::detect;
use crate::language::Language;

/// A source file accepted for documentation.
///
/// Immutable once created. Clones share the generation counter, so every
/// variant produced from the same upload gets a distinct sequence number.
#[derive(Debug, Clone, Serialize)]
pub struct SourceArtifact {
    pub id: Uuid,
    pub filename: String,
    pub text: String,
    pub language: Language,
    /// Statistics of the original text.
    pub baseline: StructuralStatistics,
    #[serde(skip)]
    seq: Arc<AtomicU64>,
}

impl SourceArtifact {
    /// Build an artifact from already decoded text.
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let filename = filename.into();
        let text = text.into();
        let language = detect::detect(&filename, &text);
        Self::with_language(filename, text, language)
    }

    /// Build an artifact with a caller-chosen language.
    pub fn with_language(
        filename: impl Into<String>,
        text: impl Into<String>,
        language: Language,
    ) -> Self {
        let text = text.into();
        let baseline = analysis::analyze(&text, language);
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            text,
            language,
            baseline,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Highest generation sequence handed out so far (0 before any generation).
    pub fn last_generation_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Reserve the next generation sequence, never below `after + 1`.
    pub(crate) fn next_generation_seq(&self, after: u64) -> u64 {
        self.seq.fetch_max(after, Ordering::SeqCst);
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Check the payload limit and decode uploaded bytes as source text.
pub fn read_limited<'a>(bytes: &'a [u8], limits: &LimitsConfig) -> Result<&'a str, AnalysisError> {
    if bytes.len() > limits.max_payload_bytes {
        return Err(AnalysisError::PayloadTooLarge {
            size: bytes.len(),
            limit: limits.max_payload_bytes,
        });
    }
    analysis::decode_text(bytes)
}

/// Validate, decode, detect and analyze an uploaded file.
pub fn ingest(
    filename: &str,
    bytes: &[u8],
    limits: &LimitsConfig,
) -> Result<SourceArtifact, AnalysisError> {
    let text = read_limited(bytes, limits)?;
    let artifact = SourceArtifact::new(filename, text);

    tracing::debug!(
        id = %artifact.id,
        filename = %artifact.filename,
        language = %artifact.language,
        bytes = bytes.len(),
        "ingested source"
    );

    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_detects_and_analyzes() {
        let src = b"def add(a, b):\n    \"\"\"Add.\"\"\"\n    return a + b\n";
        let artifact = ingest("math.py", src, &LimitsConfig::default()).unwrap();
        assert_eq!(artifact.language, Language::Python);
        assert_eq!(artifact.baseline.functions_count, 1);
        assert_eq!(artifact.baseline.documentation_percentage, 100);
        assert_eq!(artifact.last_generation_seq(), 0);
    }

    #[test]
    fn test_ingest_rejects_large_payload() {
        let limits = LimitsConfig {
            max_payload_bytes: 4,
            ..LimitsConfig::default()
        };
        let err = ingest("a.py", b"12345", &limits).unwrap_err();
        assert_eq!(err, AnalysisError::PayloadTooLarge { size: 5, limit: 4 });
        assert!(ingest("a.py", b"1234", &limits).is_ok());
    }

    #[test]
    fn test_read_limited_checks_size_before_decoding() {
        let limits = LimitsConfig {
            max_payload_bytes: 3,
            ..LimitsConfig::default()
        };
        assert_eq!(
            read_limited(&[0xff, 0xfe, 0x00, 0x01], &limits),
            Err(AnalysisError::PayloadTooLarge { size: 4, limit: 3 })
        );
        assert!(matches!(
            read_limited(&[0xff, 0xfe], &limits),
            Err(AnalysisError::InvalidEncoding(_))
        ));
        assert_eq!(read_limited(b"\xef\xbb\xbfab", &LimitsConfig::default()), Ok("ab"));
    }

    #[test]
    fn test_ingest_rejects_binary() {
        let err = ingest("a.bin", &[0x89, 0x50, 0x4e, 0x47, 0x00], &LimitsConfig::default());
        assert!(matches!(err, Err(AnalysisError::InvalidEncoding(_))));
    }

    #[test]
    fn test_ingest_strips_bom() {
        let artifact = ingest("a.js", b"\xef\xbb\xbffunction f() {}\n", &LimitsConfig::default())
            .unwrap();
        assert_eq!(artifact.text, "function f() {}\n");
    }

    #[test]
    fn test_generation_seq_shared_by_clones() {
        let artifact = SourceArtifact::new("a.go", "package a\n");
        let clone = artifact.clone();
        assert_eq!(artifact.next_generation_seq(0), 1);
        assert_eq!(clone.next_generation_seq(0), 2);
        assert_eq!(artifact.next_generation_seq(10), 11);
        assert_eq!(clone.last_generation_seq(), 11);
    }
}
