//! The annotation capability seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::language::Language;

/// Errors from an annotation backend.
#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("annotator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid annotator response: {0}")]
    Decode(String),
    #[error("annotator unavailable: {0}")]
    Unavailable(String),
}

/// What the annotator is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// Add documentation to undocumented definitions.
    Document,
    /// Produce a new, more detailed documentation pass.
    Regenerate {
        /// Free-text instruction forwarded verbatim.
        feedback: Option<&'a str>,
        /// Text of the variant being replaced.
        previous: Option<&'a str>,
    },
}

/// One call into the annotation capability.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationRequest<'a> {
    pub text: &'a str,
    pub language: Language,
    pub directive: Directive<'a>,
}

/// A service that rewrites source text to add documentation.
///
/// Implementations may be slow and may fail; the caller owns timeouts and
/// validation of the returned text.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Return the annotated source text.
    async fn annotate(&self, request: &AnnotationRequest<'_>) -> Result<String, AnnotatorError>;
}
