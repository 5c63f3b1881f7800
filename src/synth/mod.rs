//! Documentation synthesis.
//!
//! Wraps an [`Annotator`] with the checks the pipeline owns: a deadline on
//! every call, cleanup and validation of the returned text, post-generation
//! statistics, structural drift detection and generation sequencing.
//!
//! Nothing is retried automatically. A failed or timed-out call leaves the
//! artifact and every earlier variant untouched; retrying is a new
//! [`Synthesizer::regenerate`] call.

mod annotator;
mod ollama;
pub mod prompt;

pub use annotator::{AnnotationRequest, Annotator, AnnotatorError, Directive};
pub use ollama::OllamaAnnotator;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::{self, StructuralStatistics};
use crate::artifact::SourceArtifact;
use crate::config::Config;

/// Step of a generation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStage {
    Annotate,
    Timeout,
    Validate,
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStage::Annotate => write!(f, "annotate"),
            GenerationStage::Timeout => write!(f, "timeout"),
            GenerationStage::Validate => write!(f, "validate"),
        }
    }
}

/// Errors from generate/regenerate.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation failed at {stage}: {message}")]
    Failed {
        stage: GenerationStage,
        message: String,
    },
    #[error("invalid feedback: {0}")]
    InvalidFeedback(String),
    #[error("previous variant belongs to artifact {found}, not {expected}")]
    VariantMismatch { expected: Uuid, found: Uuid },
}

impl GenerationError {
    fn failed(stage: GenerationStage, message: impl Into<String>) -> Self {
        GenerationError::Failed {
            stage,
            message: message.into(),
        }
    }
}

/// Structural counts that moved between the source and an annotated variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationDrift {
    pub baseline_functions: usize,
    pub annotated_functions: usize,
    pub baseline_classes: usize,
    pub annotated_classes: usize,
}

impl GenerationDrift {
    /// Compare counts; `None` when both stay within `tolerance`.
    pub fn check(
        baseline: &StructuralStatistics,
        annotated: &StructuralStatistics,
        tolerance: usize,
    ) -> Option<Self> {
        let functions = baseline.functions_count.abs_diff(annotated.functions_count);
        let classes = baseline.classes_count.abs_diff(annotated.classes_count);
        if functions <= tolerance && classes <= tolerance {
            return None;
        }
        Some(Self {
            baseline_functions: baseline.functions_count,
            annotated_functions: annotated.functions_count,
            baseline_classes: baseline.classes_count,
            annotated_classes: annotated.classes_count,
        })
    }
}

impl std::fmt::Display for GenerationDrift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "functions {} -> {}, classes {} -> {}",
            self.baseline_functions,
            self.annotated_functions,
            self.baseline_classes,
            self.annotated_classes
        )
    }
}

/// One generated documentation pass over a source artifact.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedVariant {
    pub artifact_id: Uuid,
    pub annotated_text: String,
    /// Statistics of `annotated_text`, computed locally.
    pub statistics: StructuralStatistics,
    pub generated_at: DateTime<Utc>,
    /// Strictly increasing per artifact, starting at 1.
    pub generation_seq: u64,
    pub drift: Option<GenerationDrift>,
    /// Feedback that produced this variant, if any.
    pub feedback: Option<String>,
}

impl AnnotatedVariant {
    pub fn has_drift(&self) -> bool {
        self.drift.is_some()
    }
}

/// Synthesis limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub drift_tolerance: usize,
    pub timeout: Duration,
    pub max_feedback_chars: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SynthesisOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            drift_tolerance: config.synthesis.drift_tolerance,
            timeout: config.synthesis.timeout(),
            max_feedback_chars: config.limits.max_feedback_chars,
        }
    }
}

/// Drives annotation calls and turns their output into variants.
#[derive(Clone)]
pub struct Synthesizer {
    annotator: Arc<dyn Annotator>,
    options: SynthesisOptions,
}

impl Synthesizer {
    pub fn new(annotator: Arc<dyn Annotator>, options: SynthesisOptions) -> Self {
        Self { annotator, options }
    }

    pub fn annotator_name(&self) -> &str {
        self.annotator.name()
    }

    /// First documentation pass over an artifact.
    pub async fn generate(
        &self,
        artifact: &SourceArtifact,
    ) -> Result<AnnotatedVariant, GenerationError> {
        self.run(artifact, Directive::Document, None, 0).await
    }

    /// New documentation pass, replacing `previous`.
    ///
    /// Feedback is forwarded verbatim; it is only checked for being
    /// non-empty and within the configured length.
    pub async fn regenerate(
        &self,
        artifact: &SourceArtifact,
        previous: &AnnotatedVariant,
        feedback: Option<&str>,
    ) -> Result<AnnotatedVariant, GenerationError> {
        if previous.artifact_id != artifact.id {
            return Err(GenerationError::VariantMismatch {
                expected: artifact.id,
                found: previous.artifact_id,
            });
        }
        if let Some(text) = feedback {
            self.validate_feedback(text)?;
        }

        let directive = Directive::Regenerate {
            feedback,
            previous: Some(&previous.annotated_text),
        };
        self.run(artifact, directive, feedback, previous.generation_seq)
            .await
    }

    fn validate_feedback(&self, feedback: &str) -> Result<(), GenerationError> {
        if feedback.trim().is_empty() {
            return Err(GenerationError::InvalidFeedback(
                "feedback is empty".to_string(),
            ));
        }
        let chars = feedback.chars().count();
        if chars > self.options.max_feedback_chars {
            return Err(GenerationError::InvalidFeedback(format!(
                "feedback is {} characters, limit is {}",
                chars, self.options.max_feedback_chars
            )));
        }
        Ok(())
    }

    async fn run(
        &self,
        artifact: &SourceArtifact,
        directive: Directive<'_>,
        feedback: Option<&str>,
        after_seq: u64,
    ) -> Result<AnnotatedVariant, GenerationError> {
        let request = AnnotationRequest {
            text: &artifact.text,
            language: artifact.language,
            directive,
        };

        tracing::debug!(
            artifact = %artifact.id,
            annotator = %self.annotator.name(),
            regenerate = feedback.is_some() || after_seq > 0,
            "requesting annotation"
        );

        let output =
            match tokio::time::timeout(self.options.timeout, self.annotator.annotate(&request))
                .await
            {
                Err(_) => {
                    tracing::warn!(
                        artifact = %artifact.id,
                        timeout_ms = self.options.timeout.as_millis() as u64,
                        "annotation timed out"
                    );
                    return Err(GenerationError::failed(
                        GenerationStage::Timeout,
                        format!(
                            "no response within {} ms",
                            self.options.timeout.as_millis()
                        ),
                    ));
                }
                Ok(Err(e)) => {
                    return Err(GenerationError::failed(GenerationStage::Annotate, e.to_string()))
                }
                Ok(Ok(text)) => text,
            };

        let annotated_text = strip_code_fence(&output);
        if annotated_text.trim().is_empty() {
            tracing::warn!(artifact = %artifact.id, "annotator returned empty output");
            return Err(GenerationError::failed(
                GenerationStage::Validate,
                "annotator returned empty output",
            ));
        }

        let statistics = analysis::analyze(&annotated_text, artifact.language);
        let drift =
            GenerationDrift::check(&artifact.baseline, &statistics, self.options.drift_tolerance);
        if let Some(d) = &drift {
            tracing::warn!(artifact = %artifact.id, drift = %d, "annotated variant drifted");
        }

        let generation_seq = artifact.next_generation_seq(after_seq);
        tracing::info!(
            artifact = %artifact.id,
            seq = generation_seq,
            documented = statistics.documented_functions_count,
            functions = statistics.functions_count,
            "generated annotated variant"
        );

        Ok(AnnotatedVariant {
            artifact_id: artifact.id,
            annotated_text,
            statistics,
            generated_at: Utc::now(),
            generation_seq,
            drift,
            feedback: feedback.map(str::to_string),
        })
    }
}

/// Remove a Markdown code fence wrapped around model output.
///
/// The closing fence is the last line holding only backticks, at least as
/// many as the opening fence, indented by at most three spaces. Fenced
/// examples inside docstrings or comments are therefore kept. Without a
/// closing fence everything after the opening line is kept.
///
/// Leading blank lines and trailing whitespace are dropped; non-empty
/// results end with exactly one newline.
pub fn strip_code_fence(output: &str) -> String {
    let trimmed = output.trim();
    let ticks = trimmed.bytes().take_while(|b| *b == b'`').count();
    let body = if ticks >= 3 {
        let rest = &trimmed[ticks..];
        let Some(newline) = rest.find('\n') else {
            return String::new();
        };
        let inner = &rest[newline + 1..];
        let mut end = inner.len();
        let mut offset = 0;
        for line in inner.split_inclusive('\n') {
            if is_closing_fence(line, ticks) {
                end = offset;
            }
            offset += line.len();
        }
        &inner[..end]
    } else {
        output
    };

    let body = body
        .trim_start_matches(['\n', '\r'])
        .trim_end();
    if body.is_empty() {
        String::new()
    } else {
        format!("{}\n", body)
    }
}

fn is_closing_fence(line: &str, ticks: usize) -> bool {
    let line = line.trim_end();
    let fence = line.trim_start_matches(' ');
    line.len() - fence.len() <= 3 && fence.len() >= ticks && fence.bytes().all(|b| b == b'`')
}
