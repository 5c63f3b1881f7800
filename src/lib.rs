//! codedoc - source documentation pipeline.
//!
//! codedoc takes a source file, works out which language it is written in,
//! measures how much of it is documented, asks a language model to add
//! documentation without changing the code, and renders the accepted text
//! as a DOCX, PDF or Markdown document.
//!
//! # Architecture
//!
//! - `language` / `detect`: supported languages and extension/content detection
//! - `analysis`: lexical scan for definitions and documentation coverage
//! - `artifact`: ingestion of uploaded files into immutable source artifacts
//! - `synth`: annotation capability, prompt building, drift checks, sequencing
//! - `export`: document rendering (Markdown, DOCX, PDF)
//! - `config`: YAML configuration
//! - `report`: output formatting (pretty, JSON)
//!
//! # Example
//!
//! ```
//! use codedoc::{analysis, detect};
//!
//! let src = "def add(a, b):\n    \"\"\"Add two numbers.\"\"\"\n    return a + b\n";
//! let language = detect::detect("math.py", src);
//! let stats = analysis::analyze(src, language);
//! assert_eq!(stats.functions_count, 1);
//! assert_eq!(stats.documentation_percentage, 100);
//! ```

pub mod analysis;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod detect;
pub mod export;
pub mod language;
pub mod report;
pub mod synth;

pub use analysis::{analyze, Analysis, AnalysisError, Definition, DefinitionKind, StructuralStatistics};
pub use artifact::{ingest, SourceArtifact};
pub use config::Config;
pub use detect::detect;
pub use export::{ExportArtifact, ExportError, ExportFormat, Exporter};
pub use language::Language;
pub use synth::{
    AnnotatedVariant, Annotator, GenerationDrift, GenerationError, OllamaAnnotator, Synthesizer,
};
