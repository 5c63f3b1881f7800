//! Command-line interface for codedoc.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

use crate::analysis;
use crate::artifact::{self, SourceArtifact};
use crate::config::{self, Config, LimitsConfig};
use crate::detect;
use crate::export::{ExportFormat, ExportOptions, Exporter};
use crate::language::Language;
use crate::report::{self, FileReport, GenerationReport};
use crate::synth::{
    AnnotatedVariant, GenerationError, OllamaAnnotator, SynthesisOptions, Synthesizer,
};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Source documentation pipeline.
///
/// Detects the language of source files, measures how much of their code is
/// documented, asks a language model to add documentation without touching
/// the code, and exports the result as DOCX, PDF or Markdown.
#[derive(Parser)]
#[command(name = "codedoc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report documentation coverage of source files
    #[command(visible_alias = "stats")]
    Analyze(AnalyzeArgs),
    /// Add documentation to a source file with the configured model
    Generate(GenerateArgs),
    /// Print the Markdown rendering of a documented file
    Preview(PreviewArgs),
    /// Render a documented file as DOCX, PDF or Markdown
    Export(ExportArgs),
    /// Create a codedoc config file from the template
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Files or directories to analyze
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Analyze every file as this language instead of detecting it
    #[arg(short, long)]
    pub language: Option<Language>,

    /// Minimum acceptable documentation percentage (exit non-zero if below)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min_coverage: Option<u8>,
}

/// Arguments for the generate command.
#[derive(Parser)]
pub struct GenerateArgs {
    /// Source file to document
    pub file: PathBuf,

    /// Ask for another version with this feedback (repeatable, applied in order)
    #[arg(long)]
    pub feedback: Vec<String>,

    /// Write the documented source here instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Override the configured model
    #[arg(short, long)]
    pub model: Option<String>,
}

/// Arguments for the preview command.
#[derive(Parser)]
pub struct PreviewArgs {
    /// Documented source file
    pub file: PathBuf,

    /// Filename to show in the document (default: the file's name)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the export command.
#[derive(Parser)]
pub struct ExportArgs {
    /// Documented source file
    pub file: PathBuf,

    /// Document format: docx, pdf or markdown (md)
    #[arg(short, long)]
    pub format: String,

    /// Directory to write the document into
    #[arg(short = 'd', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Filename to show in the document and derive the output name from
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "codedoc.yaml")]
    pub output: PathBuf,
}

/// Load the explicit config, or discover one in the current directory.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir()?;
    let (config, path) = Config::load(explicit, &cwd)?;
    match path {
        Some(p) => tracing::debug!(path = %p.display(), "loaded config"),
        None => tracing::debug!("no config file found, using defaults"),
    }
    Ok(config)
}

fn check_report_format(format: &str) -> bool {
    if format != "pretty" && format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            format
        );
        return false;
    }
    true
}

/// Final path component as UTF-8, for naming and detection.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Read a file as source text, enforcing the payload limit.
fn read_text(path: &Path, limits: &LimitsConfig) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    let text = artifact::read_limited(&bytes, limits)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    Ok(text.to_string())
}

/// Collect source files with a known extension under `root`.
fn collect_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            // Skip hidden directories
            if e.file_type().is_dir() && e.depth() > 0 && name.starts_with('.') {
                return false;
            }
            // Skip dependency and build directories
            if e.file_type().is_dir()
                && (name == "vendor"
                    || name == "node_modules"
                    || name == "target"
                    || name == "__pycache__")
            {
                return false;
            }
            true
        })
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if Language::is_known_extension(ext) {
                files.push(path.to_path_buf());
            }
        }
    }

    Ok(files)
}

/// Analyze one file.
fn analyze_file(
    path: &Path,
    language: Option<Language>,
    limits: &LimitsConfig,
) -> anyhow::Result<FileReport> {
    let text = read_text(path, limits)?;
    let language = language.unwrap_or_else(|| detect::detect(&display_name(path), &text));
    Ok(FileReport {
        path: path.to_string_lossy().to_string(),
        analysis: analysis::scan(&text, language),
    })
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    if !check_report_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let config = load_config(config_path)?;

    let mut files = Vec::new();
    for path in &args.paths {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("Error: cannot access path {:?}: {}", path, e);
                return Ok(EXIT_ERROR);
            }
        };
        if metadata.is_dir() {
            files.extend(collect_files(path)?);
        } else {
            files.push(path.clone());
        }
    }

    if files.is_empty() {
        eprintln!("Warning: no source files to analyze");
        return Ok(EXIT_SUCCESS);
    }

    let mut reports = files
        .par_iter()
        .map(|path| analyze_file(path, args.language, &config.limits))
        .collect::<anyhow::Result<Vec<_>>>()?;
    reports.sort_by(|a, b| a.path.cmp(&b.path));

    match args.format.as_str() {
        "json" => report::write_analysis_json(&reports)?,
        _ => report::write_analysis_pretty(&reports, args.min_coverage),
    }

    let coverage = report::Totals::from_reports(&reports).documentation_percentage;
    match args.min_coverage {
        Some(min) if coverage < min => Ok(EXIT_FAILED),
        _ => Ok(EXIT_SUCCESS),
    }
}

fn spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Generate, then regenerate once per feedback entry.
async fn generate_variants(
    synth: &Synthesizer,
    artifact: &SourceArtifact,
    feedback: &[String],
    pb: &ProgressBar,
) -> Result<AnnotatedVariant, GenerationError> {
    pb.set_message(format!("Documenting {}", artifact.filename));
    let mut variant = synth.generate(artifact).await?;
    for (i, text) in feedback.iter().enumerate() {
        pb.set_message(format!(
            "Regenerating {} ({}/{})",
            artifact.filename,
            i + 1,
            feedback.len()
        ));
        variant = synth.regenerate(artifact, &variant, Some(text)).await?;
    }
    Ok(variant)
}

/// Run the generate command.
pub fn run_generate(args: &GenerateArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    if !check_report_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let mut config = load_config(config_path)?;
    if let Some(model) = &args.model {
        config.annotator.model = model.clone();
        config::validate(&config)?;
    }

    let bytes = std::fs::read(&args.file)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", args.file.display(), e))?;
    let artifact = artifact::ingest(&display_name(&args.file), &bytes, &config.limits)?;

    let annotator = OllamaAnnotator::new(&config.annotator)?;
    let synth = Synthesizer::new(Arc::new(annotator), SynthesisOptions::from_config(&config));

    let runtime = tokio::runtime::Runtime::new()?;
    let pb = spinner(args.format == "pretty");
    let result = runtime.block_on(generate_variants(&synth, &artifact, &args.feedback, &pb));
    pb.finish_and_clear();
    let variant = result?;

    if let Some(output) = &args.output {
        std::fs::write(output, &variant.annotated_text)
            .map_err(|e| anyhow::anyhow!("cannot write {}: {}", output.display(), e))?;
    }

    let path_str = args.file.to_string_lossy().to_string();
    let output_str = args.output.as_ref().map(|p| p.to_string_lossy().to_string());
    let generation = GenerationReport {
        path: &path_str,
        annotator: synth.annotator_name(),
        baseline: &artifact.baseline,
        variant: &variant,
        output: output_str.as_deref(),
    };

    match args.format.as_str() {
        "json" => report::write_generation_json(&generation)?,
        _ => {
            report::write_generation_pretty(&generation);
            if args.output.is_none() {
                print!("{}", variant.annotated_text);
            }
        }
    }

    if variant.has_drift() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the preview command.
pub fn run_preview(args: &PreviewArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let config = load_config(config_path)?;
    let text = read_text(&args.file, &config.limits)?;
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| display_name(&args.file));

    let exporter = Exporter::new(ExportOptions::from_config(&config.export));
    print!("{}", exporter.preview(&text, &name)?);
    Ok(EXIT_SUCCESS)
}

/// Run the export command.
pub fn run_export(args: &ExportArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let format: ExportFormat = match args.format.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let config = load_config(config_path)?;
    let text = read_text(&args.file, &config.limits)?;
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| display_name(&args.file));

    let exporter = Exporter::new(ExportOptions::from_config(&config.export));
    let artifact = exporter.render(&text, &name, format)?;

    if !args.output_dir.as_os_str().is_empty() && !args.output_dir.exists() {
        std::fs::create_dir_all(&args.output_dir)?;
    }
    let target = args.output_dir.join(&artifact.suggested_filename);
    std::fs::write(&target, &artifact.bytes)
        .map_err(|e| anyhow::anyhow!("cannot write {}: {}", target.display(), e))?;

    println!(
        "Wrote {} ({}, {} bytes)",
        target.display(),
        artifact.mime_type,
        artifact.bytes.len()
    );
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, config::TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to point at your model endpoint", args.output.display());
    println!("  2. Run: codedoc generate <file> --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
