//! Output formatting for codedoc results.
//!
//! Two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{self, Analysis, DefinitionKind, StructuralStatistics};
use crate::synth::{AnnotatedVariant, GenerationDrift};

// =============================================================================
// Report data
// =============================================================================

/// Analysis of one file, as reported.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub analysis: Analysis,
}

/// Coverage summed over every reported file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub files: usize,
    pub total_lines: usize,
    pub functions_count: usize,
    pub classes_count: usize,
    pub documented_functions_count: usize,
    pub documentation_percentage: u8,
}

impl Totals {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut totals = Totals {
            files: reports.len(),
            ..Totals::default()
        };
        for r in reports {
            let s = &r.analysis.statistics;
            totals.total_lines += s.total_lines;
            totals.functions_count += s.functions_count;
            totals.classes_count += s.classes_count;
            totals.documented_functions_count += s.documented_functions_count;
        }
        totals.documentation_percentage =
            analysis::percentage(totals.documented_functions_count, totals.functions_count);
        totals
    }
}

/// Everything reported about a generate run.
#[derive(Debug, Clone)]
pub struct GenerationReport<'a> {
    pub path: &'a str,
    pub annotator: &'a str,
    pub baseline: &'a StructuralStatistics,
    pub variant: &'a AnnotatedVariant,
    /// Where the annotated text was written, if anywhere.
    pub output: Option<&'a str>,
}

// =============================================================================
// JSON Format
// =============================================================================

/// JSON report for the analyze command.
#[derive(Serialize, Deserialize)]
pub struct JsonAnalysisReport {
    pub version: String,
    pub files: Vec<JsonFileReport>,
    pub totals: Totals,
}

#[derive(Serialize, Deserialize)]
pub struct JsonFileReport {
    pub path: String,
    pub language: String,
    pub statistics: StructuralStatistics,
    pub undocumented: Vec<JsonDefinition>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonDefinition {
    pub kind: String,
    pub name: String,
    pub line: usize,
}

/// JSON report for the generate command.
#[derive(Serialize, Deserialize)]
pub struct JsonGenerationReport {
    pub version: String,
    pub path: String,
    pub artifact_id: String,
    pub annotator: String,
    pub generation_seq: u64,
    pub generated_at: String,
    pub baseline: StructuralStatistics,
    pub annotated: StructuralStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift: Option<JsonDrift>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// The annotated text, when it was not written to a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonDrift {
    pub baseline_functions: usize,
    pub annotated_functions: usize,
    pub baseline_classes: usize,
    pub annotated_classes: usize,
}

impl From<&GenerationDrift> for JsonDrift {
    fn from(d: &GenerationDrift) -> Self {
        JsonDrift {
            baseline_functions: d.baseline_functions,
            annotated_functions: d.annotated_functions,
            baseline_classes: d.baseline_classes,
            annotated_classes: d.annotated_classes,
        }
    }
}

/// Build the analyze JSON document.
pub fn analysis_json(reports: &[FileReport]) -> JsonAnalysisReport {
    let files = reports
        .iter()
        .map(|r| JsonFileReport {
            path: r.path.clone(),
            language: r.analysis.language.as_str().to_string(),
            statistics: r.analysis.statistics,
            undocumented: r
                .analysis
                .undocumented_functions()
                .map(|d| JsonDefinition {
                    kind: d.kind.to_string(),
                    name: d.name.clone(),
                    line: d.line,
                })
                .collect(),
        })
        .collect();

    JsonAnalysisReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        files,
        totals: Totals::from_reports(reports),
    }
}

/// Build the generate JSON document.
pub fn generation_json(report: &GenerationReport<'_>) -> JsonGenerationReport {
    let v = report.variant;
    JsonGenerationReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: report.path.to_string(),
        artifact_id: v.artifact_id.to_string(),
        annotator: report.annotator.to_string(),
        generation_seq: v.generation_seq,
        generated_at: v.generated_at.to_rfc3339(),
        baseline: *report.baseline,
        annotated: v.statistics,
        drift: v.drift.as_ref().map(JsonDrift::from),
        feedback: v.feedback.clone(),
        output: report.output.map(str::to_string),
        text: match report.output {
            Some(_) => None,
            None => Some(v.annotated_text.clone()),
        },
    }
}

/// Write analyze results in JSON format.
pub fn write_analysis_json(reports: &[FileReport]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&analysis_json(reports))?;
    println!("{}", json);
    Ok(())
}

/// Write generate results in JSON format.
pub fn write_generation_json(report: &GenerationReport<'_>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&generation_json(report))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn write_header() {
    println!();
    print!("  ");
    print!("{}", "codedoc".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
}

/// Write analyze results in pretty (human-readable) format.
pub fn write_analysis_pretty(reports: &[FileReport], min_coverage: Option<u8>) {
    write_header();

    for r in reports {
        write_file_report(r);
        println!();
    }

    let totals = Totals::from_reports(reports);
    if reports.len() > 1 {
        write_totals(&totals);
        println!();
    }

    if let Some(min) = min_coverage {
        write_coverage_status(totals.documentation_percentage, min);
        println!();
    }
}

fn write_file_report(r: &FileReport) {
    let s = &r.analysis.statistics;
    print!("  {}", r.path.blue());
    println!("  {}", format!("({})", r.analysis.language.display_name()).dimmed());

    print!("    Lines: {}", s.total_lines);
    print!("  Functions: {}", s.functions_count);
    print!("  Classes: {}", s.classes_count);
    print!("  Documented: {}/{} (", s.documented_functions_count, s.functions_count);
    write_colored_percentage(s.documentation_percentage);
    println!("%)");

    let undocumented: Vec<_> = r.analysis.undocumented_functions().collect();
    if undocumented.is_empty() {
        return;
    }
    println!();
    println!("    {} ({}):", "Undocumented".bold(), undocumented.len());
    for d in undocumented {
        let kind = match d.kind {
            DefinitionKind::Function => "fn",
            DefinitionKind::Class => "class",
        };
        print!("      {:<6}", kind.dimmed());
        print!("{}", d.name);
        println!("{}", format!(":{}", d.line).dimmed());
    }
}

fn write_totals(totals: &Totals) {
    println!("  {}", "Totals:".bold());
    println!(
        "    {} files, {} lines, {} functions, {} classes",
        totals.files, totals.total_lines, totals.functions_count, totals.classes_count
    );
    print!(
        "    Documented: {}/{} (",
        totals.documented_functions_count, totals.functions_count
    );
    write_colored_percentage(totals.documentation_percentage);
    println!("%)");
}

fn write_coverage_status(coverage: u8, min: u8) {
    print!("  {}", format!("Minimum coverage: {}%", min).dimmed());
    print!("  Coverage: ");
    write_colored_percentage(coverage);
    print!("%  ");
    if coverage >= min {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

fn write_colored_percentage(p: u8) {
    match p {
        p if p >= 90 => print!("{}", p.to_string().green().bold()),
        p if p >= 75 => print!("{}", p.to_string().green()),
        p if p >= 50 => print!("{}", p.to_string().yellow()),
        p if p >= 25 => print!("{}", p.to_string().yellow().bold()),
        _ => print!("{}", p.to_string().red()),
    }
}

/// Write generate results in pretty (human-readable) format.
pub fn write_generation_pretty(report: &GenerationReport<'_>) {
    let v = report.variant;
    write_header();

    print!("  {}", "Source:    ".dimmed());
    println!("{}", report.path);
    print!("  {}", "Annotator: ".dimmed());
    println!("{}", report.annotator);
    print!("  {}", "Variant:   ".dimmed());
    println!("#{}", v.generation_seq);
    if let Some(feedback) = &v.feedback {
        print!("  {}", "Feedback:  ".dimmed());
        println!("{:?}", feedback);
    }
    if let Some(output) = report.output {
        print!("  {}", "Output:    ".dimmed());
        println!("{}", output);
    }
    println!();

    println!("  {}", "Statistics:".bold());
    println!("    {:<22} {:>8} {:>8}", "", "before", "after");
    write_stat_row("Lines", report.baseline.total_lines, v.statistics.total_lines);
    write_stat_row(
        "Functions",
        report.baseline.functions_count,
        v.statistics.functions_count,
    );
    write_stat_row("Classes", report.baseline.classes_count, v.statistics.classes_count);
    write_stat_row(
        "Documented functions",
        report.baseline.documented_functions_count,
        v.statistics.documented_functions_count,
    );
    print!(
        "    {:<22} {:>7}% ",
        "Coverage", report.baseline.documentation_percentage
    );
    print!("{:>7}", "");
    write_colored_percentage(v.statistics.documentation_percentage);
    println!("%");
    println!();

    match &v.drift {
        Some(drift) => {
            print!("  {}", "✗ DRIFT".red());
            println!("  {}", drift);
            println!(
                "    {}",
                "the annotated text changed the code structure; review before exporting"
                    .dimmed()
            );
        }
        None => println!("  {}", "✓ Structure preserved".green()),
    }
    println!();
}

fn write_stat_row(label: &str, before: usize, after: usize) {
    let after_text = format!("{:>8}", after);
    let after_text = if after == before {
        after_text.normal()
    } else {
        after_text.yellow()
    };
    println!("    {:<22} {:>8} {}", label, before, after_text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::scan;
    use crate::language::Language;
    use crate::synth::AnnotatedVariant;
    use chrono::Utc;
    use uuid::Uuid;

    fn report(path: &str, text: &str, language: Language) -> FileReport {
        FileReport {
            path: path.to_string(),
            analysis: scan(text, language),
        }
    }

    #[test]
    fn test_totals_sum_files() {
        let reports = vec![
            report(
                "a.py",
                "def a():\n    \"\"\"Doc.\"\"\"\n\ndef b():\n    pass\n",
                Language::Python,
            ),
            report("b.go", "// C does c.\nfunc c() {}\n", Language::Go),
        ];
        let totals = Totals::from_reports(&reports);
        assert_eq!(totals.files, 2);
        assert_eq!(totals.functions_count, 3);
        assert_eq!(totals.documented_functions_count, 2);
        assert_eq!(totals.documentation_percentage, 67);
        assert_eq!(totals.total_lines, 7);
    }

    #[test]
    fn test_totals_empty() {
        let totals = Totals::from_reports(&[]);
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn test_analysis_json_lists_undocumented() {
        let reports = vec![report(
            "m.js",
            "/** Documented. */\nfunction a() {}\nfunction b() {}\n",
            Language::JavaScript,
        )];
        let json = analysis_json(&reports);
        assert_eq!(json.files.len(), 1);
        assert_eq!(json.files[0].language, "javascript");
        assert_eq!(json.files[0].undocumented.len(), 1);
        assert_eq!(json.files[0].undocumented[0].name, "b");
        assert_eq!(json.files[0].undocumented[0].line, 3);
        assert_eq!(json.files[0].undocumented[0].kind, "function");

        let value = serde_json::to_value(&json).unwrap();
        assert_eq!(value["totals"]["documentation_percentage"], 50);
        assert_eq!(value["files"][0]["statistics"]["functions_count"], 2);
    }

    #[test]
    fn test_generation_json() {
        let baseline = StructuralStatistics {
            total_lines: 2,
            functions_count: 1,
            ..StructuralStatistics::default()
        };
        let variant = AnnotatedVariant {
            artifact_id: Uuid::nil(),
            annotated_text: "# Doc.\ndef f():\n    pass\n".to_string(),
            statistics: StructuralStatistics {
                total_lines: 3,
                functions_count: 1,
                documented_functions_count: 1,
                documentation_percentage: 100,
                ..StructuralStatistics::default()
            },
            generated_at: Utc::now(),
            generation_seq: 2,
            drift: None,
            feedback: Some("shorter".to_string()),
        };
        let json = generation_json(&GenerationReport {
            path: "f.py",
            annotator: "ollama",
            baseline: &baseline,
            variant: &variant,
            output: None,
        });
        let value = serde_json::to_value(&json).unwrap();
        assert_eq!(value["generation_seq"], 2);
        assert_eq!(value["baseline"]["documentation_percentage"], 0);
        assert_eq!(value["annotated"]["documentation_percentage"], 100);
        assert_eq!(value["feedback"], "shorter");
        assert!(value.get("drift").is_none());
        assert!(value.get("output").is_none());
        assert_eq!(value["text"], "# Doc.\ndef f():\n    pass\n");
    }
}
