//! Configuration schema for codedoc.
//!
//! Every field is optional; a missing file means all defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file names searched in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["codedoc.yaml", ".codedoc.yaml"];

/// Commented config written by `codedoc init`.
pub const TEMPLATE: &str = include_str!("templates/default.yaml");

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub annotator: AnnotatorConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse a config from YAML text. An empty document gives the defaults.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load an explicit config file, or discover one in `dir`, or fall back to defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => discover(dir),
        };
        let config = match &path {
            Some(p) => Self::parse_file(p)
                .map_err(|e| anyhow::anyhow!("parsing config {}: {}", p.display(), e))?,
            None => Self::default(),
        };
        validate(&config)?;
        Ok((config, path))
    }
}

/// Find a config file in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Input size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LimitsConfig {
    /// Largest accepted source payload in bytes (default: 5 MiB)
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Longest accepted regeneration feedback in characters (default: 4000)
    #[serde(default = "default_max_feedback_chars")]
    pub max_feedback_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            max_feedback_chars: default_max_feedback_chars(),
        }
    }
}

fn default_max_payload_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_max_feedback_chars() -> usize {
    4000
}

/// Documentation synthesis settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SynthesisConfig {
    /// Allowed difference in function and class counts before drift is flagged (default: 0)
    #[serde(default)]
    pub drift_tolerance: usize,
    /// Deadline for one annotation call in milliseconds (default: 120000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            drift_tolerance: 0,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    120_000
}

/// Annotation service settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AnnotatorConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature passed to the model; the model's default when unset.
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: None,
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

/// Export document settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExportConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub footer: Option<String>,
    /// Whether documents carry a generation timestamp (default: true)
    #[serde(default = "default_true")]
    pub include_timestamp: bool,
    /// TrueType font embedded in PDF exports instead of the built-in fonts
    #[serde(default)]
    pub pdf_font: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            footer: None,
            include_timestamp: true,
            pdf_font: None,
        }
    }
}

fn default_title() -> String {
    "Code Documentation".to_string()
}

fn default_true() -> bool {
    true
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.limits.max_payload_bytes == 0 {
        anyhow::bail!("limits.max_payload_bytes must be greater than zero");
    }
    if config.limits.max_feedback_chars == 0 {
        anyhow::bail!("limits.max_feedback_chars must be greater than zero");
    }
    if config.synthesis.timeout_ms == 0 {
        anyhow::bail!("synthesis.timeout_ms must be greater than zero");
    }

    let url = reqwest::Url::parse(&config.annotator.endpoint).map_err(|e| {
        anyhow::anyhow!(
            "invalid annotator.endpoint {:?}: {}",
            config.annotator.endpoint,
            e
        )
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!(
            "invalid annotator.endpoint {:?}: scheme must be http or https",
            config.annotator.endpoint
        );
    }

    if config.annotator.model.trim().is_empty() {
        anyhow::bail!("annotator.model must not be empty");
    }
    if let Some(t) = config.annotator.temperature {
        if !(0.0..=2.0).contains(&t) {
            anyhow::bail!("annotator.temperature {} is outside 0.0..=2.0", t);
        }
    }

    Ok(())
}
