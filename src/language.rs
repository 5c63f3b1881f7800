//! The closed set of supported source languages.

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// A supported source language.
///
/// Every detected artifact carries one of these; there is no "unknown"
/// variant. Ambiguous input resolves to [`Language::DEFAULT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Java,
    Cpp,
    CSharp,
    Php,
    Ruby,
    Go,
}

/// Static extension table (lowercase, without the dot).
static EXTENSIONS: phf::Map<&'static str, Language> = phf_map! {
    "py" => Language::Python,
    "js" => Language::JavaScript,
    "jsx" => Language::JavaScript,
    "mjs" => Language::JavaScript,
    "cjs" => Language::JavaScript,
    "ts" => Language::JavaScript,
    "tsx" => Language::JavaScript,
    "java" => Language::Java,
    "cpp" => Language::Cpp,
    "cc" => Language::Cpp,
    "cxx" => Language::Cpp,
    "hpp" => Language::Cpp,
    "hh" => Language::Cpp,
    "h" => Language::Cpp,
    "c" => Language::Cpp,
    "cs" => Language::CSharp,
    "php" => Language::Php,
    "rb" => Language::Ruby,
    "go" => Language::Go,
};

impl Language {
    /// Fallback when neither the extension nor the content decides.
    pub const DEFAULT: Language = Language::JavaScript;

    /// All languages in declaration order.
    pub const ALL: [Language; 8] = [
        Language::Python,
        Language::JavaScript,
        Language::Java,
        Language::Cpp,
        Language::CSharp,
        Language::Php,
        Language::Ruby,
        Language::Go,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::Go => "go",
        }
    }

    /// Human-readable name for reports and prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::Java => "Java",
            Language::Cpp => "C++",
            Language::CSharp => "C#",
            Language::Php => "PHP",
            Language::Ruby => "Ruby",
            Language::Go => "Go",
        }
    }

    /// Info string used on Markdown code fences.
    pub fn fence_tag(&self) -> &'static str {
        match self {
            Language::CSharp => "csharp",
            Language::Cpp => "cpp",
            other => other.as_str(),
        }
    }

    /// Look up a language by file extension (with or without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        EXTENSIONS.get(ext.as_str()).copied()
    }

    /// Whether `ext` is a known source extension.
    pub fn is_known_extension(ext: &str) -> bool {
        Self::from_extension(ext).is_some()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            "java" => Ok(Language::Java),
            "cpp" | "c++" | "c" => Ok(Language::Cpp),
            "csharp" | "c#" | "cs" => Ok(Language::CSharp),
            "php" => Ok(Language::Php),
            "ruby" | "rb" => Ok(Language::Ruby),
            "go" | "golang" => Ok(Language::Go),
            _ => Err(format!("unsupported language: {}", s)),
        }
    }
}
