//! Language detection from filename and content.
//!
//! Resolution order:
//! 1. Exact extension match against the static table in [`Language`].
//! 2. Keyword/token scoring over a small signature set per language.
//! 3. [`Language::DEFAULT`] when the scores tie at the top or nothing matched.
//!
//! Detection never fails. Size limits are enforced at ingestion, and the
//! heuristic pass only looks at a bounded prefix of the content.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::language::Language;

/// Bytes of content examined by the heuristic pass.
const HEURISTIC_WINDOW: usize = 64 * 1024;

/// Occurrences of a single signature counted towards the score.
const MAX_HITS_PER_SIGNATURE: usize = 5;

/// A weighted content signature.
struct Signature {
    language: Language,
    regex: Regex,
    weight: u32,
}

fn sig(language: Language, pattern: &str, weight: u32) -> Signature {
    Signature {
        language,
        regex: Regex::new(pattern).unwrap(),
        weight,
    }
}

static SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(|| {
    use Language::*;
    vec![
        // Python
        sig(Python, r"(?m)^\s*(async\s+)?def\s+\w+\s*\(.*\)\s*(->.*)?:\s*$", 3),
        sig(Python, r"(?m)^\s*class\s+\w+(\(.*\))?:\s*$", 3),
        sig(Python, r"(?m)^\s*(from\s+[\w.]+\s+)?import\s+[\w.]+(\s+as\s+\w+)?\s*$", 1),
        sig(Python, r"(?m)^\s*(elif\s.*|else|try|finally|except.*):\s*$", 2),
        sig(Python, r#"__name__\s*==\s*['"]__main__['"]"#, 4),
        sig(Python, r"\bself\.\w+", 1),
        sig(Python, r"(?m)^\s*print\(", 1),
        // PHP
        sig(Php, r"<\?php", 10),
        sig(Php, r"\$\w+\s*=", 2),
        sig(Php, r"\$this->", 3),
        sig(Php, r"(?m)^\s*echo\s", 2),
        sig(Php, r"(?m)^\s*namespace\s+[\w\\]+;", 2),
        // Go
        sig(Go, r"(?m)^\s*package\s+\w+\s*$", 5),
        sig(Go, r"(?m)^\s*func\s", 3),
        sig(Go, r":=", 1),
        sig(Go, r"(?m)^\s*import\s*\(", 2),
        sig(Go, r"\bfmt\.\w+", 2),
        sig(Go, r"\bchan\b|\bgo\s+func\b", 2),
        // JavaScript
        sig(JavaScript, r"(?m)^\s*(export\s+)?(async\s+)?function\s*\*?\s*\w*\s*\(", 2),
        sig(JavaScript, r"(?m)^\s*(const|let|var)\s+[\w$]+\s*=", 1),
        sig(JavaScript, r"=>", 1),
        sig(JavaScript, r"\bconsole\.\w+\(", 3),
        sig(JavaScript, r"\brequire\(\s*['\x22]", 2),
        sig(JavaScript, r"(?m)^\s*(import|export)\s.*\bfrom\s+['\x22]", 2),
        sig(JavaScript, r"\b(document|window)\.\w+", 2),
        sig(JavaScript, r"===|!==", 1),
        // Java
        sig(Java, r"(?m)^\s*import\s+java\.", 5),
        sig(Java, r"(?m)^\s*package\s+[\w.]+;", 4),
        sig(Java, r"\bSystem\.out\.print", 4),
        sig(Java, r"public\s+static\s+void\s+main\s*\(\s*String", 5),
        sig(Java, r"(?m)^\s*(public|private|protected)\s+(abstract\s+|final\s+)*class\s+\w+", 2),
        sig(Java, r"@Override\b", 2),
        sig(Java, r"\bString\[\]", 1),
        // C++
        sig(Cpp, r"(?m)^\s*#\s*include\s*[<\x22]", 5),
        sig(Cpp, r"\bstd::", 3),
        sig(Cpp, r"\bcout\s*<<|\bcin\s*>>", 3),
        sig(Cpp, r"(?m)^\s*template\s*<", 3),
        sig(Cpp, r"\bnullptr\b", 2),
        sig(Cpp, r"(?m)^\s*#\s*(define|ifndef|pragma)\b", 2),
        sig(Cpp, r"\bprintf\s*\(", 1),
        // C#
        sig(CSharp, r"(?m)^\s*using\s+System(\.[\w.]+)?;", 5),
        sig(CSharp, r"\bConsole\.Write(Line)?\s*\(", 4),
        sig(CSharp, r"\{\s*get;\s*(private\s+)?set;\s*\}", 3),
        sig(CSharp, r"(?m)^\s*namespace\s+[\w.]+", 1),
        sig(CSharp, r"\b(public|private|internal)\s+(static\s+)?(async\s+)?(void|string|int|bool|Task)\b", 1),
        sig(CSharp, r"\bstring\s+\w+\s*[=;,)]", 1),
        // Ruby
        sig(Ruby, r"(?m)^\s*def\s+(self\.)?\w+[?!]?\s*(\(.*\))?\s*$", 3),
        sig(Ruby, r"(?m)^\s*end\s*$", 2),
        sig(Ruby, r"(?m)^\s*puts\s", 2),
        sig(Ruby, r"(?m)^\s*require(_relative)?\s+['\x22]", 2),
        sig(Ruby, r"\battr_(accessor|reader|writer)\b", 4),
        sig(Ruby, r"\.each\s+do\s*\|", 3),
        sig(Ruby, r"(?m)^\s*module\s+[A-Z]\w*\s*$", 2),
    ]
});

/// Detect the language of a source file.
///
/// The extension always wins when it is known, even if the content looks
/// like another language.
pub fn detect(filename: &str, content: &str) -> Language {
    if let Some(lang) = extension_of(filename).and_then(Language::from_extension) {
        return lang;
    }
    detect_from_content(content)
}

/// Extract the final extension of a filename, if any.
pub(crate) fn extension_of(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|e| e.to_str())
}

/// Score every language against the content and pick the best one.
pub fn detect_from_content(content: &str) -> Language {
    let scores = score_content(content);
    let best = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
    if best == 0 {
        return Language::DEFAULT;
    }
    let mut leaders = scores.iter().filter(|(_, s)| *s == best);
    match (leaders.next(), leaders.next()) {
        (Some((lang, _)), None) => *lang,
        _ => Language::DEFAULT,
    }
}

/// Heuristic scores per language, in [`Language::ALL`] order.
pub fn score_content(content: &str) -> Vec<(Language, u32)> {
    let window = bounded_prefix(content, HEURISTIC_WINDOW);
    let mut scores: Vec<(Language, u32)> = Language::ALL.iter().map(|l| (*l, 0)).collect();

    for signature in SIGNATURES.iter() {
        let hits = signature
            .regex
            .find_iter(window)
            .take(MAX_HITS_PER_SIGNATURE)
            .count() as u32;
        if hits > 0 {
            if let Some(entry) = scores.iter_mut().find(|(l, _)| *l == signature.language) {
                entry.1 += hits * signature.weight;
            }
        }
    }

    // Python is the only candidate without statement terminators.
    if let Some(entry) = scores.iter_mut().find(|(l, _)| *l == Language::Python) {
        if entry.1 > 0 && !window.lines().any(|l| l.trim_end().ends_with(';')) {
            entry.1 += 2;
        }
    }

    scores
}

/// Longest prefix of `s` no longer than `max` bytes, cut on a char boundary.
fn bounded_prefix(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_wins_over_content() {
        let php = "<?php\necho $x;\n$y = 1;\n";
        assert_eq!(detect("script.py", php), Language::Python);
        assert_eq!(detect("notes.PY", ""), Language::Python);
    }

    #[test]
    fn test_heuristics_when_extension_unknown() {
        let python = "import os\n\ndef main(argv):\n    print(argv)\n\nif __name__ == \"__main__\":\n    main([])\n";
        assert_eq!(detect("script", python), Language::Python);

        let php = "<?php\nfunction greet($name) {\n    echo \"hi\";\n}\n";
        assert_eq!(detect("index.txt", php), Language::Php);

        let go = "package main\n\nimport \"fmt\"\n\nfunc main() {\n    x := 1\n    fmt.Println(x)\n}\n";
        assert_eq!(detect("main", go), Language::Go);

        let ruby = "require 'json'\n\nclass Greeter\n  attr_reader :name\n\n  def greet\n    puts name\n  end\nend\n";
        assert_eq!(detect("greeter", ruby), Language::Ruby);

        let java = "package app;\n\nimport java.util.List;\n\npublic class Main {\n    public static void main(String[] args) {\n        System.out.println(\"hi\");\n    }\n}\n";
        assert_eq!(detect("Main", java), Language::Java);

        let cpp = "#include <iostream>\n\nint main() {\n    std::cout << \"hi\";\n    return 0;\n}\n";
        assert_eq!(detect("main", cpp), Language::Cpp);

        let csharp = "using System;\n\nnamespace App {\n    class Program {\n        static void Main() {\n            Console.WriteLine(\"hi\");\n        }\n    }\n}\n";
        assert_eq!(detect("Program", csharp), Language::CSharp);

        let js = "const fs = require('fs');\nconsole.log(fs);\n";
        assert_eq!(detect("tool", js), Language::JavaScript);
    }

    #[test]
    fn test_zero_signal_defaults() {
        assert_eq!(detect("README", "hello world"), Language::DEFAULT);
        assert_eq!(detect("empty", ""), Language::DEFAULT);
    }

    #[test]
    fn test_bounded_prefix_respects_char_boundary() {
        let s = "aé";
        assert_eq!(bounded_prefix(s, 2), "a");
        assert_eq!(bounded_prefix(s, 10), s);
    }
}
