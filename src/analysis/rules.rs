//! Per-language definition patterns.
//!
//! Every pattern is anchored at statement start (leading whitespace allowed)
//! and runs against the masked code view produced by the lexer. Patterns that
//! need confirmation end right after the opening parenthesis of the
//! parameter list, so the scanner can continue from `match.end()`.
//!
//! A closure bound to a name where it is declared counts as a function in
//! every language (`const f = () =>`, `f := func(`, `$f = function (`,
//! `f = lambda`, `f = ->`, `auto f = [`). Closures passed as arguments do not.

use once_cell::sync::Lazy;
use regex::Regex;

use super::lexer::LexSpec;
use crate::language::Language;

/// How a function pattern match is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FnForm {
    /// The match alone is a definition (`def`, `func`, `function`).
    Plain,
    /// Typed signature; needs `{`, a forward-declaration `;`, or `=>` after the parameters.
    Signature,
    /// Untyped name; must name the enclosing class (or be `A::A` / `~A`) and open a body.
    Constructor,
    /// Method shorthand, only directly inside a class body.
    ClassMember,
    /// `name = (params) =>`; `class_only` restricts it to class fields.
    Arrow { class_only: bool },
}

pub(crate) struct FnPattern {
    pub regex: Regex,
    pub form: FnForm,
}

/// Pattern tables for one language.
pub(crate) struct LanguageRules {
    pub lex: LexSpec,
    pub functions: Vec<FnPattern>,
    pub classes: Vec<Regex>,
    /// Opens a namespace-like scope that is transparent for declarations.
    pub namespace: Option<Regex>,
    /// Decorator/attribute lines skipped when looking for a preceding comment.
    pub decorator: Option<Regex>,
    /// Grouped type declarations (`type ( ... )` in Go): opener and member pattern.
    pub type_group: Option<(Regex, Regex)>,
    /// Braces delimit scopes that the scanner has to track.
    pub brace_scopes: bool,
    /// Preceding comments must share the definition's indentation.
    pub indent_sensitive: bool,
    /// `=>` can terminate a typed signature (expression-bodied members).
    pub arrow_bodies: bool,
    /// Words that can never be a return type or a definition name.
    pub keywords: &'static [&'static str],
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

fn plain(pattern: &str) -> FnPattern {
    FnPattern {
        regex: re(pattern),
        form: FnForm::Plain,
    }
}

fn with_form(pattern: &str, form: FnForm) -> FnPattern {
    FnPattern {
        regex: re(pattern),
        form,
    }
}

const C_KEYWORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "catch", "return", "new",
    "delete", "throw", "goto", "sizeof", "typeof", "nameof", "await", "yield", "using", "lock",
    "fixed", "synchronized", "default", "operator", "co_return", "co_await", "typedef",
    "namespace", "static_assert", "decltype", "alignof",
];

const SCRIPT_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "do", "else", "new",
    "typeof", "await", "yield", "super", "import",
];

const C_FAMILY_LEX: LexSpec = LexSpec {
    line_comments: &["//"],
    block_comment: Some(("/*", "*/")),
    quotes: &['"', '\''],
    triple_quotes: false,
    multiline_quotes: &[],
    multiline_escapes: true,
    begin_end_blocks: false,
    hash_attributes: false,
};

static PYTHON: Lazy<LanguageRules> = Lazy::new(|| LanguageRules {
    lex: LexSpec {
        line_comments: &["#"],
        block_comment: None,
        quotes: &['"', '\''],
        triple_quotes: true,
        multiline_quotes: &[],
        multiline_escapes: true,
        begin_end_blocks: false,
        hash_attributes: false,
    },
    functions: vec![
        plain(r"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)\s*\("),
        plain(r"^\s*(?P<name>[A-Za-z_]\w*)\s*(?::[^=]+)?=\s*lambda\b"),
    ],
    classes: vec![re(r"^\s*class\s+(?P<name>[A-Za-z_]\w*)\s*[(:]")],
    namespace: None,
    decorator: Some(re(r"^\s*@")),
    type_group: None,
    brace_scopes: false,
    indent_sensitive: true,
    arrow_bodies: false,
    keywords: &[],
});

static RUBY: Lazy<LanguageRules> = Lazy::new(|| LanguageRules {
    lex: LexSpec {
        line_comments: &["#"],
        block_comment: None,
        quotes: &['"', '\''],
        triple_quotes: false,
        multiline_quotes: &[],
        multiline_escapes: true,
        begin_end_blocks: true,
        hash_attributes: false,
    },
    functions: vec![
        plain(
            r"^\s*(?:(?:private|protected|public|module_function)\s+)?def\s+(?:self\.)?(?P<name>[A-Za-z_]\w*[?!=]?|[-+*/%<>=!~\[\]]+)",
        ),
        plain(r"^\s*(?P<name>[a-z_]\w*)\s*=\s*(?:->|lambda\b|proc\b|Proc\.new\b)"),
    ],
    classes: vec![re(r"^\s*(?:class|module)\s+(?P<name>[A-Z][\w:]*)")],
    namespace: None,
    decorator: None,
    type_group: None,
    brace_scopes: false,
    indent_sensitive: false,
    arrow_bodies: false,
    keywords: &[],
});

static PHP: Lazy<LanguageRules> = Lazy::new(|| LanguageRules {
    lex: LexSpec {
        line_comments: &["//", "#"],
        hash_attributes: true,
        ..C_FAMILY_LEX
    },
    functions: vec![
        plain(
            r"^\s*(?:(?:abstract|final|public|private|protected|static)\s+)*function\s+&?(?P<name>[A-Za-z_]\w*)\s*\(",
        ),
        plain(r"^\s*\$(?P<name>[A-Za-z_]\w*)\s*=\s*(?:static\s+)?(?:function|fn)\s*&?\s*\("),
    ],
    classes: vec![re(
        r"^\s*(?:(?:abstract|final|readonly)\s+)*(?:class|interface|trait|enum)\s+(?P<name>[A-Za-z_]\w*)",
    )],
    namespace: None,
    decorator: Some(re(r"^\s*#\[")),
    type_group: None,
    brace_scopes: false,
    indent_sensitive: false,
    arrow_bodies: false,
    keywords: &[],
});

static JAVASCRIPT: Lazy<LanguageRules> = Lazy::new(|| LanguageRules {
    lex: LexSpec {
        multiline_quotes: &['`'],
        ..C_FAMILY_LEX
    },
    functions: vec![
        plain(
            r"^\s*(?:export\s+(?:default\s+)?)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\(",
        ),
        plain(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?function\b",
        ),
        plain(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?[A-Za-z_$][\w$]*\s*=>",
        ),
        with_form(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:<[^>(]*>\s*)?\(",
            FnForm::Arrow { class_only: false },
        ),
        with_form(
            r"^\s*(?:(?:static|public|private|protected|readonly|override)\s+)*(?P<name>#?[A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?\(",
            FnForm::Arrow { class_only: true },
        ),
        with_form(
            r"^\s*(?:(?:static|async|get|set|public|private|protected|override|abstract)\s+)*\*?\s*(?P<name>#?[A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\(",
            FnForm::ClassMember,
        ),
    ],
    classes: vec![re(
        r"^\s*(?:export\s+(?:default\s+)?)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)",
    )],
    namespace: None,
    decorator: Some(re(r"^\s*@")),
    type_group: None,
    brace_scopes: true,
    indent_sensitive: false,
    arrow_bodies: false,
    keywords: SCRIPT_KEYWORDS,
});

static JAVA: Lazy<LanguageRules> = Lazy::new(|| LanguageRules {
    lex: LexSpec {
        triple_quotes: true,
        ..C_FAMILY_LEX
    },
    functions: vec![
        with_form(
            r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^>]*>\s+)?(?P<ret>[A-Za-z_][\w.]*(?:\s*<[^;{}()]*?>)?(?:\s*\[\s*\])*)\s+(?P<name>[A-Za-z_]\w*)\s*\(",
            FnForm::Signature,
        ),
        with_form(
            r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected)\s+)?(?P<name>[A-Z]\w*)\s*\(",
            FnForm::Constructor,
        ),
        plain(
            r"^\s*(?P<ret>(?:[\w.<>,?\[\]]+\s+)+)(?P<name>[A-Za-z_]\w*)\s*=\s*(?:\([^()]*\)|[A-Za-z_]\w*)\s*->",
        ),
    ],
    classes: vec![re(
        r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected|abstract|final|static|sealed|non-sealed|strictfp)\s+)*(?:class|interface|enum|record|@interface)\s+(?P<name>[A-Za-z_]\w*)",
    )],
    namespace: None,
    decorator: Some(re(r"^\s*@\w+")),
    type_group: None,
    brace_scopes: true,
    indent_sensitive: false,
    arrow_bodies: false,
    keywords: C_KEYWORDS,
});

static CSHARP: Lazy<LanguageRules> = Lazy::new(|| LanguageRules {
    lex: C_FAMILY_LEX,
    functions: vec![
        with_form(
            r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|private|protected|internal|static|virtual|override|abstract|async|sealed|extern|unsafe|new|partial|readonly)\s+)*(?P<ret>[A-Za-z_][\w.]*(?:\s*<[^;{}()]*?>)?(?:\s*\?)?(?:\s*\[[\s,]*\])*|\([^()]*\))\s+(?P<name>[A-Za-z_]\w*)\s*(?:<[^>(]*>)?\s*\(",
            FnForm::Signature,
        ),
        with_form(
            r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|private|protected|internal|static)\s+)*(?P<name>[A-Z]\w*)\s*\(",
            FnForm::Constructor,
        ),
        plain(
            r"^\s*(?P<ret>(?:[\w.<>,?\[\]]+\s+)+)(?P<name>[A-Za-z_]\w*)\s*=\s*(?:async\s+)?(?:\([^()]*\)|[A-Za-z_]\w*)\s*=>",
        ),
    ],
    classes: vec![re(
        r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|private|protected|internal|static|abstract|sealed|partial|readonly|ref|unsafe|new|file)\s+)*(?:class|interface|struct|enum|record(?:\s+(?:class|struct))?)\s+(?P<name>[A-Za-z_]\w*)",
    )],
    namespace: Some(re(r"^\s*namespace\b")),
    decorator: Some(re(r"^\s*\[[^\]]*\]\s*$")),
    type_group: None,
    brace_scopes: true,
    indent_sensitive: false,
    arrow_bodies: true,
    keywords: C_KEYWORDS,
});

static CPP: Lazy<LanguageRules> = Lazy::new(|| LanguageRules {
    lex: C_FAMILY_LEX,
    functions: vec![
        with_form(
            r"^\s*(?:template\s*<[^;{}]*>\s*)?(?:(?:static|inline|virtual|explicit|constexpr|consteval|extern|friend|const|volatile|unsigned|signed|long|short|struct|enum|typename|mutable|thread_local)\s+)*(?P<ret>[A-Za-z_][\w:]*(?:\s*<[^;{}()]*?>)?)(?:\s*[*&]+\s*|\s+)(?P<name>~?[A-Za-z_]\w*(?:::~?[A-Za-z_]\w*)*)\s*\(",
            FnForm::Signature,
        ),
        with_form(
            r"^\s*(?:(?:explicit|inline|constexpr)\s+)*(?P<name>~?[A-Za-z_]\w*(?:::~?[A-Za-z_]\w*)*)\s*\(",
            FnForm::Constructor,
        ),
        plain(
            r"^\s*(?:(?:static|inline|const|constexpr)\s+)*(?:auto|std::function\s*<.*>)\s*[&*]?\s+(?P<name>[A-Za-z_]\w*)\s*=\s*\[",
        ),
    ],
    classes: vec![re(
        r"^\s*(?:template\s*<[^;{}]*>\s*)?(?:class|struct|union)\s+(?:[A-Z_][A-Z0-9_]*\s+)?(?P<name>[A-Za-z_]\w*)\s*(?:final\s*)?(?::[^;{]*)?(?:\{.*)?$",
    )],
    namespace: Some(re(r#"^\s*(?:(?:inline\s+)?namespace\b|extern\s+"C")"#)),
    decorator: Some(re(r"^\s*template\s*<[^;{}]*>\s*$")),
    type_group: None,
    brace_scopes: true,
    indent_sensitive: false,
    arrow_bodies: false,
    keywords: C_KEYWORDS,
});

static GO: Lazy<LanguageRules> = Lazy::new(|| LanguageRules {
    lex: LexSpec {
        multiline_quotes: &['`'],
        multiline_escapes: false,
        ..C_FAMILY_LEX
    },
    functions: vec![
        plain(
            r"^\s*func\s+(?:\([^)]*\)\s*)?(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*\(",
        ),
        plain(r"^\s*(?P<name>[A-Za-z_]\w*)\s*:=\s*func\s*\("),
        plain(r"^\s*var\s+(?P<name>[A-Za-z_]\w*)(?:\s+[^=]+?)?\s*=\s*func\s*\("),
    ],
    classes: vec![re(
        r"^\s*type\s+(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\]\s*)?(?:struct|interface)\b",
    )],
    namespace: None,
    decorator: None,
    type_group: Some((
        re(r"^\s*type\s*\(\s*$"),
        re(r"^\s*(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\]\s*)?(?:struct|interface)\b"),
    )),
    brace_scopes: false,
    indent_sensitive: false,
    arrow_bodies: false,
    keywords: &[],
});

/// Pattern tables for a language, initialised once per process.
pub(crate) fn rules_for(language: Language) -> &'static LanguageRules {
    match language {
        Language::Python => &PYTHON,
        Language::JavaScript => &JAVASCRIPT,
        Language::Java => &JAVA,
        Language::Cpp => &CPP,
        Language::CSharp => &CSHARP,
        Language::Php => &PHP,
        Language::Ruby => &RUBY,
        Language::Go => &GO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rule_tables_compile() {
        for lang in Language::ALL {
            let rules = rules_for(lang);
            assert!(!rules.functions.is_empty(), "{} has no function patterns", lang);
            assert!(!rules.classes.is_empty(), "{} has no class patterns", lang);
            for p in &rules.functions {
                assert!(
                    p.regex.capture_names().any(|n| n == Some("name")),
                    "{} function pattern lacks a name group",
                    lang
                );
            }
        }
    }

    #[test]
    fn test_java_signature_captures() {
        let p = &rules_for(Language::Java).functions[0];
        let caps = p
            .regex
            .captures("    public static Map<String, List<Integer>> build(")
            .unwrap();
        assert_eq!(&caps["ret"], "Map<String, List<Integer>>");
        assert_eq!(&caps["name"], "build");
    }

    #[test]
    fn test_cpp_signature_captures_qualified_names() {
        let p = &rules_for(Language::Cpp).functions[0];
        let caps = p.regex.captures("std::string Parser::next_token(").unwrap();
        assert_eq!(&caps["name"], "Parser::next_token");
        let caps = p.regex.captures("const char* name(").unwrap();
        assert_eq!(&caps["ret"], "char");
        assert_eq!(&caps["name"], "name");
    }
}
