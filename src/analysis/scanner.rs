//! Definition-site scanning over lexed lines.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::docs;
use super::lexer::{Lexed, Line};
use super::rules::{FnForm, LanguageRules};
use crate::language::Language;

/// Lines searched for the closing parenthesis of a parameter list.
const MAX_PARAM_LINES: usize = 64;

/// Lines searched after the parameter list for `{`, `;` or `=>`.
const MAX_TAIL_LINES: usize = 4;

/// What may sit between `)` and `;` in a forward declaration.
static FORWARD_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:const|override|final|noexcept|volatile|&&|&)\s*|throws\s+[\w.]+(?:\s*,\s*[\w.]+)*\s*|=\s*(?:0|default|delete)\s*)*$",
    )
    .unwrap()
});

/// Kind of definition site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Function,
    Class,
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionKind::Function => write!(f, "function"),
            DefinitionKind::Class => write!(f, "class"),
        }
    }
}

/// A function or class definition found in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub name: String,
    /// 1-based line number of the definition site.
    pub line: usize,
    pub documented: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Class(String),
    Namespace,
    Block,
}

/// What ended the text following a parameter list.
#[derive(Debug, PartialEq, Eq)]
enum Terminator {
    Brace(String),
    Semicolon(String),
    Arrow(String),
}

pub(super) fn scan_definitions(
    lexed: &Lexed<'_>,
    rules: &LanguageRules,
    language: Language,
) -> Vec<Definition> {
    let mut definitions = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut pending: Option<Scope> = None;
    let mut in_type_group = false;

    for (idx, line) in lexed.lines.iter().enumerate() {
        let code = line.code.as_str();
        if code.trim().is_empty() {
            continue;
        }

        if let Some((opener, member)) = &rules.type_group {
            if in_type_group {
                if code.trim_start().starts_with(')') {
                    in_type_group = false;
                } else if let Some(caps) = member.captures(code) {
                    definitions.push(Definition {
                        kind: DefinitionKind::Class,
                        name: caps["name"].to_string(),
                        line: idx + 1,
                        documented: docs::is_documented(lexed, rules, language, idx),
                    });
                }
                continue;
            }
            if opener.is_match(code) {
                in_type_group = true;
                continue;
            }
        }

        let class_here = rules
            .classes
            .iter()
            .find_map(|re| re.captures(code).map(|caps| caps["name"].to_string()));

        if let Some(name) = &class_here {
            definitions.push(Definition {
                kind: DefinitionKind::Class,
                name: name.clone(),
                line: idx + 1,
                documented: docs::is_documented(lexed, rules, language, idx),
            });
        } else if let Some(name) = match_function(lexed, rules, idx, &scopes) {
            definitions.push(Definition {
                kind: DefinitionKind::Function,
                name,
                line: idx + 1,
                documented: docs::is_documented(lexed, rules, language, idx),
            });
        }

        if rules.brace_scopes {
            if let Some(name) = class_here {
                pending = Some(Scope::Class(name));
            } else if rules.namespace.as_ref().is_some_and(|re| re.is_match(code)) {
                pending = Some(Scope::Namespace);
            }
            for b in code.bytes() {
                match b {
                    b'{' => scopes.push(pending.take().unwrap_or(Scope::Block)),
                    b'}' => {
                        scopes.pop();
                    }
                    _ => {}
                }
            }
        }
    }

    definitions
}

/// Try every function pattern on a line; return the definition name if one confirms.
fn match_function(
    lexed: &Lexed<'_>,
    rules: &LanguageRules,
    idx: usize,
    scopes: &[Scope],
) -> Option<String> {
    let code = &lexed.lines[idx].code;

    for pattern in &rules.functions {
        let Some(caps) = pattern.regex.captures(code) else {
            continue;
        };
        let name = caps["name"].to_string();
        if is_keyword(rules, &name) {
            continue;
        }
        if let Some(ret) = caps.name("ret") {
            let first = ret.as_str().split_whitespace().next().unwrap_or("");
            if is_keyword(rules, first) {
                continue;
            }
        }
        let open_end = caps.get(0).map(|m| m.end()).unwrap_or(0);

        let confirmed = match pattern.form {
            FnForm::Plain => true,
            FnForm::Signature => confirm_signature(&lexed.lines, rules, idx, open_end, scopes),
            FnForm::Constructor => {
                confirm_constructor(&lexed.lines, rules, idx, open_end, scopes, &name)
            }
            FnForm::ClassMember => {
                in_class_body(scopes)
                    && matches!(
                        tail_after_params(&lexed.lines, idx, open_end, false),
                        Some(Terminator::Brace(before)) if !before.contains('=')
                    )
            }
            FnForm::Arrow { class_only } => {
                (!class_only || in_class_body(scopes))
                    && matches!(
                        tail_after_params(&lexed.lines, idx, open_end, true),
                        Some(Terminator::Arrow(before))
                            if before.trim().is_empty() || before.trim_start().starts_with(':')
                    )
            }
        };

        if confirmed {
            return Some(name.trim_start_matches('#').to_string());
        }
    }

    None
}

fn confirm_signature(
    lines: &[Line<'_>],
    rules: &LanguageRules,
    idx: usize,
    open_end: usize,
    scopes: &[Scope],
) -> bool {
    match tail_after_params(lines, idx, open_end, rules.arrow_bodies) {
        Some(Terminator::Brace(before)) => !before.contains('='),
        Some(Terminator::Arrow(before)) => before.trim().is_empty(),
        Some(Terminator::Semicolon(before)) => {
            at_declaration_level(scopes) && FORWARD_TAIL.is_match(&before)
        }
        None => false,
    }
}

fn confirm_constructor(
    lines: &[Line<'_>],
    rules: &LanguageRules,
    idx: usize,
    open_end: usize,
    scopes: &[Scope],
    name: &str,
) -> bool {
    let names_class = match scopes.last() {
        Some(Scope::Class(class)) => {
            name == class || name.strip_prefix('~').is_some_and(|n| n == class)
        }
        _ => false,
    };
    if !names_class && !is_qualified_constructor(name) {
        return false;
    }
    match tail_after_params(lines, idx, open_end, rules.arrow_bodies) {
        Some(Terminator::Brace(before)) => !before.contains('='),
        Some(Terminator::Arrow(before)) => before.trim().is_empty(),
        Some(Terminator::Semicolon(before)) => names_class && FORWARD_TAIL.is_match(&before),
        None => false,
    }
}

/// `Foo::Foo` or `Foo::~Foo`.
fn is_qualified_constructor(name: &str) -> bool {
    let parts: Vec<&str> = name.split("::").collect();
    if parts.len() < 2 {
        return false;
    }
    let owner = parts[parts.len() - 2];
    let last = parts[parts.len() - 1];
    last == owner || last.strip_prefix('~') == Some(owner)
}

fn is_keyword(rules: &LanguageRules, word: &str) -> bool {
    rules.keywords.contains(&word)
}

fn in_class_body(scopes: &[Scope]) -> bool {
    matches!(scopes.last(), Some(Scope::Class(_)))
}

/// No enclosing function or statement block.
fn at_declaration_level(scopes: &[Scope]) -> bool {
    scopes.iter().all(|s| !matches!(s, Scope::Block))
}

/// Find the position just after the `)` matching an already-open `(`.
///
/// `col` is the byte offset just after the opening parenthesis.
pub(super) fn close_paren(lines: &[Line<'_>], line: usize, col: usize) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    for (offset, l) in lines.iter().skip(line).take(MAX_PARAM_LINES).enumerate() {
        let start = if offset == 0 { col } else { 0 };
        for (i, b) in l.code.bytes().enumerate().skip(start) {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((line + offset, i + 1));
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Text between the end of a parameter list and the first `{`, `;` or `=>`.
fn tail_after_params(
    lines: &[Line<'_>],
    line: usize,
    open_end: usize,
    allow_arrow: bool,
) -> Option<Terminator> {
    let (mut cur, mut col) = close_paren(lines, line, open_end)?;
    let mut before = String::new();

    for _ in 0..MAX_TAIL_LINES {
        let code = &lines.get(cur)?.code;
        let bytes = code.as_bytes();
        for i in col..bytes.len() {
            let make: fn(String) -> Terminator = match bytes[i] {
                b'{' => Terminator::Brace,
                b';' => Terminator::Semicolon,
                b'=' if allow_arrow && bytes.get(i + 1) == Some(&b'>') => Terminator::Arrow,
                _ => continue,
            };
            before.push_str(&code[col..i]);
            return Some(make(before));
        }
        before.push_str(&code[col..]);
        before.push(' ');
        cur += 1;
        col = 0;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lexer::lex;
    use crate::analysis::rules::rules_for;

    fn names(src: &str, language: Language) -> Vec<(DefinitionKind, String)> {
        let rules = rules_for(language);
        let lexed = lex(src, &rules.lex);
        scan_definitions(&lexed, rules, language)
            .into_iter()
            .map(|d| (d.kind, d.name))
            .collect()
    }

    fn functions(src: &str, language: Language) -> Vec<String> {
        names(src, language)
            .into_iter()
            .filter(|(k, _)| *k == DefinitionKind::Function)
            .map(|(_, n)| n)
            .collect()
    }

    #[test]
    fn test_java_methods_and_constructors() {
        let src = r#"
public class Account {
    private int balance;

    public Account(int initial) {
        this.balance = initial;
    }

    public int deposit(int amount) {
        if (amount > 0) {
            balance += amount;
        }
        return helper(balance);
    }

    abstract void close();
}
"#;
        assert_eq!(
            functions(src, Language::Java),
            vec!["Account", "deposit", "close"]
        );
    }

    #[test]
    fn test_cpp_rejects_calls_and_statements() {
        let src = r#"
#include <string>

int add(int a, int b);

class Parser {
public:
    Parser(const std::string& src);
    ~Parser();
    std::string next() const;
};

Parser::Parser(const std::string& src) : src_(src) {
    std::string copy(src);
    printf("%s", src.c_str());
}

int add(int a, int b) {
    return std::max(a, b);
}
"#;
        assert_eq!(
            functions(src, Language::Cpp),
            vec!["add", "Parser", "~Parser", "next", "Parser::Parser", "add"]
        );
    }

    #[test]
    fn test_javascript_forms() {
        let src = r#"
function top(a) {
  const inner = (x) => x * 2;
  return inner(a);
}

const arrow = async (a, b) => {
  return a + b;
};

const single = v => v + 1;
const notFn = (1 + 2) * 3;

class Widget extends Base {
  constructor(props) {
    super(props);
  }

  render() {
    if (this.ready) {
      draw();
    }
  }

  onClick = (event) => {
    this.handle(event);
  };
}
"#;
        assert_eq!(
            functions(src, Language::JavaScript),
            vec!["top", "inner", "arrow", "single", "constructor", "render", "onClick"]
        );
    }

    #[test]
    fn test_go_functions_and_type_groups() {
        let src = r#"
package store

type (
	Item struct {
		Name string
	}
	Reader interface {
		Read() Item
	}
)

type Store struct{}

func (s *Store) Get(key string) (Item, error) {
	fn := func() {}
	fn()
	return Item{}, nil
}

func New() *Store { return &Store{} }
"#;
        let found = names(src, Language::Go);
        let classes: Vec<_> = found
            .iter()
            .filter(|(k, _)| *k == DefinitionKind::Class)
            .map(|(_, n)| n.as_str())
            .collect();
        assert_eq!(classes, vec!["Item", "Reader", "Store"]);
        assert_eq!(functions(src, Language::Go), vec!["Get", "fn", "New"]);
    }

    #[test]
    fn test_named_closures_count_in_every_language() {
        let cases: &[(Language, &str, &[&str])] = &[
            (
                Language::Python,
                "def outer(items):\n    inner = lambda x: x * 2\n    return sorted(items, key=lambda x: -x)\n",
                &["outer", "inner"],
            ),
            (
                Language::Ruby,
                "def outer(items)\n  inner = ->(x) { x * 2 }\n  items.map { |x| inner.call(x) }\nend\n",
                &["outer", "inner"],
            ),
            (
                Language::Php,
                "<?php\nfunction outer($items) {\n    $inner = function ($x) { return $x * 2; };\n    $twice = fn($x) => $x * 2;\n    return array_map(fn($x) => $x + 1, $items);\n}\n",
                &["outer", "inner", "twice"],
            ),
            (
                Language::Go,
                "func outer(items []int) int {\n\tinner := func(x int) int { return x * 2 }\n\tvar twice = func(x int) int { return x + x }\n\tsort.Slice(items, func(i, j int) bool { return items[i] < items[j] })\n\treturn inner(items[0])\n}\n",
                &["outer", "inner", "twice"],
            ),
            (
                Language::JavaScript,
                "function outer(items) {\n  const inner = (x) => x * 2;\n  return items.map((x) => inner(x));\n}\n",
                &["outer", "inner"],
            ),
            (
                Language::Java,
                "class Box {\n    int outer(List<Integer> items) {\n        Function<Integer, Integer> inner = x -> x * 2;\n        items.forEach(x -> System.out.println(x));\n        return inner.apply(items.get(0));\n    }\n}\n",
                &["outer", "inner"],
            ),
            (
                Language::CSharp,
                "class Box\n{\n    int Outer(List<int> items)\n    {\n        Func<int, int> inner = x => x * 2;\n        return items.Select(x => inner(x)).Sum();\n    }\n}\n",
                &["Outer", "inner"],
            ),
            (
                Language::Cpp,
                "int outer(std::vector<int> items) {\n    auto inner = [](int x) { return x * 2; };\n    std::sort(items.begin(), items.end(), [](int a, int b) { return a > b; });\n    return inner(items[0]);\n}\n",
                &["outer", "inner"],
            ),
        ];
        for (language, src, expected) in cases {
            assert_eq!(functions(src, *language), *expected, "{}", language);
        }
    }

    #[test]
    fn test_csharp_expression_bodied_members() {
        let src = r#"
namespace Shop
{
    public class Cart
    {
        public Cart() { }
        public decimal Total() => items.Sum(i => i.Price);
        private async Task<bool> SaveAsync(string path)
        {
            await File.WriteAllTextAsync(path, "x");
            return true;
        }
        public string Name { get; set; }
    }
}
"#;
        assert_eq!(
            functions(src, Language::CSharp),
            vec!["Cart", "Total", "SaveAsync"]
        );
    }

    #[test]
    fn test_close_paren_spans_lines() {
        let rules = rules_for(Language::Python);
        let lexed = lex("def f(a,\n      b=(1, 2)):\n    pass", &rules.lex);
        assert_eq!(close_paren(&lexed.lines, 0, 6), Some((1, 15)));
    }

    #[test]
    fn test_qualified_constructor() {
        assert!(is_qualified_constructor("Foo::Foo"));
        assert!(is_qualified_constructor("ns::Foo::~Foo"));
        assert!(!is_qualified_constructor("Foo::bar"));
        assert!(!is_qualified_constructor("Foo"));
    }
}
