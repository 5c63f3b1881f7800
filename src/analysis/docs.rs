//! Documentation presence checks for definition sites.

use super::lexer::{Lexed, Line};
use super::rules::LanguageRules;
use crate::language::Language;

/// Lines searched for the `:` that ends a Python header.
const MAX_HEADER_LINES: usize = 64;

/// Whether the definition on line `idx` carries documentation.
///
/// A definition is documented when the nearest non-blank, non-decorator
/// line above it is a comment. Python definitions are also documented by a
/// docstring: a standalone triple-quoted string as the first statement of
/// the body, or one directly above at the same indentation.
pub(super) fn is_documented(
    lexed: &Lexed<'_>,
    rules: &LanguageRules,
    language: Language,
    idx: usize,
) -> bool {
    if preceding_comment(lexed, rules, idx) {
        return true;
    }
    language == Language::Python && docstring_follows(lexed, idx)
}

fn preceding_comment(lexed: &Lexed<'_>, rules: &LanguageRules, idx: usize) -> bool {
    let target = &lexed.lines[idx];

    for i in (0..idx).rev() {
        let prev = &lexed.lines[i];
        if prev.is_blank() {
            continue;
        }
        if rules
            .decorator
            .as_ref()
            .is_some_and(|re| re.is_match(&prev.code))
        {
            continue;
        }
        if prev.is_comment() {
            return !rules.indent_sensitive || prev.indent == target.indent;
        }
        if rules.indent_sensitive {
            return lexed.triple_strings.iter().any(|t| {
                t.end_line == i && t.standalone && lexed.lines[t.start_line].indent == target.indent
            });
        }
        return false;
    }
    false
}

/// A docstring opens the body of the Python definition on line `idx`.
fn docstring_follows(lexed: &Lexed<'_>, idx: usize) -> bool {
    let Some((line, col)) = header_end(&lexed.lines, idx) else {
        return false;
    };

    let rest = &lexed.lines[line].code[col..];
    if !rest.trim().is_empty() {
        // Single-line body: `def f(): """Doc."""`
        let body = rest.trim_start();
        let body = body.trim_start_matches(|c: char| "rRuU".contains(c));
        return body.starts_with("\"\"\"") || body.starts_with("'''");
    }

    for j in line + 1..lexed.lines.len() {
        let next = &lexed.lines[j];
        if next.is_blank() || next.is_comment() {
            continue;
        }
        return lexed
            .triple_strings
            .iter()
            .any(|t| t.start_line == j && t.standalone);
    }
    false
}

/// Position just after the `:` that closes a Python `def`/`class` header.
fn header_end(lines: &[Line<'_>], idx: usize) -> Option<(usize, usize)> {
    let mut depth = 0i32;
    for (offset, line) in lines.iter().skip(idx).take(MAX_HEADER_LINES).enumerate() {
        for (i, b) in line.code.bytes().enumerate() {
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b':' if depth <= 0 => return Some((idx + offset, i + 1)),
                _ => {}
            }
        }
    }
    None
}
