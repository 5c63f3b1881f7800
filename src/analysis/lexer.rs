//! Line-oriented lexical masking.
//!
//! Produces, for every source line, a "code view" of the same length where
//! comment text and string contents are blanked out with spaces. String
//! delimiters are kept so a line consisting only of a string literal is still
//! recognisable. Definition patterns run against the code view, so `def`
//! inside a string or comment never counts.
//!
//! Positions in the code view are byte offsets: every source char maps to a
//! single char in the view, and masked chars are ASCII spaces.

/// Lexical conventions of a language family.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LexSpec {
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
    /// Quotes opening strings that end at the closing quote or end of line.
    pub quotes: &'static [char],
    /// `"""` and `'''` strings spanning lines.
    pub triple_quotes: bool,
    /// Quotes opening strings that may span lines (template literals, raw strings).
    pub multiline_quotes: &'static [char],
    /// Whether backslash escapes apply inside multiline quotes.
    pub multiline_escapes: bool,
    /// Ruby `=begin` / `=end` documentation blocks.
    pub begin_end_blocks: bool,
    /// `#[` starts an attribute rather than a `#` comment (PHP 8).
    pub hash_attributes: bool,
}

/// A lexed source line.
#[derive(Debug, Clone)]
pub(crate) struct Line<'a> {
    pub raw: &'a str,
    pub code: String,
    pub has_code: bool,
    pub has_comment: bool,
    pub indent: usize,
}

impl Line<'_> {
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Every visible character on the line belongs to a comment.
    pub fn is_comment(&self) -> bool {
        self.has_comment && !self.has_code
    }
}

/// A triple-quoted string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TripleString {
    pub start_line: usize,
    /// Byte offset of the opening quotes in the start line's code view.
    pub start_col: usize,
    pub end_line: usize,
    /// Nothing but whitespace, comments and a string prefix around the literal.
    pub standalone: bool,
}

#[derive(Debug)]
pub(crate) struct Lexed<'a> {
    pub lines: Vec<Line<'a>>,
    pub triple_strings: Vec<TripleString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    Single(char),
    Triple(char),
    Multi(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Block(&'static str),
    Str(Delim),
    DocBlock,
}

/// Open triple string being tracked.
struct OpenTriple {
    start_line: usize,
    start_col: usize,
    clean_start: bool,
}

pub(crate) fn lex<'a>(text: &'a str, spec: &LexSpec) -> Lexed<'a> {
    let mut lines = Vec::new();
    let mut triple_strings = Vec::new();
    let mut state = State::Code;
    let mut open_triple: Option<OpenTriple> = None;

    for (idx, raw) in text.lines().enumerate() {
        let chars: Vec<char> = raw.chars().collect();
        let mut code = String::with_capacity(raw.len());
        let mut has_code = false;
        let mut has_comment = false;
        // Triple string closed on this line: (index into triple_strings, code offset after it).
        let mut closed_here: Option<(usize, usize)> = None;
        let indent = chars.iter().take_while(|c| c.is_whitespace()).count();

        if spec.begin_end_blocks {
            if state == State::DocBlock {
                if raw.starts_with("=end") {
                    state = State::Code;
                }
                lines.push(masked_comment_line(raw, indent));
                continue;
            }
            if state == State::Code && raw.starts_with("=begin") {
                state = State::DocBlock;
                lines.push(masked_comment_line(raw, indent));
                continue;
            }
        }

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match state {
                State::Code => {
                    if c.is_whitespace() {
                        code.push(c);
                        i += 1;
                        continue;
                    }
                    if let Some(tok) = spec
                        .line_comments
                        .iter()
                        .find(|t| starts_with_at(&chars, i, t))
                    {
                        let attribute = spec.hash_attributes
                            && *tok == "#"
                            && chars.get(i + 1) == Some(&'[');
                        if !attribute {
                            has_comment = true;
                            push_spaces(&mut code, chars.len() - i);
                            break;
                        }
                    }
                    if let Some((open, close)) = spec.block_comment {
                        if starts_with_at(&chars, i, open) {
                            has_comment = true;
                            let n = open.chars().count();
                            push_spaces(&mut code, n);
                            i += n;
                            state = State::Block(close);
                            continue;
                        }
                    }
                    if spec.triple_quotes
                        && (c == '"' || c == '\'')
                        && chars.get(i + 1) == Some(&c)
                        && chars.get(i + 2) == Some(&c)
                    {
                        open_triple = Some(OpenTriple {
                            start_line: idx,
                            start_col: code.len(),
                            clean_start: only_prefix(&code),
                        });
                        for _ in 0..3 {
                            code.push(c);
                        }
                        has_code = true;
                        i += 3;
                        state = State::Str(Delim::Triple(c));
                        continue;
                    }
                    has_code = true;
                    code.push(c);
                    i += 1;
                    if spec.multiline_quotes.contains(&c) {
                        state = State::Str(Delim::Multi(c));
                    } else if spec.quotes.contains(&c) {
                        state = State::Str(Delim::Single(c));
                    }
                }
                State::Block(close) => {
                    if starts_with_at(&chars, i, close) {
                        let n = close.chars().count();
                        push_spaces(&mut code, n);
                        i += n;
                        has_comment = true;
                        state = State::Code;
                        continue;
                    }
                    if !c.is_whitespace() {
                        has_comment = true;
                    }
                    code.push(' ');
                    i += 1;
                }
                State::Str(delim) => {
                    if !c.is_whitespace() {
                        has_code = true;
                    }
                    let escapes = match delim {
                        Delim::Multi(_) => spec.multiline_escapes,
                        _ => true,
                    };
                    if escapes && c == '\\' {
                        let n = if i + 1 < chars.len() { 2 } else { 1 };
                        push_spaces(&mut code, n);
                        i += n;
                        continue;
                    }
                    match delim {
                        Delim::Single(q) | Delim::Multi(q) if c == q => {
                            code.push(q);
                            i += 1;
                            state = State::Code;
                        }
                        Delim::Triple(q)
                            if c == q
                                && chars.get(i + 1) == Some(&q)
                                && chars.get(i + 2) == Some(&q) =>
                        {
                            for _ in 0..3 {
                                code.push(q);
                            }
                            i += 3;
                            state = State::Code;
                            if let Some(open) = open_triple.take() {
                                triple_strings.push(TripleString {
                                    start_line: open.start_line,
                                    start_col: open.start_col,
                                    end_line: idx,
                                    standalone: open.clean_start,
                                });
                                closed_here = Some((triple_strings.len() - 1, code.len()));
                            }
                        }
                        _ => {
                            code.push(' ');
                            i += 1;
                        }
                    }
                }
                State::DocBlock => unreachable!("doc blocks are handled per line"),
            }
        }

        if let State::Str(Delim::Single(_)) = state {
            state = State::Code;
        }
        if let Some((ts, offset)) = closed_here {
            if !code[offset..].trim().is_empty() {
                triple_strings[ts].standalone = false;
            }
        }

        lines.push(Line {
            raw,
            code,
            has_code,
            has_comment,
            indent,
        });
    }

    Lexed {
        lines,
        triple_strings,
    }
}

fn masked_comment_line(raw: &str, indent: usize) -> Line<'_> {
    let mut code = String::with_capacity(raw.len());
    push_spaces(&mut code, raw.chars().count());
    Line {
        raw,
        code,
        has_code: false,
        has_comment: !raw.trim().is_empty(),
        indent,
    }
}

fn starts_with_at(chars: &[char], i: usize, token: &str) -> bool {
    let mut j = i;
    for t in token.chars() {
        if chars.get(j) != Some(&t) {
            return false;
        }
        j += 1;
    }
    true
}

fn push_spaces(code: &mut String, n: usize) {
    code.extend(std::iter::repeat(' ').take(n));
}

/// Whether the code seen so far is blank apart from a string prefix like `r` or `rb`.
fn only_prefix(code: &str) -> bool {
    let trimmed = code.trim();
    trimmed.len() <= 2 && trimmed.chars().all(|c| "rRuUbBfF".contains(c))
}
