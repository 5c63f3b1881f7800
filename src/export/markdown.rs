//! Markdown rendering.

use std::fmt::Write;

use super::Document;

/// Backtick fence longer than any backtick run inside `text` (at least three).
pub fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Render the document as Markdown. The text is embedded verbatim.
pub fn render(doc: &Document<'_>) -> String {
    let mut out = String::with_capacity(doc.text.len() + 512);

    let _ = writeln!(out, "# {}\n", doc.title);
    for (label, value) in doc.summary() {
        let _ = writeln!(out, "**{}:** {}  ", label, value);
    }
    out.push_str("\n---\n\n## Documented Code\n\n");

    let fence = fence_for(doc.text);
    let _ = writeln!(out, "{}{}", fence, doc.language.fence_tag());
    out.push_str(doc.text);
    if !doc.text.is_empty() && !doc.text.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{}", fence);

    if let Some(footer) = doc.footer {
        let _ = write!(out, "\n---\n\n*{}*\n", footer);
    }
    out
}
