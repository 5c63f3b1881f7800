//! Prompt construction for generative annotators.

use std::fmt::Write;

use super::annotator::{AnnotationRequest, Directive};
use crate::export::markdown::fence_for;
use crate::language::Language;

/// Idiomatic documentation style requested for each language.
pub fn doc_style(language: Language) -> &'static str {
    match language {
        Language::Python => "Google-style docstrings (with Args, Returns and Raises sections)",
        Language::JavaScript => "JSDoc comments (/** ... */ with @param and @returns tags)",
        Language::Java => "Javadoc comments (/** ... */ with @param and @return tags)",
        Language::Cpp => "Doxygen comments (/** ... */ with @brief, @param and @return)",
        Language::CSharp => "XML documentation comments (/// <summary>, <param>, <returns>)",
        Language::Php => "PHPDoc comments (/** ... */ with @param and @return tags)",
        Language::Ruby => "# comments above each method describing parameters and return value",
        Language::Go => "// doc comments that start with the name of the declared identifier",
    }
}

/// Build the full prompt text for a request.
pub fn build_prompt(request: &AnnotationRequest<'_>) -> String {
    let lang = request.language.display_name();
    let style = doc_style(request.language);
    let mut prompt = String::new();

    match request.directive {
        Directive::Document => {
            let _ = writeln!(
                prompt,
                "You are an expert {} developer. Document the following code by adding {} \
                 to every function, method and class that has no documentation.",
                lang, style
            );
            prompt.push_str("\nIMPORTANT:\n");
            prompt.push_str("- Keep ALL of the original code exactly as it is\n");
            prompt.push_str("- Only add documentation where it is missing\n");
            prompt.push_str("- Do not modify functional code\n");
            prompt.push_str("- Return ONLY the complete code with the documentation added\n");
        }
        Directive::Regenerate { feedback, previous } => {
            let _ = writeln!(
                prompt,
                "You are an expert {} developer. Produce a NEW version of the documentation \
                 for the following code.",
                lang
            );
            prompt.push_str("\nIMPORTANT:\n");
            prompt.push_str("- Keep ALL of the original code exactly as it is\n");
            let _ = writeln!(prompt, "- Only add or modify documentation, using {}", style);
            prompt.push_str("- Be more detailed and clearer than the previous version\n");
            prompt.push_str("- Do not modify functional code\n");
            prompt.push_str("- Return ONLY the complete code\n");
            if let Some(feedback) = feedback {
                let _ = write!(prompt, "\nUser feedback: {}\n", feedback);
            }
            if let Some(previous) = previous {
                prompt.push_str("\nPrevious version:\n");
                push_code_block(&mut prompt, request.language, previous);
            }
        }
    }

    prompt.push_str("\nCode to document:\n");
    push_code_block(&mut prompt, request.language, request.text);
    prompt.push_str("\nDocumented code:\n");
    prompt
}

fn push_code_block(prompt: &mut String, language: Language, code: &str) {
    let fence = fence_for(code);
    let _ = writeln!(prompt, "{}{}", fence, language.fence_tag());
    prompt.push_str(code);
    if !code.ends_with('\n') {
        prompt.push('\n');
    }
    let _ = writeln!(prompt, "{}", fence);
}
