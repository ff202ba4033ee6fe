//! Prompt construction.

use std::fmt::Write as _;

use super::GenerationRequest;
use crate::hierarchy::{lookup, DocumentKind};
use crate::workflow::Section;

/// System instruction for generating a whole document of `kind`.
pub fn system_instruction(kind: DocumentKind) -> String {
    let node = lookup(kind);
    format!(
        r"You are an experienced {owner} writing the {title} for a new product.
This document belongs to the {category} phase of a product plan.

Rules:
1. Output markdown only, never wrapped in a code fence
2. Start with a single level-1 heading: # {title}
3. Use a level-2 heading (##) for every major section
4. Be specific to the product described; avoid generic filler
5. Stay consistent with any related documents you are given",
        owner = node.owner,
        title = node.title,
        category = node.category,
    )
}

/// User prompt carrying the brief for `request.kind`.
pub fn user_prompt(request: &GenerationRequest) -> String {
    let node = lookup(request.kind);
    let mut prompt = format!("Write the {} for this product.\n\n", node.title);

    push_field(&mut prompt, "Concept", &request.concept);
    push_field(&mut prompt, "Problem", &request.problem);
    push_field(&mut prompt, "Target audience", &request.audience);
    push_field(&mut prompt, "Key features", &request.features);
    push_field(&mut prompt, "Technology preferences", &request.preferences.tech);
    push_field(&mut prompt, "Budget", &request.preferences.budget);
    push_field(&mut prompt, "Timeline", &request.preferences.timeline);

    let _ = write!(prompt, "\nPurpose: {}\nCover: {}\n", node.description, node.hints);

    if !request.related.is_empty() {
        prompt.push_str("\nRelated documents already written:\n");
        for related in &request.related {
            let _ = write!(prompt, "\n--- {} ---\n{}\n", related.title, related.excerpt);
        }
    }

    prompt
}

/// System instruction for rewriting one section of a `kind` document.
pub fn refine_system_instruction(kind: DocumentKind) -> String {
    let node = lookup(kind);
    format!(
        r"You are an experienced {owner} editing one section of the {title}.
Rewrite only the section you are given, following the user's instruction.

Rules:
1. Output markdown only, never wrapped in a code fence
2. Keep the section's heading line exactly as given
3. Do not add new level-1 or level-2 headings
4. Do not repeat other sections of the document",
        owner = node.owner,
        title = node.title,
    )
}

/// User prompt for a section rewrite.
pub fn refine_prompt(request: &GenerationRequest, section: &Section, instruction: &str) -> String {
    let mut prompt = String::new();
    push_field(&mut prompt, "Product concept", &request.concept);
    let _ = write!(
        prompt,
        "\nInstruction: {}\n\nSection \"{}\":\n{}\n",
        instruction.trim(),
        section.title,
        section.content
    );
    prompt
}

fn push_field(prompt: &mut String, label: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        let _ = writeln!(prompt, "{label}: {value}");
    }
}
