//! Section codec.
//!
//! Splits markdown into heading-delimited [`Section`]s and joins them back.
//! For every non-empty document `join(&split(d)) == d` holds byte for byte:
//! the input is cut on `'\n'` and every line lands in exactly one section.
//!
//! A section starts at a level-1 or level-2 heading (`# ` or `## `) outside
//! fenced code blocks. Lines before the first heading form an
//! "Introduction" section.

use serde::{Deserialize, Serialize};

/// Title of the section holding text before the first heading.
pub const INTRODUCTION_TITLE: &str = "Introduction";

/// Title of the single section of a document without headings.
pub const FULL_DOCUMENT_TITLE: &str = "Full Document";

/// An addressable slice of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Positional id, `section-{order}`
    pub id: String,
    pub title: String,

    /// Raw markdown including the heading line
    pub content: String,
    pub order: usize,
}

impl Section {
    fn new(order: usize, title: &str, content: String) -> Self {
        Self { id: section_id(order), title: title.to_string(), content, order }
    }

    /// Copy of this section with different content, same identity.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self { content: content.into(), ..self.clone() }
    }
}

/// Section codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionError {
    /// Split and join disagree; the edit is refused instead of corrupting text
    #[error("section split does not reconstruct the document")]
    Reconstruction,

    #[error("no section with id `{0}`")]
    UnknownSection(String),

    #[error("document has no content to edit")]
    EmptyDocument,
}

/// Id of the section at `order`.
pub fn section_id(order: usize) -> String {
    format!("section-{order}")
}

/// Split `markdown` into ordered sections.
///
/// Empty input yields no sections; input without headings yields a single
/// "Full Document" section.
pub fn split(markdown: &str) -> Vec<Section> {
    if markdown.is_empty() {
        return Vec::new();
    }

    let mut sections = Vec::new();
    let mut title: Option<&str> = None;
    let mut buffer: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in markdown.split('\n') {
        if is_fence(line) {
            in_fence = !in_fence;
        }

        let heading = if in_fence { None } else { heading_title(line) };
        if let Some(heading) = heading {
            if !buffer.is_empty() {
                let current = title.unwrap_or(INTRODUCTION_TITLE);
                sections.push(Section::new(sections.len(), current, buffer.join("\n")));
                buffer.clear();
            }
            title = Some(heading);
        }
        buffer.push(line);
    }

    let last_title = title.unwrap_or(FULL_DOCUMENT_TITLE);
    sections.push(Section::new(sections.len(), last_title, buffer.join("\n")));
    sections
}

/// Concatenate section contents in order, one newline apart.
pub fn join(sections: &[Section]) -> String {
    sections.iter().map(|section| section.content.as_str()).collect::<Vec<_>>().join("\n")
}

/// Replace the section `id` in `sections` and rejoin the full list.
pub fn replace_section(
    sections: &[Section],
    id: &str,
    content: &str,
) -> Result<String, SectionError> {
    if !sections.iter().any(|section| section.id == id) {
        return Err(SectionError::UnknownSection(id.to_string()));
    }

    let updated: Vec<Section> = sections
        .iter()
        .map(|section| if section.id == id { section.with_content(content) } else { section.clone() })
        .collect();
    Ok(join(&updated))
}

/// Split `document`, check the round trip, replace one section and rejoin.
pub fn apply_section_edit(document: &str, id: &str, content: &str) -> Result<String, SectionError> {
    if document.is_empty() {
        return Err(SectionError::EmptyDocument);
    }

    let sections = split(document);
    if join(&sections) != document {
        return Err(SectionError::Reconstruction);
    }
    replace_section(&sections, id, content)
}

/// Find a section by id.
pub fn find_section(document: &str, id: &str) -> Result<Section, SectionError> {
    if document.is_empty() {
        return Err(SectionError::EmptyDocument);
    }
    split(document)
        .into_iter()
        .find(|section| section.id == id)
        .ok_or_else(|| SectionError::UnknownSection(id.to_string()))
}

/// `replacement` with the trailing line breaks of `original`.
///
/// Keeps the spacing between a rewritten section and the next heading.
pub fn keep_trailing_breaks(original: &str, replacement: &str) -> String {
    let body = original.trim_end_matches(['\n', '\r']);
    let breaks = &original[body.len()..];
    format!("{}{breaks}", replacement.trim_end())
}

fn heading_title(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("# ").or_else(|| line.strip_prefix("## "))?;
    let title = rest.trim();

    // A closing `#` run counts only when whitespace separates it from the text.
    let without_closing = title.trim_end_matches('#');
    let has_closing = without_closing.len() < title.len()
        && (without_closing.is_empty() || without_closing.ends_with(char::is_whitespace));
    Some(if has_closing { without_closing.trim_end() } else { title })
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Vision\n\nA product.\n\n## Goals\n- one\n- two\n\n## Risks\nNone yet.\n";

    #[test]
    fn test_split_on_headings() {
        let sections = split(DOC);
        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Vision", "Goals", "Risks"]);
        assert_eq!(sections[1].id, "section-1");
        assert_eq!(sections[1].order, 1);
        assert!(sections[1].content.starts_with("## Goals"));
    }

    #[test]
    fn test_round_trip() {
        for doc in [
            DOC,
            "# Only",
            "# A\n# B",
            "\n\n# Leading blanks\ntext",
            "Intro line\n## First\nbody\n",
            "# Trailing\n\n\n",
            "## Windows\r\nline\r\n",
        ] {
            assert_eq!(join(&split(doc)), doc, "round trip failed for {doc:?}");
        }
    }

    #[test]
    fn test_introduction_before_first_heading() {
        let sections = split("Preamble\n\n# Title\nbody");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, INTRODUCTION_TITLE);
        assert_eq!(sections[0].content, "Preamble\n");
        assert_eq!(sections[1].title, "Title");
    }

    #[test]
    fn test_headerless_document() {
        let sections = split("just text\nmore text");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, FULL_DOCUMENT_TITLE);
        assert_eq!(join(&sections), "just text\nmore text");
    }

    #[test]
    fn test_empty_document() {
        assert!(split("").is_empty());
        assert_eq!(join(&[]), "");
    }

    #[test]
    fn test_deeper_headings_and_fences_do_not_split() {
        let doc = "# Schema\n### Tables\n```sql\n# not a heading\n## nor this\n```\n## Indexes";
        let sections = split(doc);
        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Schema", "Indexes"]);
        assert_eq!(join(&sections), doc);
    }

    #[test]
    fn test_closing_hashes_need_whitespace() {
        let sections = split("## Why C#
text
## Goals ##
## F#
");
        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Why C#", "Goals", "F#"]);
    }

    #[test]
    fn test_hash_without_space_is_not_a_heading() {
        let sections = split("#hashtag\n# Real");
        assert_eq!(sections[0].title, INTRODUCTION_TITLE);
        assert_eq!(sections[1].title, "Real");
    }

    #[test]
    fn test_edit_keeps_other_sections() {
        let edited = apply_section_edit(DOC, "section-1", "## Goals\n- only one\n").unwrap();
        assert_eq!(
            edited,
            "# Vision\n\nA product.\n\n## Goals\n- only one\n\n## Risks\nNone yet.\n"
        );

        let sections = split(&edited);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].content, split(DOC)[0].content);
        assert_eq!(sections[2].content, split(DOC)[2].content);
    }

    #[test]
    fn test_edit_with_same_content_is_identity() {
        let section = find_section(DOC, "section-2").unwrap();
        assert_eq!(apply_section_edit(DOC, &section.id, &section.content).unwrap(), DOC);
    }

    #[test]
    fn test_keep_trailing_breaks() {
        assert_eq!(keep_trailing_breaks("## Goals\n- one\n", "## Goals\n- two"), "## Goals\n- two\n");
        assert_eq!(keep_trailing_breaks("## Last", "## Last\nnew\n\n"), "## Last\nnew");
    }

    #[test]
    fn test_edit_errors() {
        assert_eq!(apply_section_edit("", "section-0", "x"), Err(SectionError::EmptyDocument));
        assert_eq!(
            apply_section_edit(DOC, "section-9", "x"),
            Err(SectionError::UnknownSection("section-9".to_string()))
        );
        assert!(matches!(find_section(DOC, "nope"), Err(SectionError::UnknownSection(_))));
    }
}
