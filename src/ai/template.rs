//! Offline template backend.
//!
//! Renders a structured skeleton from hierarchy metadata when no provider
//! credentials exist and offline fallback is enabled.

use std::fmt::Write as _;

use async_trait::async_trait;

use super::{BackendCall, BackendReply, GenerationError, TextBackend};
use crate::hierarchy::lookup;

/// Backend that needs no network.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateBackend;

impl TemplateBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextBackend for TemplateBackend {
    fn name(&self) -> &str {
        "offline-template"
    }

    async fn complete(&self, call: &BackendCall) -> Result<BackendReply, GenerationError> {
        let node = lookup(call.kind);
        let mut text = format!("# {}\n\n", node.title);

        if !call.subject.trim().is_empty() {
            let _ = writeln!(text, "_Product: {}_\n", call.subject.trim());
        }
        let _ = writeln!(text, "{}\n", node.description);

        for topic in node.hints.split(", ") {
            let _ = writeln!(text, "## {}\n\n_To be completed by the {}._\n", capitalize(topic), node.owner);
        }

        Ok(BackendReply {
            text: text.trim_end().to_string(),
            model: Some("template".to_string()),
            grounding: Vec::new(),
        })
    }
}

fn capitalize(topic: &str) -> String {
    let mut chars = topic.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::DocumentKind;
    use crate::workflow::split;

    #[tokio::test]
    async fn test_template_renders_sections_from_hints() {
        let call = BackendCall {
            kind: DocumentKind::RiskRegister,
            subject: "Bike sharing".to_string(),
            system_instruction: String::new(),
            user_prompt: String::new(),
            model: None,
            grounded: false,
            thinking_budget: None,
            max_output_tokens: 0,
        };
        let reply = TemplateBackend::new().complete(&call).await.unwrap();

        assert!(reply.text.starts_with("# Risk Register"));
        assert!(reply.text.contains("_Product: Bike sharing_"));
        assert!(reply.text.contains("## Risk id"));

        let sections = split(&reply.text);
        // Title section plus one per hint
        assert_eq!(sections.len(), 1 + lookup(DocumentKind::RiskRegister).hints.split(", ").count());
    }
}
