//! Context assembly: turns the knowledge corpus or retrieved passages into
//! the context block shown to the model.

use asika_core::retrieval::Passage;
use asika_knowledge::CorpusDocument;
use serde::Serialize;

/// Separator placed between context sections.
pub const SECTION_DELIMITER: &str = "\n\n---\n\n";

/// Shown to the model when no knowledge is available for a turn.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No context available.";

/// One section of a context block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSection {
    pub source_id: String,
    pub body: String,
}

/// An ordered, delimiter-joined sequence of context sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextBlock {
    sections: Vec<ContextSection>,
}

impl ContextBlock {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a block from static documents, bounded by `budget` characters.
    ///
    /// Sections are rendered as `"Source: <name>\n<content>"`. Delimiters
    /// count against the budget. The section that would overflow is cut to
    /// the remaining room and assembly stops there.
    pub fn from_documents(documents: &[CorpusDocument], budget: usize) -> Self {
        let delimiter_len = SECTION_DELIMITER.chars().count();
        let mut sections = Vec::new();
        let mut used = 0usize;

        for doc in documents {
            let separator = if sections.is_empty() { 0 } else { delimiter_len };
            if used + separator >= budget {
                break;
            }
            let remaining = budget - used - separator;

            let body = format!("Source: {}\n{}", doc.name, doc.content);
            let body_len = body.chars().count();

            if body_len > remaining {
                sections.push(ContextSection {
                    source_id: doc.name.clone(),
                    body: body.chars().take(remaining).collect(),
                });
                break;
            }

            used += separator + body_len;
            sections.push(ContextSection {
                source_id: doc.name.clone(),
                body,
            });
        }

        Self { sections }
    }

    /// Build a block from ranked passages, preserving their order.
    pub fn from_passages(passages: &[Passage]) -> Self {
        Self {
            sections: passages
                .iter()
                .filter(|p| !p.content.trim().is_empty())
                .map(|p| ContextSection {
                    source_id: p.source.clone(),
                    body: p.content.clone(),
                })
                .collect(),
        }
    }

    pub fn sections(&self) -> &[ContextSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join(SECTION_DELIMITER)
    }
}

/// What the prompt receives as knowledge for this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptContext {
    Available(String),
    /// Nothing to ground on. The prompt carries [`NO_CONTEXT_PLACEHOLDER`].
    Unavailable,
}

impl PromptContext {
    pub fn from_block(block: &ContextBlock) -> Self {
        let rendered = block.render();
        if rendered.trim().is_empty() {
            Self::Unavailable
        } else {
            Self::Available(rendered)
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Available(text) => text,
            Self::Unavailable => NO_CONTEXT_PLACEHOLDER,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}
