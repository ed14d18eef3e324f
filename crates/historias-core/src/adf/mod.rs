//! Atlassian Document Format construction
//!
//! Jira's description-like fields take a hierarchical rich-text document:
//! `doc` → `paragraph` → `text` runs. Only those three node kinds are
//! needed here. Three constructors cover the payload shapes: description
//! only, acceptance criteria only, and the combined fallback used when no
//! dedicated acceptance field is configured.

use serde::{Deserialize, Serialize};

/// Paragraph inserted between the description and the acceptance block
/// in combined documents.
pub const ACCEPTANCE_SEPARATOR: &str = "--- Criterios de Aceptación ---";

/// Bullet prefix for multi-item acceptance lists
const BULLET: &str = "\u{2022} ";

/// Top-level ADF document: `{type:"doc", version:1, content:[...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdfDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub version: u32,
    pub content: Vec<AdfParagraph>,
}

/// Paragraph block node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdfParagraph {
    #[serde(rename = "type")]
    pub node_type: String,
    pub content: Vec<AdfText>,
}

/// Text run inside a paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdfText {
    #[serde(rename = "type")]
    pub node_type: String,
    pub text: String,
}

impl AdfParagraph {
    /// A paragraph holding a single text run
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            node_type: "paragraph".to_string(),
            content: vec![AdfText {
                node_type: "text".to_string(),
                text: text.into(),
            }],
        }
    }

    /// A paragraph with no content, used as a visual separator
    pub fn empty() -> Self {
        Self {
            node_type: "paragraph".to_string(),
            content: Vec::new(),
        }
    }

    /// Concatenated text of this paragraph's runs
    pub fn plain_text(&self) -> String {
        self.content.iter().map(|t| t.text.as_str()).collect()
    }
}

impl Default for AdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl AdfDocument {
    /// An empty document
    pub fn new() -> Self {
        Self {
            doc_type: "doc".to_string(),
            version: 1,
            content: Vec::new(),
        }
    }

    /// Description-only document: one paragraph with the verbatim text,
    /// or empty content for an empty string.
    pub fn from_description(description: &str) -> Self {
        let mut doc = Self::new();
        if !description.is_empty() {
            doc.content.push(AdfParagraph::text(description));
        }
        doc
    }

    /// Acceptance-criteria-only document
    ///
    /// The input is split on `;` when present, otherwise on newlines. A
    /// single item becomes one plain paragraph; several items become one
    /// bulleted paragraph each.
    pub fn from_acceptance_criteria(criteria: &str) -> Self {
        let mut doc = Self::new();
        let items = split_criteria(criteria);
        match items.as_slice() {
            [] => {}
            [single] => doc.content.push(AdfParagraph::text(single)),
            many => {
                for item in many {
                    doc.content
                        .push(AdfParagraph::text(format!("{}{}", BULLET, item)));
                }
            }
        }
        doc
    }

    /// Combined document: description paragraphs, then a separator block
    /// and the acceptance rendering when criteria are present.
    pub fn combined(description: &str, criteria: &str) -> Self {
        let mut doc = Self::from_description(description);
        if !criteria.trim().is_empty() {
            doc.content.push(AdfParagraph::empty());
            doc.content.push(AdfParagraph::text(ACCEPTANCE_SEPARATOR));
            doc.content
                .extend(Self::from_acceptance_criteria(criteria).content);
        }
        doc
    }

    /// Paragraph texts in order, for previews and assertions
    pub fn plain_text(&self) -> Vec<String> {
        self.content.iter().map(AdfParagraph::plain_text).collect()
    }
}

/// Split raw acceptance criteria into trimmed, non-empty items
fn split_criteria(raw: &str) -> Vec<String> {
    let fragments: Vec<&str> = if raw.contains(';') {
        raw.split(';').collect()
    } else {
        raw.split('\n').collect()
    };
    fragments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
