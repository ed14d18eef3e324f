//! User stories parsed from tabular input

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum length (in characters) for story titles and subtask summaries
pub const MAX_TITLE_LENGTH: usize = 255;

/// A user story read from one data row of an input file
///
/// The reader emits a story only when title, description and acceptance
/// criteria are all non-empty after trimming. The parent reference may be
/// an issue key (`PROJ-12`), a free-text feature description, or empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStory {
    /// Story title, becomes the issue summary
    pub title: String,
    /// Story description
    pub description: String,
    /// Acceptance criteria, `;`- or newline-delimited
    pub acceptance_criteria: String,
    /// Raw subtask descriptions in input order, may be empty
    pub subtasks: Vec<String>,
    /// Parent reference: issue key, feature description, or empty
    pub parent: String,
    /// Source row number, 1-indexed counting the header as row 1
    pub row_number: usize,
}

impl UserStory {
    /// Create a story with empty subtasks and parent
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        acceptance_criteria: impl Into<String>,
        row_number: usize,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            acceptance_criteria: acceptance_criteria.into(),
            subtasks: Vec::new(),
            parent: String::new(),
            row_number,
        }
    }

    /// Set the subtask list
    pub fn with_subtasks(mut self, subtasks: Vec<String>) -> Self {
        self.subtasks = subtasks;
        self
    }

    /// Set the parent reference
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }

    /// Set the source row number
    pub fn with_row_number(mut self, row_number: usize) -> Self {
        self.row_number = row_number;
        self
    }

    /// Structural validation: title 1-255 characters, description and
    /// acceptance criteria non-empty, all after trimming.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("title is empty".to_string());
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(format!(
                "title exceeds {} characters",
                MAX_TITLE_LENGTH
            ));
        }
        if self.description.trim().is_empty() {
            return Err("description is empty".to_string());
        }
        if self.acceptance_criteria.trim().is_empty() {
            return Err("acceptance criteria is empty".to_string());
        }
        Ok(())
    }

    /// Subtasks whose trimmed length is between 1 and 255 characters
    ///
    /// The raw sequence is kept as read; validity is evaluated here so
    /// that result accounting can still report the invalid entries.
    pub fn valid_subtasks(&self) -> Vec<&str> {
        self.subtasks
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && s.chars().count() <= MAX_TITLE_LENGTH)
            .collect()
    }

    /// Whether the parent reference is present (key or description)
    pub fn has_parent(&self) -> bool {
        !self.parent.trim().is_empty()
    }
}

/// Whether a string is a literal Jira issue key (`PROJ-123`)
///
/// Case-sensitive: the project prefix must be upper-case ASCII letters
/// followed by `-` and digits.
pub fn is_issue_key(value: &str) -> bool {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    let re = KEY_RE.get_or_init(|| {
        Regex::new(r"^[A-Z]+-\d+$").expect("issue key pattern compiles")
    });
    re.is_match(value)
}
