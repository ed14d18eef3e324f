//! Error types for Historias

use thiserror::Error;

/// Result type alias using Historias' Error
pub type Result<T> = std::result::Result<T, Error>;

/// Historias error types
///
/// Messages are written so that wrapped errors read as a chain ending in
/// the original cause.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // File errors
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("must have at least a header row and one data row")]
    EmptySpreadsheet,

    #[error("validation error in row {row}: {message}")]
    RowValidation { row: usize, message: String },

    #[error("file contains no valid stories")]
    NoValidStories,

    #[error("file validation failed: {0}")]
    FileValidation(String),

    #[error("no files found in {0}")]
    NoPendingFiles(String),

    #[error("error parsing csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("error reading spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    // Remote errors
    #[error("authentication failed: status {0}")]
    AuthenticationFailed(u16),

    #[error("project '{key}' not found")]
    ProjectNotFound { key: String },

    #[error("error validating project: status {0}")]
    ProjectValidation(u16),

    #[error("parent issue '{key}' not found")]
    ParentIssueNotFound { key: String },

    #[error("error validating parent issue: status {0}")]
    ParentIssueValidation(u16),

    #[error("error fetching issue types: status {0}")]
    IssueTypes(u16),

    #[error("subtask issue type '{0}' not found")]
    SubtaskIssueTypeNotFound(String),

    #[error("feature issue type '{0}' not found")]
    FeatureIssueTypeNotFound(String),

    #[error("jira error: {0}")]
    JiraApi(String),

    #[error("error creating issue: status {status}, body: {body}")]
    CreateIssue { status: u16, body: String },

    #[error("error searching issues: status {0}")]
    Search(u16),

    #[error("Network error: {0}. Check your connection to the Jira instance.")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error belongs to the remote taxonomy (HTTP-level
    /// failures against the issue service). Remote errors are fatal at
    /// preflight granularity but captured per-row during processing.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_)
                | Self::ProjectNotFound { .. }
                | Self::ProjectValidation(_)
                | Self::ParentIssueNotFound { .. }
                | Self::ParentIssueValidation(_)
                | Self::IssueTypes(_)
                | Self::SubtaskIssueTypeNotFound(_)
                | Self::FeatureIssueTypeNotFound(_)
                | Self::JiraApi(_)
                | Self::CreateIssue { .. }
                | Self::Search(_)
                | Self::Network(_)
        )
    }
}
