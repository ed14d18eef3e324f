//! Result containers for batch processing
//!
//! Each `BatchResult` exclusively owns its `ProcessResult` sequence and
//! each `ProcessResult` owns its `SubtaskResult` sequence; nothing is
//! shared across batches.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single subtask creation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtaskStatus {
    Success,
    Error,
}

/// Result of one subtask creation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskResult {
    pub description: String,
    pub success: bool,
    pub issue_key: String,
    pub issue_url: String,
    pub error_message: String,
    pub status: SubtaskStatus,
}

impl SubtaskResult {
    /// A created subtask
    pub fn success(
        description: impl Into<String>,
        issue_key: impl Into<String>,
        issue_url: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            success: true,
            issue_key: issue_key.into(),
            issue_url: issue_url.into(),
            error_message: String::new(),
            status: SubtaskStatus::Success,
        }
    }

    /// A failed subtask attempt
    pub fn failure(description: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            success: false,
            issue_key: String::new(),
            issue_url: String::new(),
            error_message: error_message.into(),
            status: SubtaskStatus::Error,
        }
    }
}

/// Result of processing one input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub row_number: usize,
    pub success: bool,
    pub issue_key: String,
    pub issue_url: String,
    pub error_message: String,
    pub subtask_results: Vec<SubtaskResult>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessResult {
    /// Start a result for the given row; not yet successful
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            success: false,
            issue_key: String::new(),
            issue_url: String::new(),
            error_message: String::new(),
            subtask_results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Record the created story issue
    pub fn mark_success(&mut self, issue_key: impl Into<String>, issue_url: impl Into<String>) {
        self.success = true;
        self.issue_key = issue_key.into();
        self.issue_url = issue_url.into();
        self.error_message = String::new();
    }

    /// Record a row failure; clears any issue key
    pub fn mark_failure(&mut self, error_message: impl Into<String>) {
        self.success = false;
        self.issue_key = String::new();
        self.issue_url = String::new();
        self.error_message = error_message.into();
    }

    /// Append a subtask outcome, preserving input order
    pub fn add_subtask_result(&mut self, result: SubtaskResult) {
        self.subtask_results.push(result);
    }

    /// Count of successfully created subtasks
    pub fn successful_subtasks(&self) -> usize {
        self.subtask_results.iter().filter(|s| s.success).count()
    }
}

/// Result of resolving a parent feature reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureResult {
    /// Input description or key as read from the row
    pub description: String,
    /// Normalized form used for fuzzy matching (empty for direct keys)
    pub normalized_description: String,
    pub success: bool,
    /// Resolved issue key (created or reused)
    pub issue_key: String,
    pub issue_url: String,
    /// True when the feature was created by this resolution
    pub was_created: bool,
    /// The pre-existing key when the feature was reused
    pub existing_key: String,
    pub error_message: String,
}

impl FeatureResult {
    /// A feature that already existed (direct key or fuzzy-matched)
    pub fn existing(
        description: impl Into<String>,
        normalized_description: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self {
            description: description.into(),
            normalized_description: normalized_description.into(),
            success: true,
            issue_key: key.clone(),
            issue_url: String::new(),
            was_created: false,
            existing_key: key,
            error_message: String::new(),
        }
    }

    /// A feature created by this resolution
    pub fn created(
        description: impl Into<String>,
        normalized_description: impl Into<String>,
        key: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            normalized_description: normalized_description.into(),
            success: true,
            issue_key: key.into(),
            issue_url: url.into(),
            was_created: true,
            existing_key: String::new(),
            error_message: String::new(),
        }
    }

    /// A failed resolution
    pub fn failure(
        description: impl Into<String>,
        normalized_description: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            normalized_description: normalized_description.into(),
            success: false,
            issue_key: String::new(),
            issue_url: String::new(),
            was_created: false,
            existing_key: String::new(),
            error_message: error_message.into(),
        }
    }

    /// The key the orchestrator should write into the story, if any
    pub fn resolved_key(&self) -> Option<&str> {
        if self.success && !self.issue_key.is_empty() {
            Some(&self.issue_key)
        } else {
            None
        }
    }
}

/// Accumulated outcome of processing one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub file_name: String,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub successful_rows: usize,
    pub error_rows: usize,
    pub skipped_rows: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub results: Vec<ProcessResult>,
    /// Non-row errors and warnings (file move, per-file failures)
    pub errors: Vec<String>,
    pub validation_errors: Vec<String>,
    pub dry_run: bool,
}

impl BatchResult {
    /// Start accounting for a file with the given row count
    pub fn new(file_name: impl Into<String>, total_rows: usize, dry_run: bool) -> Self {
        Self {
            file_name: file_name.into(),
            total_rows,
            processed_rows: 0,
            successful_rows: 0,
            error_rows: 0,
            skipped_rows: 0,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            results: Vec::new(),
            errors: Vec::new(),
            validation_errors: Vec::new(),
            dry_run,
        }
    }

    /// Append a row result, incrementing processed and exactly one of
    /// successful/error in the same step.
    pub fn add_result(&mut self, result: ProcessResult) {
        self.processed_rows += 1;
        if result.success {
            self.successful_rows += 1;
        } else {
            self.error_rows += 1;
        }
        self.results.push(result);
    }

    /// Record a non-row error or warning
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a validation error
    pub fn add_validation_error(&mut self, message: impl Into<String>) {
        self.validation_errors.push(message.into());
    }

    /// Stamp end time and duration
    pub fn finalize(&mut self) {
        let end = Utc::now();
        self.end_time = Some(end);
        self.duration = Some(
            (end - self.start_time).to_std().unwrap_or_default(),
        );
    }

    /// A batch succeeded when nothing failed outside the rows and at
    /// least one row was created.
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty() && self.validation_errors.is_empty() && self.successful_rows > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success_row(row: usize) -> ProcessResult {
        let mut r = ProcessResult::new(row);
        r.mark_success(format!("PROJ-{}", row), "https://example.atlassian.net/browse/x");
        r
    }

    fn failed_row(row: usize) -> ProcessResult {
        let mut r = ProcessResult::new(row);
        r.mark_failure("boom");
        r
    }

    #[test]
    fn test_subtask_status_agrees_with_success() {
        let ok = SubtaskResult::success("Form", "PROJ-10", "url");
        assert!(ok.success);
        assert_eq!(ok.status, SubtaskStatus::Success);

        let bad = SubtaskResult::failure("Form", "404");
        assert!(!bad.success);
        assert_eq!(bad.status, SubtaskStatus::Error);
        assert!(bad.issue_key.is_empty());
    }

    #[test]
    fn test_process_result_failure_clears_key() {
        let mut r = success_row(2);
        r.mark_failure("server exploded");
        assert!(!r.success);
        assert!(r.issue_key.is_empty());
        assert_eq!(r.error_message, "server exploded");
    }

    #[test]
    fn test_batch_accounting_invariants() {
        let mut batch = BatchResult::new("stories.csv", 3, false);
        batch.add_result(success_row(2));
        batch.add_result(failed_row(3));
        batch.add_result(success_row(4));

        assert_eq!(batch.processed_rows, 3);
        assert_eq!(batch.successful_rows, 2);
        assert_eq!(batch.error_rows, 1);
        assert_eq!(
            batch.processed_rows,
            batch.successful_rows + batch.error_rows
        );
        assert_eq!(batch.results.len(), batch.processed_rows);
        assert!(batch.processed_rows <= batch.total_rows);
    }

    #[test]
    fn test_finalize_sets_end_after_start() {
        let mut batch = BatchResult::new("stories.csv", 0, true);
        batch.finalize();
        let end = batch.end_time.unwrap();
        assert!(end >= batch.start_time);
        assert!(batch.duration.is_some());
    }

    #[test]
    fn test_is_successful_requires_created_rows() {
        let mut batch = BatchResult::new("stories.csv", 1, false);
        assert!(!batch.is_successful());

        batch.add_result(success_row(2));
        assert!(batch.is_successful());

        batch.add_error("Warning: could not move file to processed: denied");
        assert!(!batch.is_successful());
    }

    #[test]
    fn test_feature_result_created_implies_key() {
        let created = FeatureResult::created("Reportes", "reportes", "PROJ-500", "url");
        assert!(created.was_created);
        assert!(created.success);
        assert!(!created.issue_key.is_empty());
        assert_eq!(created.resolved_key(), Some("PROJ-500"));

        let reused = FeatureResult::existing("PROJ-500", "", "PROJ-500");
        assert!(!reused.was_created);
        assert_eq!(reused.existing_key, "PROJ-500");
        assert_eq!(reused.resolved_key(), Some("PROJ-500"));

        let failed = FeatureResult::failure("Reportes", "reportes", "404");
        assert_eq!(failed.resolved_key(), None);
    }
}
