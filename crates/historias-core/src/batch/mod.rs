//! Batch orchestration
//!
//! Drives the per-file pipeline: preflight, read, per-row processing
//! (parent resolution, story and subtask creation), result accounting,
//! and post-run file disposition. Dry-run is a branch here, not inside
//! the client, so the transport stays pure.

use std::path::Path;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::jira::JiraClient;
use crate::model::{BatchResult, ProcessResult, SubtaskResult, UserStory};
use crate::reader;
use crate::resolver::FeatureResolver;

/// Base URL used for synthetic dry-run issue links
const DRY_RUN_BASE_URL: &str = "https://dry-run.example.com";

/// Sequential batch processor over one Jira client
pub struct BatchProcessor<'a> {
    client: &'a JiraClient,
    resolver: FeatureResolver<'a>,
    config: &'a Config,
}

impl<'a> BatchProcessor<'a> {
    /// Create a processor bound to a client and loaded configuration
    pub fn new(client: &'a JiraClient, config: &'a Config) -> Self {
        Self {
            client,
            resolver: FeatureResolver::new(client, config.feature_required_fields.clone()),
            config,
        }
    }

    /// Process one input file into a batch result
    ///
    /// Dry-run only validates the file locally; real mode runs the full
    /// validation chain against Jira before any row is touched.
    pub async fn execute(
        &self,
        file_path: &Path,
        project_key: &str,
        dry_run: bool,
    ) -> Result<BatchResult> {
        if dry_run {
            reader::validate_file(file_path)
                .map_err(|e| Error::FileValidation(e.to_string()))?;
        } else {
            self.run_validation_chain(project_key).await?;
        }

        let stories = reader::read_file(file_path)?;
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.display().to_string());
        let mut batch = BatchResult::new(&file_name, stories.len(), dry_run);

        info!(
            file = %file_name,
            rows = stories.len(),
            dry_run,
            "Starting batch"
        );

        for (index, story) in stories.iter().enumerate() {
            // First data row sits on line 2 of a file with a header.
            let row_number = index + 2;
            let result = if dry_run {
                dry_run_row(story, row_number)
            } else {
                self.process_row(story, row_number, project_key).await
            };
            batch.add_result(result);

            if self.config.batch_size > 0 && (index + 1) % self.config.batch_size == 0 {
                info!(
                    file = %file_name,
                    processed = index + 1,
                    total = stories.len(),
                    "Batch progress"
                );
            }
        }

        batch.finalize();

        if !dry_run && batch.successful_rows > 0 {
            if let Err(e) =
                reader::move_to_processed(file_path, &self.config.processed_directory)
            {
                warn!(file = %file_name, error = %e, "Could not move processed file");
                batch.add_error(format!(
                    "Warning: could not move file to processed: {}",
                    e
                ));
            }
        }

        info!(
            file = %file_name,
            successful = batch.successful_rows,
            errors = batch.error_rows,
            "Batch finished"
        );
        Ok(batch)
    }

    /// Process every pending file under the input directory
    pub async fn process_all_files(
        &self,
        input_dir: &Path,
        project_key: &str,
        dry_run: bool,
    ) -> Result<Vec<BatchResult>> {
        if !dry_run {
            self.run_validation_chain(project_key).await?;
        }

        let files = reader::pending_files(input_dir);
        if files.is_empty() {
            return Err(Error::NoPendingFiles(input_dir.display().to_string()));
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            match self.execute(&file, project_key, dry_run).await {
                Ok(batch) => results.push(batch),
                Err(e) => {
                    error!(file = %file.display(), error = %e, "File processing failed");
                    let file_name = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.display().to_string());
                    let mut batch = BatchResult::new(&file_name, 0, dry_run);
                    batch.add_error(format!("Error processing file: {}", e));
                    batch.finalize();
                    results.push(batch);
                }
            }
        }
        Ok(results)
    }

    /// The strict preflight order: connection, project, subtask type,
    /// feature type. Any failure short-circuits with the step named.
    async fn run_validation_chain(&self, project_key: &str) -> Result<()> {
        self.client
            .test_connection()
            .await
            .map_err(|e| Error::Config(format!("connection test failed: {}", e)))?;
        self.client
            .validate_project(project_key)
            .await
            .map_err(|e| Error::Config(format!("project validation failed: {}", e)))?;
        self.client
            .validate_subtask_issue_type()
            .await
            .map_err(|e| Error::Config(format!("subtask issue type validation failed: {}", e)))?;
        self.client
            .validate_feature_issue_type()
            .await
            .map_err(|e| Error::Config(format!("feature issue type validation failed: {}", e)))?;
        Ok(())
    }

    /// Real-mode row processing: resolve the parent reference, then
    /// create the story and its subtasks. Remote failures are captured
    /// into the result; the loop never aborts on them.
    async fn process_row(
        &self,
        story: &UserStory,
        row_number: usize,
        project_key: &str,
    ) -> ProcessResult {
        let mut story = story.clone().with_row_number(row_number);

        if story.has_parent() {
            let feature = self
                .resolver
                .create_or_get_feature(&story.parent, project_key)
                .await;
            if !feature.success {
                let mut result = ProcessResult::new(row_number);
                result.mark_failure(format!(
                    "feature handling failed: {}",
                    feature.error_message
                ));
                return result;
            }
            if let Some(key) = feature.resolved_key() {
                // Derived story: the caller's input is never aliased.
                story = story.with_parent(key.to_string());
            }
        }

        self.client.create_user_story(&story, project_key).await
    }
}

/// Dry-run outcome with synthetic keys so downstream reporting still
/// exercises its full path.
fn dry_run_row(story: &UserStory, row_number: usize) -> ProcessResult {
    let mut result = ProcessResult::new(row_number);
    let key = format!("DRY-RUN-{}", row_number);
    result.mark_success(&key, format!("{}/browse/{}", DRY_RUN_BASE_URL, key));

    for (index, subtask) in story.valid_subtasks().iter().enumerate() {
        let sub_key = format!("DRY-SUB-{}-{}", row_number, index + 1);
        result.add_subtask_result(SubtaskResult::success(
            *subtask,
            &sub_key,
            format!("{}/browse/{}", DRY_RUN_BASE_URL, sub_key),
        ));
    }
    result
}
