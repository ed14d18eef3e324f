//! Jira REST client implementation
//!
//! Async HTTP transport with basic authentication, a 30-second
//! per-request timeout, and typed decoding of every response the
//! importer consumes. Mutating behaviour is limited to issue creation;
//! dry-run short-circuits in the batch orchestrator before reaching this
//! client.

use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use tracing::{debug, info, warn};

use super::payload::{self, IssuePayload};
use super::types::{CreateMetaResponse, CreatedIssue, ErrorBody, IssueType, SearchResponse};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{ProcessResult, SubtaskResult, UserStory};

/// Per-request timeout
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Jira REST v3 client
///
/// Holds the transport plus the issue-type configuration needed to
/// compose story payloads. Cloning is cheap; the underlying HTTP client
/// pools connections.
#[derive(Clone)]
pub struct JiraClient {
    http: HttpClient,
    base_url: String,
    email: String,
    api_token: String,
    default_issue_type: String,
    subtask_issue_type: String,
    feature_issue_type: String,
    acceptance_field: Option<String>,
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("default_issue_type", &self.default_issue_type)
            .finish()
    }
}

/// Builder for creating a JiraClient
pub struct JiraClientBuilder {
    base_url: Option<String>,
    email: Option<String>,
    api_token: Option<String>,
    default_issue_type: String,
    subtask_issue_type: String,
    feature_issue_type: String,
    acceptance_field: Option<String>,
    timeout_secs: u64,
}

impl Default for JiraClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JiraClientBuilder {
    /// Create a new builder with the default issue-type names
    pub fn new() -> Self {
        Self {
            base_url: None,
            email: None,
            api_token: None,
            default_issue_type: crate::config::DEFAULT_ISSUE_TYPE.to_string(),
            subtask_issue_type: crate::config::DEFAULT_SUBTASK_TYPE.to_string(),
            feature_issue_type: crate::config::DEFAULT_FEATURE_TYPE.to_string(),
            acceptance_field: None,
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }

    /// Set the base URL; any trailing slash is stripped
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the account email used for basic auth
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the API token used for basic auth
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the story issue-type name
    pub fn default_issue_type(mut self, name: impl Into<String>) -> Self {
        self.default_issue_type = name.into();
        self
    }

    /// Set the subtask issue-type name
    pub fn subtask_issue_type(mut self, name: impl Into<String>) -> Self {
        self.subtask_issue_type = name.into();
        self
    }

    /// Set the feature issue-type name
    pub fn feature_issue_type(mut self, name: impl Into<String>) -> Self {
        self.feature_issue_type = name.into();
        self
    }

    /// Set the custom field id holding acceptance criteria
    pub fn acceptance_field(mut self, field: impl Into<String>) -> Self {
        self.acceptance_field = Some(field.into());
        self
    }

    /// Override the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Build the JiraClient
    pub fn build(self) -> Result<JiraClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("Jira base URL is required".to_string()))?;
        let email = self
            .email
            .ok_or_else(|| Error::Config("Jira email is required".to_string()))?;
        let api_token = self
            .api_token
            .ok_or_else(|| Error::Config("Jira API token is required".to_string()))?;

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(Error::Network)?;

        Ok(JiraClient {
            http,
            base_url,
            email,
            api_token,
            default_issue_type: self.default_issue_type,
            subtask_issue_type: self.subtask_issue_type,
            feature_issue_type: self.feature_issue_type,
            acceptance_field: self.acceptance_field,
        })
    }
}

impl JiraClient {
    /// Create a new builder
    pub fn builder() -> JiraClientBuilder {
        JiraClientBuilder::new()
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder()
            .base_url(&config.jira_url)
            .email(&config.jira_email)
            .api_token(&config.jira_api_token)
            .default_issue_type(&config.default_issue_type)
            .subtask_issue_type(&config.subtask_issue_type)
            .feature_issue_type(&config.feature_issue_type);
        if let Some(field) = &config.acceptance_criteria_field {
            builder = builder.acceptance_field(field);
        }
        builder.build()
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured feature issue-type name
    pub fn feature_issue_type(&self) -> &str {
        &self.feature_issue_type
    }

    /// Browse URL for a created issue
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.email, Some(&self.api_token))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.email, Some(&self.api_token))
    }

    /// Verify credentials against `/myself`
    pub async fn test_connection(&self) -> Result<()> {
        let response = self.get("/rest/api/3/myself").send().await?;
        if response.status() != StatusCode::OK {
            return Err(Error::AuthenticationFailed(response.status().as_u16()));
        }
        debug!("Jira connection verified");
        Ok(())
    }

    /// Verify the project exists and is visible
    pub async fn validate_project(&self, key: &str) -> Result<()> {
        let response = self
            .get(&format!("/rest/api/3/project/{}", key))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::ProjectNotFound {
                key: key.to_string(),
            }),
            status => Err(Error::ProjectValidation(status.as_u16())),
        }
    }

    /// Verify a parent issue exists
    pub async fn validate_parent_issue(&self, key: &str) -> Result<()> {
        let response = self
            .get(&format!("/rest/api/3/issue/{}", key))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::ParentIssueNotFound {
                key: key.to_string(),
            }),
            status => Err(Error::ParentIssueValidation(status.as_u16())),
        }
    }

    /// List every issue type visible to the account
    pub async fn get_issue_types(&self) -> Result<Vec<IssueType>> {
        let response = self.get("/rest/api/3/issuetype").send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::IssueTypes(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| Error::JiraApi(format!("failed to decode issue types: {}", e)))
    }

    /// Verify the configured subtask type exists and is a subtask type
    pub async fn validate_subtask_issue_type(&self) -> Result<()> {
        let types = self.get_issue_types().await?;
        types
            .iter()
            .find(|t| t.name == self.subtask_issue_type && t.subtask)
            .map(|_| ())
            .ok_or_else(|| Error::SubtaskIssueTypeNotFound(self.subtask_issue_type.clone()))
    }

    /// Verify the configured feature type exists
    pub async fn validate_feature_issue_type(&self) -> Result<()> {
        let types = self.get_issue_types().await?;
        types
            .iter()
            .find(|t| t.name == self.feature_issue_type)
            .map(|_| ())
            .ok_or_else(|| Error::FeatureIssueTypeNotFound(self.feature_issue_type.clone()))
    }

    /// Create one issue from a prepared payload
    pub async fn create_issue(&self, payload: &IssuePayload) -> Result<CreatedIssue> {
        let response = self.post("/rest/api/3/issue").json(payload).send().await?;
        let status = response.status();

        if status == StatusCode::CREATED {
            let created: CreatedIssue = response
                .json()
                .await
                .map_err(|e| Error::JiraApi(format!("failed to decode created issue: {}", e)))?;
            debug!(key = %created.key, "Issue created");
            return Ok(created);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&body)
                && !parsed.is_empty()
            {
                return Err(Error::JiraApi(parsed.joined()));
            }
        }
        Err(Error::CreateIssue {
            status: status.as_u16(),
            body,
        })
    }

    /// Search issues by JQL, fetching key and summary only
    pub async fn search_issues(&self, jql: &str) -> Result<SearchResponse> {
        let response = self
            .get("/rest/api/3/search")
            .query(&[("jql", jql), ("fields", "key,summary")])
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Search(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| Error::JiraApi(format!("failed to decode search response: {}", e)))
    }

    /// Fetch creation metadata for the given issue types of a project
    pub async fn get_create_meta(
        &self,
        project_key: &str,
        issue_type_names: &[&str],
    ) -> Result<CreateMetaResponse> {
        let type_names = issue_type_names.join(",");
        let response = self
            .get("/rest/api/3/issue/createmeta")
            .query(&[
                ("projectKeys", project_key),
                ("issuetypeNames", type_names.as_str()),
                ("expand", "projects.issuetypes.fields"),
            ])
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::JiraApi(format!(
                "failed to fetch createmeta: status {}",
                status.as_u16()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::JiraApi(format!("failed to decode createmeta: {}", e)))
    }

    /// Create the story issue and its valid subtasks
    ///
    /// Transport failures never escape as errors: the story outcome and
    /// every subtask outcome are captured into the returned
    /// [`ProcessResult`].
    pub async fn create_user_story(
        &self,
        story: &UserStory,
        project_key: &str,
    ) -> ProcessResult {
        let mut result = ProcessResult::new(story.row_number);

        let story_fields = payload::story_payload(
            story,
            project_key,
            &self.default_issue_type,
            self.acceptance_field.as_deref(),
        );
        let created = match self.create_issue(&story_fields).await {
            Ok(created) => created,
            Err(e) => {
                warn!(row = story.row_number, error = %e, "Story creation failed");
                result.mark_failure(e.to_string());
                return result;
            }
        };

        info!(row = story.row_number, key = %created.key, "Story created");
        result.mark_success(&created.key, self.browse_url(&created.key));

        for subtask in story.valid_subtasks() {
            let subtask_fields = payload::subtask_payload(
                subtask,
                &created.key,
                project_key,
                &self.subtask_issue_type,
            );
            match self.create_issue(&subtask_fields).await {
                Ok(sub) => {
                    debug!(parent = %created.key, key = %sub.key, "Subtask created");
                    result.add_subtask_result(SubtaskResult::success(
                        subtask,
                        &sub.key,
                        self.browse_url(&sub.key),
                    ));
                }
                Err(e) => {
                    warn!(parent = %created.key, error = %e, "Subtask creation failed");
                    result.add_subtask_result(SubtaskResult::failure(subtask, e.to_string()));
                }
            }
        }
        result
    }
}
