//! Environment-backed configuration
//!
//! The importer is configured through a newline-delimited key=value file
//! loaded into the process environment before [`Config::from_env`] runs.
//! Required keys are the Jira credentials; everything else has a default.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Default story issue type
pub const DEFAULT_ISSUE_TYPE: &str = "Story";
/// Default subtask issue type
pub const DEFAULT_SUBTASK_TYPE: &str = "Sub-task";
/// Default feature issue type
pub const DEFAULT_FEATURE_TYPE: &str = "Feature";
/// Default input directory
pub const DEFAULT_INPUT_DIR: &str = "entrada";
/// Default logs directory
pub const DEFAULT_LOGS_DIR: &str = "logs";
/// Default processed-files directory
pub const DEFAULT_PROCESSED_DIR: &str = "procesados";
/// Default batch size hint
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Importer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Jira base URL, trailing slash stripped
    pub jira_url: String,
    pub jira_email: String,
    pub jira_api_token: String,
    pub project_key: Option<String>,
    pub default_issue_type: String,
    pub subtask_issue_type: String,
    pub feature_issue_type: String,
    /// Custom field id holding acceptance criteria, when discovered
    pub acceptance_criteria_field: Option<String>,
    /// Extra fields merged into feature-creation payloads
    pub feature_required_fields: Map<String, Value>,
    pub input_directory: PathBuf,
    pub logs_directory: PathBuf,
    pub processed_directory: PathBuf,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    Error::Config(format!("missing required environment variable {}", key))
                })
        };

        let jira_url = required("JIRA_URL")?
            .trim_end_matches('/')
            .to_string();
        let jira_email = required("JIRA_EMAIL")?;
        let jira_api_token = required("JIRA_API_TOKEN")?;

        let batch_size = match lookup("BATCH_SIZE") {
            None => DEFAULT_BATCH_SIZE,
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::Config(format!("BATCH_SIZE must be an integer, got '{}'", raw))
            })?,
        };

        let dry_run = parse_bool(lookup("DRY_RUN").as_deref());

        if parse_bool(lookup("ROLLBACK_ON_SUBTASK_FAILURE").as_deref()) {
            return Err(Error::Config(
                "ROLLBACK_ON_SUBTASK_FAILURE is not supported: the Jira API surface \
                 used by this importer has no issue deletion, so partial stories \
                 cannot be rolled back. Remove the flag or set it to false."
                    .to_string(),
            ));
        }

        let feature_required_fields = match lookup("FEATURE_REQUIRED_FIELDS") {
            None => Map::new(),
            Some(raw) if raw.trim().is_empty() => Map::new(),
            Some(raw) => parse_feature_fields(&raw)?,
        };

        Ok(Self {
            jira_url,
            jira_email,
            jira_api_token,
            project_key: lookup("PROJECT_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            default_issue_type: lookup("DEFAULT_ISSUE_TYPE")
                .unwrap_or_else(|| DEFAULT_ISSUE_TYPE.to_string()),
            subtask_issue_type: lookup("SUBTASK_ISSUE_TYPE")
                .unwrap_or_else(|| DEFAULT_SUBTASK_TYPE.to_string()),
            feature_issue_type: lookup("FEATURE_ISSUE_TYPE")
                .unwrap_or_else(|| DEFAULT_FEATURE_TYPE.to_string()),
            acceptance_criteria_field: lookup("ACCEPTANCE_CRITERIA_FIELD")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            feature_required_fields,
            input_directory: lookup("INPUT_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
            logs_directory: lookup("LOGS_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGS_DIR)),
            processed_directory: lookup("PROCESSED_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROCESSED_DIR)),
            batch_size,
            dry_run,
        })
    }

    /// Render the key=value env file for this configuration
    pub fn render_env_file(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "JIRA_URL={}", self.jira_url);
        let _ = writeln!(out, "JIRA_EMAIL={}", self.jira_email);
        let _ = writeln!(out, "JIRA_API_TOKEN={}", self.jira_api_token);
        if let Some(key) = &self.project_key {
            let _ = writeln!(out, "PROJECT_KEY={}", key);
        }
        let _ = writeln!(out, "DEFAULT_ISSUE_TYPE={}", self.default_issue_type);
        let _ = writeln!(out, "SUBTASK_ISSUE_TYPE={}", self.subtask_issue_type);
        let _ = writeln!(out, "FEATURE_ISSUE_TYPE={}", self.feature_issue_type);
        if let Some(field) = &self.acceptance_criteria_field {
            let _ = writeln!(out, "ACCEPTANCE_CRITERIA_FIELD={}", field);
        }
        if !self.feature_required_fields.is_empty() {
            let _ = writeln!(
                out,
                "FEATURE_REQUIRED_FIELDS={}",
                Value::Object(self.feature_required_fields.clone())
            );
        }
        let _ = writeln!(out, "INPUT_DIRECTORY={}", self.input_directory.display());
        let _ = writeln!(out, "LOGS_DIRECTORY={}", self.logs_directory.display());
        let _ = writeln!(
            out,
            "PROCESSED_DIRECTORY={}",
            self.processed_directory.display()
        );
        let _ = writeln!(out, "BATCH_SIZE={}", self.batch_size);
        let _ = writeln!(out, "DRY_RUN={}", self.dry_run);
        out
    }

    /// Write the env file to the given path
    pub fn write_env_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render_env_file())?;
        Ok(())
    }
}

/// Accepts "1"/"true" (any case) as true, everything else as false
fn parse_bool(raw: Option<&str>) -> bool {
    raw.map(|v| {
        let v = v.trim();
        v == "1" || v.eq_ignore_ascii_case("true")
    })
    .unwrap_or(false)
}

/// FEATURE_REQUIRED_FIELDS must be a JSON object; anything else refuses
/// to start rather than silently sending incomplete feature payloads.
fn parse_feature_fields(raw: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        Error::Config(format!("FEATURE_REQUIRED_FIELDS is not valid JSON: {}", e))
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Config(format!(
            "FEATURE_REQUIRED_FIELDS must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
