//! Typed wire representations of the Jira responses the importer decodes
//!
//! The payloads are deeply dynamic on the server side; each response the
//! importer consumes is modelled as a concrete type here rather than an
//! opaque map.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One entry of `GET /rest/api/3/issuetype`
#[derive(Debug, Clone, Deserialize)]
pub struct IssueType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
}

/// Body of a successful `POST /rest/api/3/issue`
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self")]
    pub self_url: String,
}

/// Error body Jira returns on 4xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default, rename = "errorMessages")]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl ErrorBody {
    /// Whether the body carried anything worth reporting
    pub fn is_empty(&self) -> bool {
        self.error_messages.is_empty() && self.errors.is_empty()
    }

    /// Join the messages and field errors into one line
    pub fn joined(&self) -> String {
        let mut parts = Vec::new();
        if !self.error_messages.is_empty() {
            parts.push(self.error_messages.join(", "));
        }
        for (field, message) in &self.errors {
            parts.push(format!("{}: {}", field, message));
        }
        parts.join("; ")
    }
}

/// Body of `GET /rest/api/3/search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<SearchIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchIssue {
    pub key: String,
    #[serde(default)]
    pub fields: SearchFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFields {
    #[serde(default)]
    pub summary: String,
}

/// Body of `GET /rest/api/3/issue/createmeta?...&expand=projects.issuetypes.fields`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMetaResponse {
    #[serde(default)]
    pub projects: Vec<MetaProject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaProject {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub issuetypes: Vec<MetaIssueType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaIssueType {
    pub name: String,
    /// Field key (e.g. `customfield_10147`) to its metadata
    #[serde(default)]
    pub fields: BTreeMap<String, MetaField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaField {
    /// Human-readable display name
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "allowedValues")]
    pub allowed_values: Vec<AllowedValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllowedValue {
    #[serde(default)]
    pub id: Option<String>,
}

impl CreateMetaResponse {
    /// Find an issue type by name across the returned projects
    pub fn issue_type(&self, name: &str) -> Option<&MetaIssueType> {
        self.projects
            .iter()
            .flat_map(|p| p.issuetypes.iter())
            .find(|t| t.name == name)
    }
}
