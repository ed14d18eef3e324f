//! First-run configuration discovery
//!
//! Probes the project's creation metadata to find the custom field that
//! holds acceptance criteria and the extra fields the feature type
//! requires. Probe failures degrade to an empty configuration: the
//! client then embeds criteria in the description and sends feature
//! payloads without extras.

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::error::Result;
use crate::jira::JiraClient;
use crate::jira::types::MetaIssueType;

/// Substrings that identify an acceptance-criteria field by display name
const ACCEPTANCE_NAME_HINTS: [&str; 4] = ["acceptance", "criterio", "criteria", "aceptacion"];

/// Built-in fields excluded from required-field discovery
const BUILTIN_FIELDS: [&str; 4] = ["project", "issuetype", "summary", "description"];

/// Find the custom field id that holds acceptance criteria for the
/// story issue type, if any.
pub async fn discover_acceptance_field(
    client: &JiraClient,
    project_key: &str,
    story_type: &str,
) -> Result<Option<String>> {
    let meta = client.get_create_meta(project_key, &[story_type]).await?;
    let Some(issue_type) = meta.issue_type(story_type) else {
        warn!(issue_type = story_type, "createmeta has no such issue type");
        return Ok(None);
    };
    Ok(find_acceptance_field(issue_type))
}

/// Collect the feature type's extra required fields, mapped to their
/// first allowed value.
pub async fn discover_feature_required_fields(
    client: &JiraClient,
    project_key: &str,
    feature_type: &str,
) -> Result<Map<String, Value>> {
    let meta = client.get_create_meta(project_key, &[feature_type]).await?;
    let Some(issue_type) = meta.issue_type(feature_type) else {
        warn!(issue_type = feature_type, "createmeta has no such issue type");
        return Ok(Map::new());
    };
    Ok(collect_required_fields(issue_type))
}

/// First field whose lowercased display name contains one of the
/// acceptance hints.
fn find_acceptance_field(issue_type: &MetaIssueType) -> Option<String> {
    for (field_key, field) in &issue_type.fields {
        let name = field.name.to_lowercase();
        if ACCEPTANCE_NAME_HINTS.iter().any(|hint| name.contains(hint)) {
            info!(field = %field_key, name = %field.name, "Found acceptance criteria field");
            return Some(field_key.clone());
        }
    }
    None
}

/// Required non-builtin fields that declare allowed values, each mapped
/// to `{"id": <first allowed id>}`.
fn collect_required_fields(issue_type: &MetaIssueType) -> Map<String, Value> {
    let mut fields = Map::new();
    for (field_key, field) in &issue_type.fields {
        if !field.required || BUILTIN_FIELDS.contains(&field_key.as_str()) {
            continue;
        }
        if let Some(id) = field.allowed_values.iter().find_map(|v| v.id.clone()) {
            info!(field = %field_key, "Adding required feature field");
            fields.insert(field_key.clone(), json!({ "id": id }));
        }
    }
    fields
}
