//! Issue creation payloads
//!
//! Builds the `fields` object for `POST /rest/api/3/issue`. Custom
//! fields have dynamic keys (`customfield_NNNNN`), so the typed struct
//! carries a flattened map for them.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::adf::AdfDocument;
use crate::model::{UserStory, is_issue_key};

/// Request body for issue creation
#[derive(Debug, Clone, Serialize)]
pub struct IssuePayload {
    pub fields: IssueFields,
}

/// The `fields` object of an issue-creation request
#[derive(Debug, Clone, Serialize)]
pub struct IssueFields {
    pub project: ProjectRef,
    pub summary: String,
    pub issuetype: IssueTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<AdfDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueRef>,
    /// Custom fields keyed by field id, flattened into the object
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRef {
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueTypeRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueRef {
    pub key: String,
}

/// Build the story payload
///
/// When a dedicated acceptance-criteria field is configured the
/// description carries only the description text and the criteria go to
/// that field as their own document; otherwise both are combined into
/// the description. The parent link is written only for a literal issue
/// key; descriptive parents must have been resolved upstream.
pub fn story_payload(
    story: &UserStory,
    project_key: &str,
    issue_type: &str,
    acceptance_field: Option<&str>,
) -> IssuePayload {
    let mut custom = Map::new();
    let description = match acceptance_field {
        Some(field_id) => {
            custom.insert(
                field_id.to_string(),
                serde_json::to_value(AdfDocument::from_acceptance_criteria(
                    &story.acceptance_criteria,
                ))
                .unwrap_or(Value::Null),
            );
            AdfDocument::from_description(&story.description)
        }
        None => AdfDocument::combined(&story.description, &story.acceptance_criteria),
    };

    let parent = Some(story.parent.trim())
        .filter(|p| is_issue_key(p))
        .map(|key| IssueRef {
            key: key.to_string(),
        });

    IssuePayload {
        fields: IssueFields {
            project: ProjectRef {
                key: project_key.to_string(),
            },
            summary: story.title.clone(),
            issuetype: IssueTypeRef {
                name: issue_type.to_string(),
            },
            description: Some(description),
            parent,
            custom,
        },
    }
}

/// Build a subtask payload linked to its parent story
pub fn subtask_payload(
    description: &str,
    parent_key: &str,
    project_key: &str,
    subtask_type: &str,
) -> IssuePayload {
    IssuePayload {
        fields: IssueFields {
            project: ProjectRef {
                key: project_key.to_string(),
            },
            summary: description.to_string(),
            issuetype: IssueTypeRef {
                name: subtask_type.to_string(),
            },
            description: Some(AdfDocument::from_description(description)),
            parent: Some(IssueRef {
                key: parent_key.to_string(),
            }),
            custom: Map::new(),
        },
    }
}

/// Build a feature payload with the configured extra required fields
pub fn feature_payload(
    description: &str,
    project_key: &str,
    feature_type: &str,
    extra_fields: &Map<String, Value>,
) -> IssuePayload {
    IssuePayload {
        fields: IssueFields {
            project: ProjectRef {
                key: project_key.to_string(),
            },
            summary: description.to_string(),
            description: Some(AdfDocument::from_description(&format!(
                "Feature creado automáticamente: {}",
                description
            ))),
            issuetype: IssueTypeRef {
                name: feature_type.to_string(),
            },
            parent: None,
            custom: extra_fields.clone(),
        },
    }
}
