//! Feature resolution
//!
//! A story's parent reference is either a literal issue key, an existing
//! feature to reuse, or a new feature to create. Resolution is
//! idempotent across runs: before creating, a JQL search looks for a
//! feature whose summary fuzzily matches the normalized description.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::jira::payload;
use crate::jira::JiraClient;
use crate::model::{FeatureResult, is_issue_key};

/// Minimum shared-token ratio for two summaries to be considered the
/// same feature.
const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Resolves parent feature references against Jira
pub struct FeatureResolver<'a> {
    client: &'a JiraClient,
    /// Extra fields merged into feature-creation payloads
    extra_fields: Map<String, Value>,
}

impl<'a> FeatureResolver<'a> {
    /// Create a resolver over the given client
    pub fn new(client: &'a JiraClient, extra_fields: Map<String, Value>) -> Self {
        Self {
            client,
            extra_fields,
        }
    }

    /// Resolve a parent description to an issue key, creating the
    /// feature when nothing close enough exists.
    pub async fn create_or_get_feature(
        &self,
        description: &str,
        project_key: &str,
    ) -> FeatureResult {
        let reference = description.trim();

        // A literal key only needs to exist.
        if is_issue_key(reference) {
            return match self.client.validate_parent_issue(reference).await {
                Ok(()) => {
                    debug!(key = reference, "Parent reference is an existing issue");
                    FeatureResult::existing(description, "", reference)
                }
                Err(e) => FeatureResult::failure(
                    description,
                    "",
                    format!("Parent issue validation failed: {}", e),
                ),
            };
        }

        let normalized = normalize_description(description);
        match self.search_existing_feature(&normalized, project_key).await {
            Ok(Some(key)) => {
                info!(key = %key, "Reusing existing feature");
                FeatureResult::existing(description, normalized, key)
            }
            Ok(None) => self.create_feature(description, &normalized, project_key).await,
            Err(e) => {
                warn!(error = %e, "Feature search failed");
                FeatureResult::failure(description, normalized, e.to_string())
            }
        }
    }

    /// Search for a feature whose summary matches the normalized
    /// description, returning the first sufficiently similar key.
    async fn search_existing_feature(
        &self,
        normalized: &str,
        project_key: &str,
    ) -> crate::Result<Option<String>> {
        let jql = format!(
            r#"project = "{}" AND issuetype = "{}" AND summary ~ "{}""#,
            jql_escape(project_key),
            jql_escape(self.client.feature_issue_type()),
            jql_escape(normalized),
        );
        debug!(jql = %jql, "Searching for existing feature");

        let response = self.client.search_issues(&jql).await?;
        for issue in response.issues {
            let candidate = normalize_description(&issue.fields.summary);
            if summaries_match(&candidate, normalized) {
                return Ok(Some(issue.key));
            }
        }
        Ok(None)
    }

    async fn create_feature(
        &self,
        description: &str,
        normalized: &str,
        project_key: &str,
    ) -> FeatureResult {
        let fields = payload::feature_payload(
            description,
            project_key,
            self.client.feature_issue_type(),
            &self.extra_fields,
        );
        match self.client.create_issue(&fields).await {
            Ok(created) => {
                info!(key = %created.key, "Feature created");
                FeatureResult::created(
                    description,
                    normalized,
                    &created.key,
                    self.client.browse_url(&created.key),
                )
            }
            Err(e) => FeatureResult::failure(description, normalized, e.to_string()),
        }
    }
}

/// Normalize a feature description for matching: lower-case, trim, strip
/// characters that are neither word characters nor whitespace, collapse
/// whitespace runs.
pub fn normalize_description(input: &str) -> String {
    static STRIP_RE: OnceLock<Regex> = OnceLock::new();
    static SPACE_RE: OnceLock<Regex> = OnceLock::new();
    let strip = STRIP_RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("strip pattern compiles"));
    let spaces = SPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("space pattern compiles"));

    let lowered = input.to_lowercase();
    let stripped = strip.replace_all(&lowered, "");
    spaces
        .replace_all(stripped.trim(), " ")
        .into_owned()
}

/// Escape a value for interpolation into a quoted JQL string
///
/// Backslashes are doubled before quotes are escaped so the inserted
/// escapes are not themselves re-escaped.
pub fn jql_escape(input: &str) -> String {
    input.replace('\\', r"\\").replace('"', r#"\""#)
}

/// Whether two normalized summaries describe the same feature
///
/// Tokens of length ≤ 2 are ignored for matching; the denominator is the
/// longer token list counted with duplicates. Deliberately lossy — kept
/// behind this predicate so it can be swapped for a better normalizer.
pub fn summaries_match(left: &str, right: &str) -> bool {
    let left_tokens: Vec<&str> = left.split_whitespace().collect();
    let right_tokens: Vec<&str> = right.split_whitespace().collect();

    if left_tokens.is_empty() && right_tokens.is_empty() {
        return true;
    }
    if left_tokens.is_empty() || right_tokens.is_empty() {
        return false;
    }

    let left_long: HashSet<&str> = left_tokens
        .iter()
        .copied()
        .filter(|t| t.chars().count() > 2)
        .collect();
    let shared = right_tokens
        .iter()
        .filter(|t| t.chars().count() > 2 && left_long.contains(*t))
        .count();

    let denominator = left_tokens.len().max(right_tokens.len());
    shared as f64 / denominator as f64 >= SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_description() {
        assert_eq!(
            normalize_description("  Nuevo Sistema de Reportes  "),
            "nuevo sistema de reportes"
        );
        assert_eq!(
            normalize_description("Módulo: pagos (v2)!"),
            "módulo pagos v2"
        );
        assert_eq!(normalize_description("a   b\t\nc"), "a b c");
        assert_eq!(normalize_description("!!!"), "");
    }

    #[test]
    fn test_jql_escape() {
        assert_eq!(jql_escape(r#"x"y\z"#), r#"x\"y\\z"#);
        assert_eq!(jql_escape("plain"), "plain");
        assert_eq!(jql_escape(r"a\b"), r"a\\b");
        assert_eq!(jql_escape(r#"say "hi""#), r#"say \"hi\""#);
    }

    #[test]
    fn test_summaries_match_identical() {
        assert!(summaries_match(
            "nuevo sistema de reportes",
            "nuevo sistema de reportes"
        ));
    }

    #[test]
    fn test_summaries_match_empty_cases() {
        assert!(summaries_match("", ""));
        assert!(!summaries_match("", "algo"));
        assert!(!summaries_match("algo", ""));
    }

    #[test]
    fn test_summaries_match_ignores_short_tokens() {
        // "de" never counts as shared but the denominator still counts
        // it: 2 shared over 3 tokens misses the threshold even for
        // identical strings.
        assert!(!summaries_match(
            "sistema de reportes",
            "sistema de reportes"
        ));
        // Only short tokens: zero shared over a nonzero total.
        assert!(!summaries_match("a b c", "a b c"));
    }

    #[test]
    fn test_summaries_match_threshold() {
        // 2 shared long tokens over max(3, 2) = 0.66 < 0.7
        assert!(!summaries_match(
            "sistema reportes ventas",
            "sistema reportes"
        ));
        // 3 shared long tokens over max(3, 3) = 1.0
        assert!(summaries_match(
            "sistema reportes ventas",
            "ventas sistema reportes"
        ));
    }

    #[test]
    fn test_summaries_match_duplicates_inflate_denominator() {
        // Duplicates on the left inflate the denominator without adding
        // shared counts: 2 shared over max(4, 2) fails the threshold.
        assert!(!summaries_match(
            "sistema sistema reportes reportes",
            "sistema reportes"
        ));
        // Duplicates on the right count once each as shared: 4 over 4.
        assert!(summaries_match(
            "sistema reportes",
            "sistema sistema reportes reportes"
        ));
    }

    #[test]
    fn test_similarity_is_behind_named_predicate() {
        // Unrelated strings must not match.
        assert!(!summaries_match(
            "nuevo sistema de reportes",
            "migración base de datos"
        ));
    }
}
