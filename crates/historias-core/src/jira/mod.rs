//! Jira REST v3 transport
//!
//! A thin, typed client over the handful of endpoints the importer
//! needs: identity, project/issue validation, issue-type listing, issue
//! creation, JQL search, and the createmeta probe. Dry-run is not a
//! concern here; it lives in the batch orchestrator so the client stays
//! a pure transport.

mod client;
pub mod payload;
pub mod types;

pub use client::{JiraClient, JiraClientBuilder};
