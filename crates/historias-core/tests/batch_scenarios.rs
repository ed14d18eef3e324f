//! End-to-end batch scenarios
//!
//! Each test drives the full pipeline: file on disk, preflight against a
//! mock Jira, per-row processing, accounting, and file disposition.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use historias_core::batch::BatchProcessor;
use historias_core::config::Config;
use historias_core::jira::JiraClient;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STORY_CSV: &str = "titulo,descripcion,criterio_aceptacion,subtareas,parent\n\
                         Login,Quiero autenticarme,Credenciales válidas,\"Form;Validación\",\n";

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn config_for(base_url: &str, processed_dir: &Path) -> Config {
    let vars = HashMap::from([
        ("JIRA_URL".to_string(), base_url.to_string()),
        ("JIRA_EMAIL".to_string(), "ana@example.com".to_string()),
        ("JIRA_API_TOKEN".to_string(), "secret-token".to_string()),
        ("PROJECT_KEY".to_string(), "PROJ".to_string()),
        (
            "PROCESSED_DIRECTORY".to_string(),
            processed_dir.display().to_string(),
        ),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

async fn mount_preflight(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/api/3/myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accountId": "a1"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/project/PROJ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "PROJ"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issuetype"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "1", "name": "Story", "subtask": false},
            {"id": "2", "name": "Sub-task", "subtask": true},
            {"id": "3", "name": "Feature", "subtask": false}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_dry_run_happy_path_with_two_subtasks() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "stories.csv", STORY_CSV);
    let processed = dir.path().join("procesados");

    // The client is never contacted in dry-run.
    let config = config_for("https://example.invalid", &processed);
    let client = JiraClient::from_config(&config).unwrap();
    let processor = BatchProcessor::new(&client, &config);

    let batch = processor.execute(&file, "PROJ", true).await.unwrap();

    assert!(batch.dry_run);
    assert_eq!(batch.total_rows, 1);
    assert_eq!(batch.processed_rows, 1);
    assert_eq!(batch.successful_rows, 1);
    assert_eq!(batch.error_rows, 0);
    assert_eq!(
        batch.processed_rows,
        batch.successful_rows + batch.error_rows
    );

    let row = &batch.results[0];
    assert_eq!(row.issue_key, "DRY-RUN-2");
    assert_eq!(row.subtask_results.len(), 2);
    assert_eq!(row.subtask_results[0].issue_key, "DRY-SUB-2-1");
    assert_eq!(row.subtask_results[1].issue_key, "DRY-SUB-2-2");
    assert!(row.subtask_results.iter().all(|s| s.success));

    // Dry-run never moves the file.
    assert!(file.exists());
    assert!(!processed.exists());
    assert!(batch.is_successful());
}

#[tokio::test]
async fn test_feature_created_then_reused_across_rows() {
    let server = MockServer::start().await;
    mount_preflight(&server).await;

    // Row one finds nothing and creates the feature; row two's search
    // returns it.
    Mock::given(method("GET"))
        .and(path("/rest/api/3/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"issues": []})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [
                {"key": "PROJ-500", "fields": {"summary": "Nuevo Sistema de Reportes"}}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue"))
        .and(body_partial_json(json!({"fields": {"issuetype": {"name": "Feature"}}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "9", "key": "PROJ-500", "self": "u"
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Both stories must be linked to the resolved feature.
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue"))
        .and(body_partial_json(json!({
            "fields": {"issuetype": {"name": "Story"}, "parent": {"key": "PROJ-500"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "10", "key": "PROJ-601", "self": "u"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue"))
        .and(body_partial_json(json!({
            "fields": {"issuetype": {"name": "Story"}, "parent": {"key": "PROJ-500"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "11", "key": "PROJ-602", "self": "u"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "stories.csv",
        "titulo,descripcion,criterio_aceptacion,subtareas,parent\n\
         Reporte diario,Como gestor quiero verlo,Se genera,,Nuevo Sistema de Reportes\n\
         Reporte mensual,Como gestor quiero verlo,Se genera,,Nuevo Sistema de Reportes\n",
    );
    let processed = dir.path().join("procesados");
    let config = config_for(&server.uri(), &processed);
    let client = JiraClient::from_config(&config).unwrap();
    let processor = BatchProcessor::new(&client, &config);

    let batch = processor.execute(&file, "PROJ", false).await.unwrap();

    assert_eq!(batch.successful_rows, 2);
    assert_eq!(batch.error_rows, 0);
    assert_eq!(batch.results[0].issue_key, "PROJ-601");
    assert_eq!(batch.results[1].issue_key, "PROJ-602");

    // Successful real-mode batches move the file.
    assert!(!file.exists());
    assert!(processed.join("stories.csv").exists());
    assert!(batch.is_successful());
}

#[tokio::test]
async fn test_missing_parent_key_fails_row_and_batch_continues() {
    let server = MockServer::start().await;
    mount_preflight(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/PROJ-999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // The failed row must not reach issue creation; the second row does.
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue"))
        .and(body_partial_json(json!({"fields": {"summary": "Otra historia"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "10", "key": "PROJ-700", "self": "u"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "stories.csv",
        "titulo,descripcion,criterio_aceptacion,subtareas,parent\n\
         Historia con padre,Descripción,Criterio,,PROJ-999\n\
         Otra historia,Descripción,Criterio,,\n",
    );
    let processed = dir.path().join("procesados");
    let config = config_for(&server.uri(), &processed);
    let client = JiraClient::from_config(&config).unwrap();
    let processor = BatchProcessor::new(&client, &config);

    let batch = processor.execute(&file, "PROJ", false).await.unwrap();

    assert_eq!(batch.processed_rows, 2);
    assert_eq!(batch.error_rows, 1);
    assert_eq!(batch.successful_rows, 1);

    let failed = &batch.results[0];
    assert!(!failed.success);
    assert!(failed.issue_key.is_empty());
    assert!(
        failed
            .error_message
            .starts_with("feature handling failed:"),
        "unexpected message: {}",
        failed.error_message
    );
    assert!(
        failed
            .error_message
            .contains("parent issue 'PROJ-999' not found")
    );

    assert_eq!(batch.results[1].issue_key, "PROJ-700");
}

#[tokio::test]
async fn test_preflight_failure_names_the_step() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/myself"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "stories.csv", STORY_CSV);
    let processed = dir.path().join("procesados");
    let config = config_for(&server.uri(), &processed);
    let client = JiraClient::from_config(&config).unwrap();
    let processor = BatchProcessor::new(&client, &config);

    let err = processor.execute(&file, "PROJ", false).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configuration error: connection test failed: authentication failed: status 401"
    );
    assert!(file.exists());
}

#[tokio::test]
async fn test_dry_run_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "empty.csv",
        "titulo,descripcion,criterio_aceptacion\n",
    );
    let processed = dir.path().join("procesados");
    let config = config_for("https://example.invalid", &processed);
    let client = JiraClient::from_config(&config).unwrap();
    let processor = BatchProcessor::new(&client, &config);

    let err = processor.execute(&file, "PROJ", true).await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("file validation failed:"));
    assert!(message.contains("file contains no valid stories"));
}

#[tokio::test]
async fn test_directory_mode_isolates_failing_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("entrada");
    fs::create_dir(&input).unwrap();
    write_file(&input, "a.csv", STORY_CSV);
    // Garbage bytes with a spreadsheet extension fail to parse.
    write_file(&input, "b.xlsx", "not a workbook");

    let processed = dir.path().join("procesados");
    let config = config_for("https://example.invalid", &processed);
    let client = JiraClient::from_config(&config).unwrap();
    let processor = BatchProcessor::new(&client, &config);

    let results = processor
        .process_all_files(&input, "PROJ", true)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);

    let ok = &results[0];
    assert_eq!(ok.file_name, "a.csv");
    assert_eq!(ok.successful_rows, 1);
    assert!(ok.is_successful());

    let failed = &results[1];
    assert_eq!(failed.file_name, "b.xlsx");
    assert_eq!(failed.processed_rows, 0);
    assert!(!failed.is_successful());
    assert!(failed.errors[0].starts_with("Error processing file:"));
}

#[tokio::test]
async fn test_directory_mode_requires_pending_files() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("entrada");
    fs::create_dir(&input).unwrap();

    let processed = dir.path().join("procesados");
    let config = config_for("https://example.invalid", &processed);
    let client = JiraClient::from_config(&config).unwrap();
    let processor = BatchProcessor::new(&client, &config);

    let err = processor
        .process_all_files(&input, "PROJ", true)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("no files found in"));
}

#[tokio::test]
async fn test_move_failure_downgrades_to_warning() {
    let server = MockServer::start().await;
    mount_preflight(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "10", "key": "PROJ-800", "self": "u"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "stories.csv", STORY_CSV);
    // A file where the processed directory should be makes the rename fail.
    let processed = dir.path().join("procesados");
    fs::write(&processed, "in the way").unwrap();

    let config = config_for(&server.uri(), &processed);
    let client = JiraClient::from_config(&config).unwrap();
    let processor = BatchProcessor::new(&client, &config);

    let batch = processor.execute(&file, "PROJ", false).await.unwrap();

    // Rows succeeded; the move failure is only a warning.
    assert_eq!(batch.successful_rows, 1);
    assert_eq!(batch.error_rows, 0);
    assert!(file.exists());
    assert_eq!(batch.errors.len(), 1);
    assert!(
        batch.errors[0].starts_with("Warning: could not move file to processed:")
    );
    // The warning still disqualifies the batch from full success.
    assert!(!batch.is_successful());
}
