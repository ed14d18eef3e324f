//! Historias CLI - batch user-story importer for Jira

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use historias_core::batch::BatchProcessor;
use historias_core::config::Config;
use historias_core::jira::JiraClient;
use historias_core::model::BatchResult;
use historias_core::{reader, setup};
use tracing::{info, warn};

/// Environment file consulted on startup
const ENV_FILE: &str = ".env";

#[derive(Parser)]
#[command(name = "historias")]
#[command(author, version, about = "Batch user-story importer for Jira", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Jira project key (overrides PROJECT_KEY)
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Process a single file instead of the input directory
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Parse and account for rows without creating issues
    #[arg(long, global = true)]
    dry_run: bool,

    /// Rows between progress log lines (overrides BATCH_SIZE)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Import stories from the input directory (or --file)
    Process,

    /// Validate input files without touching Jira
    Validate {
        /// Number of rows to preview per file
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },

    /// Check Jira credentials and connectivity
    TestConnection,

    /// Run environment and configuration checks
    Diagnose,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("historias_core={}", cli.log_level).parse()?)
                .add_directive(format!("historias_cli={}", cli.log_level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load the environment file; offer first-run setup when it is
    // missing and we can talk to the operator.
    if Path::new(ENV_FILE).exists() {
        dotenvy::from_path(ENV_FILE)?;
    } else if !matches!(cli.command, Commands::Diagnose) && std::io::stdin().is_terminal() {
        run_first_time_setup().await?;
        dotenvy::from_path(ENV_FILE)?;
    }

    match cli.command {
        Commands::Process => {
            cmd_process(
                cli.project.as_deref(),
                cli.file.as_deref(),
                cli.dry_run,
                cli.batch_size,
                cli.format,
            )
            .await
        }
        Commands::Validate { preview } => cmd_validate(cli.file.as_deref(), preview, cli.format),
        Commands::TestConnection => cmd_test_connection(cli.project.as_deref()).await,
        Commands::Diagnose => cmd_diagnose(cli.project.as_deref()).await,
    }
}

/// Load configuration and apply command-line overrides
fn load_config(
    project: Option<&str>,
    dry_run: bool,
    batch_size: Option<usize>,
) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(key) = project {
        config.project_key = Some(key.to_string());
    }
    if dry_run {
        config.dry_run = true;
    }
    if let Some(size) = batch_size {
        config.batch_size = size;
    }
    Ok(config)
}

fn require_project(config: &Config) -> anyhow::Result<String> {
    config.project_key.clone().ok_or_else(|| {
        anyhow::anyhow!("no project key: pass --project or set PROJECT_KEY in {}", ENV_FILE)
    })
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_process(
    project: Option<&str>,
    file: Option<&Path>,
    dry_run: bool,
    batch_size: Option<usize>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = load_config(project, dry_run, batch_size)?;
    let project_key = require_project(&config)?;
    let client = JiraClient::from_config(&config)?;
    let processor = BatchProcessor::new(&client, &config);

    let results = match file {
        Some(path) => vec![
            processor
                .execute(path, &project_key, config.dry_run)
                .await?,
        ],
        None => {
            processor
                .process_all_files(&config.input_directory, &project_key, config.dry_run)
                .await?
        }
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            for batch in &results {
                print_batch_report(batch);
            }
            print_run_summary(&results);
        }
    }
    Ok(())
}

fn cmd_validate(file: Option<&Path>, preview: usize, format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let files = match file {
        Some(path) => vec![path.to_path_buf()],
        None => reader::pending_files(&config.input_directory),
    };
    if files.is_empty() {
        anyhow::bail!(
            "no files found in {}",
            config.input_directory.display()
        );
    }

    let mut failures = 0usize;
    for path in &files {
        match reader::validate_file(path) {
            Ok(stories) => {
                if format == OutputFormat::Json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "file": path.display().to_string(),
                            "valid": true,
                            "stories": stories.len(),
                        })
                    );
                    continue;
                }
                println!("[OK] {}: {} stories", path.display(), stories.len());
                for story in stories.iter().take(preview) {
                    println!(
                        "     row {}: {} ({} subtasks{})",
                        story.row_number,
                        story.title,
                        story.valid_subtasks().len(),
                        if story.has_parent() {
                            format!(", parent: {}", story.parent)
                        } else {
                            String::new()
                        }
                    );
                }
                if stories.len() > preview {
                    println!("     ... {} more rows", stories.len() - preview);
                }
            }
            Err(e) => {
                failures += 1;
                if format == OutputFormat::Json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "file": path.display().to_string(),
                            "valid": false,
                            "error": e.to_string(),
                        })
                    );
                } else {
                    println!("[!!] {}: {}", path.display(), e);
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files failed validation", failures, files.len());
    }
    Ok(())
}

async fn cmd_test_connection(project: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(project, false, None)?;
    let client = JiraClient::from_config(&config)?;

    client.test_connection().await?;
    println!("[OK] Connection: authenticated against {}", config.jira_url);

    if let Some(key) = &config.project_key {
        client.validate_project(key).await?;
        println!("[OK] Project: {} is visible", key);
    }
    Ok(())
}

async fn cmd_diagnose(project: Option<&str>) -> anyhow::Result<()> {
    // Check environment file
    if Path::new(ENV_FILE).exists() {
        println!("[OK] Environment file: {}", ENV_FILE);
        dotenvy::from_path(ENV_FILE).ok();
    } else {
        println!("[--] Environment file: {} not found (run any command to set up)", ENV_FILE);
    }

    // Check configuration
    let config = match load_config(project, false, None) {
        Ok(config) => {
            println!("[OK] Configuration: loaded");
            config
        }
        Err(e) => {
            println!("[!!] Configuration: {}", e);
            println!("\nSome checks failed. See above for details.");
            return Ok(());
        }
    };

    // Check directories
    for (label, dir) in [
        ("Input directory", &config.input_directory),
        ("Processed directory", &config.processed_directory),
        ("Logs directory", &config.logs_directory),
    ] {
        if dir.is_dir() {
            println!("[OK] {}: {}", label, dir.display());
        } else {
            println!("[--] {}: {} (missing, created on demand)", label, dir.display());
        }
    }

    let pending = reader::pending_files(&config.input_directory);
    println!("     Pending files: {}", pending.len());

    // Check connection and project
    let mut all_ok = true;
    let client = JiraClient::from_config(&config)?;
    match client.test_connection().await {
        Ok(()) => println!("[OK] Connection: authenticated"),
        Err(e) => {
            all_ok = false;
            println!("[!!] Connection: {}", e);
        }
    }

    if let Some(key) = &config.project_key {
        match client.validate_project(key).await {
            Ok(()) => println!("[OK] Project: {}", key),
            Err(e) => {
                all_ok = false;
                println!("[!!] Project: {}", e);
            }
        }
    } else {
        println!("[--] Project: no PROJECT_KEY configured");
    }

    match client.validate_subtask_issue_type().await {
        Ok(()) => println!("[OK] Subtask issue type: {}", config.subtask_issue_type),
        Err(e) => {
            all_ok = false;
            println!("[!!] Subtask issue type: {}", e);
        }
    }
    match client.validate_feature_issue_type().await {
        Ok(()) => println!("[OK] Feature issue type: {}", config.feature_issue_type),
        Err(e) => {
            all_ok = false;
            println!("[!!] Feature issue type: {}", e);
        }
    }

    match &config.acceptance_criteria_field {
        Some(field) => println!("[OK] Acceptance criteria field: {}", field),
        None => println!("[--] Acceptance criteria field: not set (criteria go into the description)"),
    }

    println!();
    if all_ok {
        println!("All checks passed!");
    } else {
        println!("Some checks failed. See above for details.");
    }
    Ok(())
}

// ============================================================================
// First-run setup
// ============================================================================

/// Interactive bootstrap: prompt for credentials, probe the project for
/// field configuration, and write the environment file.
async fn run_first_time_setup() -> anyhow::Result<()> {
    println!("No {} found - setting up.", ENV_FILE);
    let mut editor = rustyline::DefaultEditor::new()?;

    let jira_url = prompt_required(&mut editor, "Jira base URL (https://your-site.atlassian.net)")?;
    let jira_email = prompt_required(&mut editor, "Account email")?;
    let jira_api_token = prompt_required(&mut editor, "API token")?;
    let project_key = prompt_optional(&mut editor, "Default project key (optional)")?;

    let mut config = Config::from_lookup(|key| match key {
        "JIRA_URL" => Some(jira_url.clone()),
        "JIRA_EMAIL" => Some(jira_email.clone()),
        "JIRA_API_TOKEN" => Some(jira_api_token.clone()),
        "PROJECT_KEY" => project_key.clone(),
        _ => None,
    })?;

    let client = JiraClient::from_config(&config)?;
    match client.test_connection().await {
        Ok(()) => println!("[OK] Connection verified"),
        Err(e) => warn!("Could not verify connection: {}", e),
    }

    if let Some(key) = config.project_key.clone() {
        offer_issue_type_choices(&mut editor, &client, &mut config).await;
        probe_field_configuration(&client, &key, &mut config).await;
    }

    config.write_env_file(Path::new(ENV_FILE))?;
    println!("Wrote {}. Edit it at any time to change the configuration.", ENV_FILE);
    Ok(())
}

/// Offer the account's issue types as defaults for the three type names
async fn offer_issue_type_choices(
    editor: &mut rustyline::DefaultEditor,
    client: &JiraClient,
    config: &mut Config,
) {
    let names: Vec<String> = match client.get_issue_types().await {
        Ok(types) => types.into_iter().map(|t| t.name).collect(),
        Err(e) => {
            warn!("Could not list issue types: {}", e);
            return;
        }
    };
    println!("Available issue types: {}", names.join(", "));

    let prompts = [
        ("Story issue type", &mut config.default_issue_type),
        ("Subtask issue type", &mut config.subtask_issue_type),
        ("Feature issue type", &mut config.feature_issue_type),
    ];
    for (label, slot) in prompts {
        let line = editor
            .readline(&format!("{} [{}]: ", label, slot))
            .unwrap_or_default();
        let choice = line.trim();
        if !choice.is_empty() {
            *slot = choice.to_string();
        }
    }
}

/// Probe createmeta for the acceptance field and the feature type's
/// required fields. Failures leave the configuration empty.
async fn probe_field_configuration(client: &JiraClient, project_key: &str, config: &mut Config) {
    match setup::discover_acceptance_field(client, project_key, &config.default_issue_type).await {
        Ok(Some(field)) => {
            println!("[OK] Acceptance criteria field: {}", field);
            config.acceptance_criteria_field = Some(field);
        }
        Ok(None) => {
            println!("[--] No acceptance criteria field; criteria go into the description");
        }
        Err(e) => warn!("Acceptance field probe failed: {}", e),
    }

    match setup::discover_feature_required_fields(client, project_key, &config.feature_issue_type)
        .await
    {
        Ok(fields) if !fields.is_empty() => {
            println!("[OK] Feature required fields: {}", fields.len());
            config.feature_required_fields = fields;
        }
        Ok(_) => {}
        Err(e) => warn!("Feature required-field probe failed: {}", e),
    }
}

fn prompt_required(
    editor: &mut rustyline::DefaultEditor,
    label: &str,
) -> anyhow::Result<String> {
    loop {
        let line = editor.readline(&format!("{}: ", label))?;
        let value = line.trim();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
        println!("A value is required.");
    }
}

fn prompt_optional(
    editor: &mut rustyline::DefaultEditor,
    label: &str,
) -> anyhow::Result<Option<String>> {
    let line = editor.readline(&format!("{}: ", label))?;
    let value = line.trim();
    Ok(if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    })
}

// ============================================================================
// Reporting
// ============================================================================

fn print_batch_report(batch: &BatchResult) {
    println!();
    println!(
        "=== {} {}===",
        batch.file_name,
        if batch.dry_run { "(dry run) " } else { "" }
    );
    println!(
        "Rows: {} total, {} processed, {} created, {} failed",
        batch.total_rows, batch.processed_rows, batch.successful_rows, batch.error_rows
    );

    for result in &batch.results {
        if result.success {
            println!("  [OK] row {}: {} -> {}", result.row_number, result.issue_key, result.issue_url);
        } else {
            println!("  [!!] row {}: {}", result.row_number, result.error_message);
        }
        for subtask in &result.subtask_results {
            if subtask.success {
                println!("       [OK] subtask {}: {}", subtask.issue_key, subtask.description);
            } else {
                println!(
                    "       [!!] subtask '{}': {}",
                    subtask.description, subtask.error_message
                );
            }
        }
    }

    for error in &batch.errors {
        println!("  {}", error);
    }
    for error in &batch.validation_errors {
        println!("  validation: {}", error);
    }

    if let Some(duration) = batch.duration {
        info!(
            file = %batch.file_name,
            millis = duration.as_millis() as u64,
            "Batch reported"
        );
    }
}

fn print_run_summary(results: &[BatchResult]) {
    let successful = results.iter().filter(|b| b.is_successful()).count();
    println!();
    println!(
        "{} of {} files imported successfully.",
        successful,
        results.len()
    );
}
