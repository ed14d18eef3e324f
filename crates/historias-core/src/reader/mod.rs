//! Tabular readers
//!
//! Translates an input file into an ordered sequence of [`UserStory`].
//! Format dispatch is by lowercased extension: `.csv` goes to the
//! delimited backend, `.xlsx`/`.xls` to the spreadsheet backend. Both
//! share the column-name recognition and row filtering policy.

mod columns;
mod delimited;
mod spreadsheet;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::model::UserStory;

pub use columns::ColumnMap;

/// File extensions the reader understands, lowercased
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Read a file into stories, dispatching on the extension
pub fn read_file(path: &Path) -> Result<Vec<UserStory>> {
    match extension_of(path).as_str() {
        "csv" => delimited::read(path),
        "xlsx" | "xls" => spreadsheet::read(path),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

/// Preflight validation: existence, extension, parse, non-empty result,
/// and structural validity of every story. Returns the stories so that
/// callers can preview them.
pub fn validate_file(path: &Path) -> Result<Vec<UserStory>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    let ext = extension_of(path);
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::UnsupportedFormat(ext));
    }
    let stories = read_file(path)?;
    if stories.is_empty() {
        return Err(Error::NoValidStories);
    }
    for story in &stories {
        story.validate().map_err(|message| Error::RowValidation {
            row: story.row_number,
            message,
        })?;
    }
    Ok(stories)
}

/// Every regular file under `dir` with a supported extension, in walk
/// order.
pub fn pending_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| SUPPORTED_EXTENSIONS.contains(&extension_of(path).as_str()))
        .collect()
}

/// Move a fully processed file into the processed directory
///
/// Creates the directory if absent and renames the source to
/// `<processed-dir>/<basename>`. Failures are the caller's to downgrade;
/// the batch orchestrator records them as warnings.
pub fn move_to_processed(path: &Path, processed_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(processed_dir)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::FileNotFound(path.display().to_string()))?;
    let target = processed_dir.join(file_name);
    fs::rename(path, &target)?;
    debug!(from = %path.display(), to = %target.display(), "Moved processed file");
    Ok(target)
}

/// Split a raw subtasks cell into trimmed, non-empty fragments
///
/// Splits first on `;`, then each fragment on newlines. Order is
/// preserved; validity (length bounds) is evaluated separately by
/// [`UserStory::valid_subtasks`].
pub fn split_subtasks(raw: &str) -> Vec<String> {
    raw.split(';')
        .flat_map(|fragment| fragment.split('\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Build a story from one row's cells, or skip the row
///
/// Rows where title, description or acceptance criteria are empty after
/// trimming are silently dropped; spreadsheets commonly carry trailing
/// blank rows.
fn story_from_cells(columns: &ColumnMap, cells: &[String], row_number: usize) -> Option<UserStory> {
    let cell = |index: Option<usize>| -> &str {
        index
            .and_then(|i| cells.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    };

    let title = cell(columns.title);
    let description = cell(columns.description);
    let acceptance = cell(columns.acceptance);
    if title.is_empty() || description.is_empty() || acceptance.is_empty() {
        warn!(row = row_number, "Skipping row with empty required fields");
        return None;
    }

    Some(
        UserStory::new(title, description, acceptance, row_number)
            .with_subtasks(split_subtasks(cell(columns.subtasks)))
            .with_parent(cell(columns.parent)),
    )
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}
