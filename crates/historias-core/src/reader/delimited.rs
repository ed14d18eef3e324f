//! CSV backend
//!
//! Standard quoted-comma dialect; embedded newlines inside quoted cells
//! are allowed. Structural validation is deferred to the caller so that
//! the preview path can show partially valid rows.

use std::path::Path;

use csv::ReaderBuilder;

use super::columns::ColumnMap;
use super::story_from_cells;
use crate::error::Result;
use crate::model::UserStory;

pub(super) fn read(path: &Path) -> Result<Vec<UserStory>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns = ColumnMap::from_headers(reader.headers()?.iter());

    let mut stories = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // First data row is line 2; the header is row 1.
        let row_number = index + 2;
        let cells: Vec<String> = record.iter().map(String::from).collect();
        if let Some(story) = story_from_cells(&columns, &cells, row_number) {
            stories.push(story);
        }
    }
    Ok(stories)
}
