//! Spreadsheet backend (`.xlsx` / `.xls`)
//!
//! Reads the first sheet only. Unlike the CSV backend, every emitted
//! story is validated structurally during the read, so that malformed
//! workbooks fail with the offending row named.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use super::columns::ColumnMap;
use super::story_from_cells;
use crate::error::{Error, Result};
use crate::model::UserStory;

pub(super) fn read(path: &Path) -> Result<Vec<UserStory>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(Error::EmptySpreadsheet)??;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    stories_from_rows(&rows)
}

/// Convert raw sheet rows (header first) into validated stories
fn stories_from_rows(rows: &[Vec<String>]) -> Result<Vec<UserStory>> {
    if rows.len() < 2 {
        return Err(Error::EmptySpreadsheet);
    }
    let columns = ColumnMap::from_headers(rows[0].iter().map(String::as_str));

    let mut stories = Vec::new();
    for (index, cells) in rows[1..].iter().enumerate() {
        // The header is row 1, so the first data row is row 2.
        let row_number = index + 2;
        if let Some(story) = story_from_cells(&columns, cells, row_number) {
            story.validate().map_err(|message| Error::RowValidation {
                row: row_number,
                message,
            })?;
            stories.push(story);
        }
    }
    Ok(stories)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}
