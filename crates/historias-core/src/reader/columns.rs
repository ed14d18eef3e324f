//! Column-name recognition shared by both backends

/// Indices of the recognized columns within a header row
///
/// Header names are matched case-insensitively after trimming. Unknown
/// columns are ignored; a missing recognized column reads as the empty
/// string in every row. The first occurrence of a duplicated header
/// wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub title: Option<usize>,
    pub description: Option<usize>,
    pub acceptance: Option<usize>,
    pub subtasks: Option<usize>,
    pub parent: Option<usize>,
}

impl ColumnMap {
    /// Resolve the recognized columns from a header row
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = Self::default();
        for (index, raw) in headers.into_iter().enumerate() {
            let slot = match raw.trim().to_lowercase().as_str() {
                "titulo" => &mut map.title,
                "descripcion" => &mut map.description,
                "criterio_aceptacion" => &mut map.acceptance,
                "subtareas" => &mut map.subtasks,
                "parent" => &mut map.parent,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        map
    }
}
