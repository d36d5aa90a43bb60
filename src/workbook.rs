use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::debug;

use crate::error::{Error, Result};

/// Column B holds the instruction, column C the content (0-based here).
const INSTRUCTION_COL: u32 = 1;
const CONTENT_COL: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub instruction: Option<String>,
    pub content: Option<String>,
}

#[cfg(test)]
impl Row {
    pub fn new(instruction: Option<&str>, content: Option<&str>) -> Self {
        Row {
            instruction: instruction.map(str::to_string),
            content: content.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

/// Read every sheet of a workbook, in storage order.
pub fn read_workbook(path: &Path) -> Result<Vec<Sheet>> {
    let mut workbook = open_workbook_auto(path).map_err(|source| Error::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|source| Error::Sheet {
                path: path.to_path_buf(),
                sheet: name.clone(),
                source,
            })?;
        let rows = rows_from_range(&range);
        debug!(sheet = %name, rows = rows.len(), "read sheet");
        sheets.push(Sheet { name, rows });
    }
    Ok(sheets)
}

/// Convert a used range into rows. Ranges don't necessarily start at A1, so
/// absolute columns are mapped back onto the range's own offsets.
fn rows_from_range(range: &Range<Data>) -> Vec<Row> {
    let (_, start_col) = range.start().unwrap_or((0, 0));
    let cell = |row: &[Data], abs_col: u32| -> Option<String> {
        let idx = abs_col.checked_sub(start_col)? as usize;
        row.get(idx).and_then(cell_to_string)
    };

    range
        .rows()
        .map(|row| Row {
            instruction: cell(row, INSTRUCTION_COL),
            content: cell(row, CONTENT_COL),
        })
        .collect()
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
