//! Header-row location and column selection

use crate::reader::Sheet;

/// A row needs at least this many real labels to count as the header
const MIN_VALID_HEADERS: usize = 2;

/// Placeholder prefix spreadsheet tools emit for unnamed columns
const PLACEHOLDER_PREFIX: &str = "unnamed";

/// The located header row of one worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRow {
    /// 0-based row index of the header row
    pub row_index: u32,
    /// Trimmed display text of every column in the header row
    pub raw_headers: Vec<String>,
    /// Column positions whose label is real (non-blank, non-placeholder)
    pub keep_indices: Vec<usize>,
    /// Labels at `keep_indices`, in original column order
    pub final_headers: Vec<String>,
}

fn is_valid_header(label: &str) -> bool {
    !label.is_empty() && !label.to_lowercase().starts_with(PLACEHOLDER_PREFIX)
}

/// Scan the sheet top-down for the first row that looks like real column
/// headers. Locating the row also decides which columns survive: blank and
/// placeholder-labelled columns are dropped in one step.
pub fn locate_header(sheet: &Sheet) -> Option<HeaderRow> {
    let rows = sheet.row_count();
    let cols = sheet.col_count();

    for row in 0..rows {
        let raw_headers: Vec<String> = (0..cols)
            .map(|col| sheet.display_at(row, col).trim().to_string())
            .collect();

        let valid = raw_headers.iter().filter(|h| is_valid_header(h)).count();
        if valid < MIN_VALID_HEADERS {
            continue;
        }

        let keep_indices: Vec<usize> = raw_headers
            .iter()
            .enumerate()
            .filter(|(_, h)| is_valid_header(h))
            .map(|(idx, _)| idx)
            .collect();
        let final_headers = keep_indices
            .iter()
            .map(|&idx| raw_headers[idx].clone())
            .collect();

        return Some(HeaderRow {
            row_index: row,
            raw_headers,
            keep_indices,
            final_headers,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{Cell, CellValue};

    fn sheet_with_rows(rows: &[Vec<&str>]) -> Sheet {
        let mut sheet = Sheet::new("S".to_string());
        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, text) in row.iter().enumerate() {
                if text.is_empty() {
                    continue;
                }
                sheet.cells.insert(
                    (row_idx as u32, col_idx as u32),
                    Cell {
                        row: row_idx as u32,
                        col: col_idx as u32,
                        value: CellValue::Text(text.to_string()),
                        style_idx: None,
                    },
                );
            }
        }
        sheet
    }

    #[test]
    fn test_header_on_first_row() {
        let sheet = sheet_with_rows(&[vec!["Name", "Owner"], vec!["api", "infra"]]);
        let header = locate_header(&sheet).unwrap();
        assert_eq!(header.row_index, 0);
        assert_eq!(header.final_headers, vec!["Name", "Owner"]);
        assert_eq!(header.keep_indices, vec![0, 1]);
    }

    #[test]
    fn test_skips_banner_rows() {
        let sheet = sheet_with_rows(&[
            vec!["Quarterly report"],
            vec![""],
            vec!["", "Name", "Owner", "Comments"],
        ]);
        let header = locate_header(&sheet).unwrap();
        assert_eq!(header.row_index, 2);
        // The blank first column is dropped
        assert_eq!(header.keep_indices, vec![1, 2, 3]);
        assert_eq!(header.final_headers, vec!["Name", "Owner", "Comments"]);
    }

    #[test]
    fn test_unnamed_placeholders_do_not_count() {
        let sheet = sheet_with_rows(&[
            vec!["Unnamed: 0", "Unnamed: 1", "Real"],
            vec!["Name", "Owner", "State"],
        ]);
        let header = locate_header(&sheet).unwrap();
        // Row 0 has only one valid label, so row 1 wins
        assert_eq!(header.row_index, 1);
        assert_eq!(header.final_headers, vec!["Name", "Owner", "State"]);
    }

    #[test]
    fn test_no_header_found() {
        let sheet = sheet_with_rows(&[vec!["only-one"], vec![""]]);
        assert!(locate_header(&sheet).is_none());
    }

    #[test]
    fn test_locate_is_idempotent() {
        let sheet = sheet_with_rows(&[vec![""], vec!["A", "B", "C"]]);
        let first = locate_header(&sheet).unwrap();
        let second = locate_header(&sheet).unwrap();
        assert_eq!(first, second);
    }
}
