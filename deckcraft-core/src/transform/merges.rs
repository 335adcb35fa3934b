//! Merged-range expansion

use crate::reader::{Cell, CellValue, Sheet};

/// Flatten every merged range in place: the top-left value is copied to all
/// covered coordinates and the range list is dissolved, so row iteration
/// downstream never has to know spans existed.
///
/// Ranges are assumed non-overlapping, so processing order does not matter.
pub fn expand_merges(sheet: &mut Sheet) {
    let ranges = std::mem::take(&mut sheet.merged_cells);
    for (start_row, start_col, end_row, end_col) in ranges {
        let (value, style_idx) = sheet
            .cells
            .get(&(start_row, start_col))
            .map(|cell| (cell.value.clone(), cell.style_idx))
            .unwrap_or((CellValue::Empty, None));

        for row in start_row..=end_row {
            for col in start_col..=end_col {
                match sheet.cells.get_mut(&(row, col)) {
                    // Covered cells keep their own formatting, only the
                    // visible value propagates.
                    Some(cell) => cell.value = value.clone(),
                    None => {
                        sheet.cells.insert(
                            (row, col),
                            Cell {
                                row,
                                col,
                                value: value.clone(),
                                style_idx,
                            },
                        );
                    }
                }
            }
        }
    }
}
