//! Sheet-to-rows transformation

pub mod comments;
pub mod header;
pub mod merges;

use crate::config::PipelineConfig;
use crate::format::{is_date_format, serial_to_date};
use crate::reader::{Cell, CellValue, Sheet, Workbook};
use crate::record::{CellRecord, RowRecord, Scalar, SheetOutcome, SheetResult, SkipReason};
use crate::style::{CellStyle, StyleCache};
use rayon::prelude::*;
use std::sync::Arc;

/// Transform every worksheet into a tagged per-sheet outcome.
///
/// Sheets are independent, so the parallel mode fans them out over rayon;
/// results keep workbook order either way, keeping pagination deterministic.
pub fn extract_sheets(workbook: &Workbook, config: &PipelineConfig) -> Vec<SheetOutcome> {
    if config.parallel_sheets {
        workbook
            .sheets
            .par_iter()
            .map(|sheet| transform_sheet(sheet, &workbook.styles, config))
            .collect()
    } else {
        workbook
            .sheets
            .iter()
            .map(|sheet| transform_sheet(sheet, &workbook.styles, config))
            .collect()
    }
}

/// Run one worksheet through merge expansion, header location and row
/// assembly. Never fails: problems degrade to a skip or a stringified cell.
pub fn transform_sheet(
    sheet: &Sheet,
    styles: &[CellStyle],
    config: &PipelineConfig,
) -> SheetOutcome {
    if !sheet.visible {
        return SheetOutcome::Skipped {
            name: sheet.name.clone(),
            reason: SkipReason::Hidden,
        };
    }

    let mut sheet = sheet.clone();
    merges::expand_merges(&mut sheet);

    let Some(located) = header::locate_header(&sheet) else {
        return SheetOutcome::Skipped {
            name: sheet.name.clone(),
            reason: SkipReason::HeaderNotFound,
        };
    };

    // One interning cache per sheet transform; styles never leak across runs
    let mut cache = StyleCache::new();
    let mut rows = Vec::new();

    for row in located.row_index + 1..sheet.row_count() {
        let mut record = RowRecord::new();
        for (pos, &col) in located.keep_indices.iter().enumerate() {
            let label = &located.final_headers[pos];
            let (mut value, style) =
                extract_cell(sheet.get_cell(row, col as u32), styles, &mut cache);

            if label.eq_ignore_ascii_case(&config.comments_label)
                && let Scalar::Text(text) = &value
            {
                value = Scalar::Text(comments::condense_comments(text, config.max_comments));
            }

            record.insert(label.clone(), CellRecord::new(value, style));
        }
        if !record.is_blank() {
            rows.push(record);
        }
    }

    SheetOutcome::Included(SheetResult {
        name: sheet.name.clone(),
        headers: located.final_headers,
        rows,
    })
}

/// Pull value and interned style out of one cell.
///
/// Numeric cells whose format code renders dates are converted to calendar
/// dates here, with the time-of-day fraction dropped; a serial that cannot
/// map to a date stays numeric rather than failing the row.
fn extract_cell(
    cell: Option<&Cell>,
    styles: &[CellStyle],
    cache: &mut StyleCache,
) -> (Scalar, Option<Arc<CellStyle>>) {
    let Some(cell) = cell else {
        return (Scalar::Null, None);
    };

    let style = cell
        .style_idx
        .and_then(|idx| styles.get(idx))
        .filter(|raw| !raw.is_plain())
        .map(|raw| cache.intern(raw.clone()));

    let value = match &cell.value {
        CellValue::Empty => Scalar::Null,
        CellValue::Text(s) => Scalar::Text(s.clone()),
        CellValue::Boolean(b) => Scalar::Bool(*b),
        CellValue::Number(n) => {
            let date_formatted = style
                .as_deref()
                .and_then(|s| s.number_format.as_deref())
                .map(is_date_format)
                .unwrap_or(false);
            if date_formatted {
                match serial_to_date(*n) {
                    Some(date) => Scalar::Date(date),
                    None => Scalar::Number(*n),
                }
            } else {
                Scalar::Number(*n)
            }
        }
    };

    (value, style)
}
