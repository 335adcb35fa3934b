//! Table layout math and slide XML builders

use crate::format::format_value;
use crate::record::RowRecord;
use crate::style::CellStyle;

/// 914400 EMU per inch
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Total table width across all columns
const TABLE_WIDTH_IN: f64 = 12.0;
/// Table anchor on the slide
const TABLE_LEFT_IN: f64 = 0.5;
const TABLE_TOP_IN: f64 = 1.5;
/// Height of one line of wrapped cell text
const BASE_ROW_HEIGHT_IN: f64 = 0.4;
/// Runaway rows are clamped here
const MAX_ROW_HEIGHT_IN: f64 = 1.5;
/// Rough wrapping estimate used for the height computation
const CHARS_PER_INCH: f64 = 12.0;

/// Header row appearance
const HEADER_FILL: &str = "003366";
const HEADER_FONT_COLOR: &str = "FFFFFF";
const HEADER_FONT_SIZE: u32 = 1200;

/// Data cell defaults
const DATA_FONT_SIZE: u32 = 1000;
const DEFAULT_FONT_COLOR: &str = "000000";
const DEFAULT_FILL_COLOR: &str = "FFFFFF";

/// Thin border, ~0.5pt
const BORDER_WIDTH_EMU: u32 = 12_700;
const BORDER_COLOR: &str = "000000";

pub fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Escape text for embedding in XML content
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Even split of the fixed table width, in inches per column
pub fn column_widths(column_count: usize) -> Vec<f64> {
    if column_count == 0 {
        return Vec::new();
    }
    vec![TABLE_WIDTH_IN / column_count as f64; column_count]
}

/// Estimated height of one data row: the longest formatted value in the row
/// is divided by its column's character capacity to count wrapped lines.
pub fn data_row_height(row: &RowRecord, widths: &[f64]) -> f64 {
    let mut max_lines = 1usize;
    for (idx, cell) in row.values().enumerate() {
        let Some(width) = widths.get(idx) else {
            continue;
        };
        let text = format_value(&cell.value);
        let chars_per_line = ((width * CHARS_PER_INCH) as usize).max(1);
        let line_count = text.chars().count() / chars_per_line + 1;
        max_lines = max_lines.max(line_count);
    }
    (BASE_ROW_HEIGHT_IN * max_lines as f64).min(MAX_ROW_HEIGHT_IN)
}

fn border_xml() -> String {
    let mut out = String::new();
    for side in ["a:lnL", "a:lnR", "a:lnT", "a:lnB"] {
        out.push_str(&format!(
            r#"<{side} w="{BORDER_WIDTH_EMU}"><a:solidFill><a:srgbClr val="{BORDER_COLOR}"/></a:solidFill></{side}>"#
        ));
    }
    out
}

/// One header cell: bold white, centered, dark-blue fill, thin borders
fn header_cell_xml(label: &str) -> String {
    format!(
        concat!(
            r#"<a:tc><a:txBody><a:bodyPr wrap="square"/><a:lstStyle/>"#,
            r#"<a:p><a:pPr algn="ctr"/>"#,
            r#"<a:r><a:rPr lang="en-US" sz="{sz}" b="1">"#,
            r#"<a:solidFill><a:srgbClr val="{font_color}"/></a:solidFill></a:rPr>"#,
            r#"<a:t>{text}</a:t></a:r></a:p></a:txBody>"#,
            r#"<a:tcPr>{borders}<a:solidFill><a:srgbClr val="{fill}"/></a:solidFill></a:tcPr></a:tc>"#
        ),
        sz = HEADER_FONT_SIZE,
        font_color = HEADER_FONT_COLOR,
        text = xml_escape(label),
        borders = border_xml(),
        fill = HEADER_FILL,
    )
}

/// One data cell: 10pt left-aligned text with the extracted style's bold,
/// italic, font color and fill. Colors were normalized at extraction, so
/// anything missing here simply renders with the defaults.
fn data_cell_xml(text: &str, style: Option<&CellStyle>) -> String {
    let bold = style.and_then(|s| s.bold).unwrap_or(false);
    let italic = style.and_then(|s| s.italic).unwrap_or(false);
    let font_color = style
        .and_then(|s| s.font_color.as_deref())
        .unwrap_or(DEFAULT_FONT_COLOR);
    let fill_color = style
        .and_then(|s| s.fill_color.as_deref())
        .unwrap_or(DEFAULT_FILL_COLOR);

    format!(
        concat!(
            r#"<a:tc><a:txBody><a:bodyPr wrap="square"/><a:lstStyle/>"#,
            r#"<a:p><a:pPr algn="l"/>"#,
            r#"<a:r><a:rPr lang="en-US" sz="{sz}" b="{b}" i="{i}">"#,
            r#"<a:solidFill><a:srgbClr val="{font_color}"/></a:solidFill></a:rPr>"#,
            r#"<a:t>{text}</a:t></a:r></a:p></a:txBody>"#,
            r#"<a:tcPr>{borders}<a:solidFill><a:srgbClr val="{fill}"/></a:solidFill></a:tcPr></a:tc>"#
        ),
        sz = DATA_FONT_SIZE,
        b = if bold { 1 } else { 0 },
        i = if italic { 1 } else { 0 },
        font_color = font_color,
        text = xml_escape(text),
        borders = border_xml(),
        fill = fill_color,
    )
}

/// The table graphic frame for one page of rows: a header row plus the
/// chunk's data rows, with per-row computed heights.
pub fn table_frame_xml(headers: &[String], rows: &[&RowRecord], shape_id: u32) -> String {
    let widths = column_widths(headers.len());

    let mut grid_cols = String::new();
    for width in &widths {
        grid_cols.push_str(&format!(r#"<a:gridCol w="{}"/>"#, emu(*width)));
    }

    let mut table_rows = String::new();
    let mut total_height_in = BASE_ROW_HEIGHT_IN;

    let mut header_row = String::new();
    for label in headers {
        header_row.push_str(&header_cell_xml(label));
    }
    table_rows.push_str(&format!(
        r#"<a:tr h="{}">{}</a:tr>"#,
        emu(BASE_ROW_HEIGHT_IN),
        header_row
    ));

    for row in rows {
        let height_in = data_row_height(row, &widths);
        total_height_in += height_in;

        let mut cells = String::new();
        for cell in row.values() {
            cells.push_str(&data_cell_xml(
                &format_value(&cell.value),
                cell.style.as_deref(),
            ));
        }
        table_rows.push_str(&format!(
            r#"<a:tr h="{}">{}</a:tr>"#,
            emu(height_in),
            cells
        ));
    }

    format!(
        concat!(
            r#"<p:graphicFrame><p:nvGraphicFramePr>"#,
            r#"<p:cNvPr id="{id}" name="Table {id}"/>"#,
            r#"<p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr>"#,
            r#"<p:nvPr/></p:nvGraphicFramePr>"#,
            r#"<p:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></p:xfrm>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">"#,
            r#"<a:tbl><a:tblPr firstRow="1" bandRow="1"/>"#,
            r#"<a:tblGrid>{grid}</a:tblGrid>{rows}</a:tbl>"#,
            r#"</a:graphicData></a:graphic></p:graphicFrame>"#
        ),
        id = shape_id,
        x = emu(TABLE_LEFT_IN),
        y = emu(TABLE_TOP_IN),
        cx = emu(TABLE_WIDTH_IN),
        cy = emu(total_height_in),
        grid = grid_cols,
        rows = table_rows,
    )
}

/// Title placeholder shape; geometry is inherited from the slide layout
fn title_shape_xml(title: &str) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/>"#,
            r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
            r#"<p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/>"#,
            r#"<p:txBody><a:bodyPr/><a:lstStyle/>"#,
            r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{title}</a:t></a:r></a:p>"#,
            r#"</p:txBody></p:sp>"#
        ),
        title = xml_escape(title),
    )
}

/// A complete generated slide: title placeholder plus the page's table
pub fn slide_xml(title: &str, headers: &[String], rows: &[&RowRecord]) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
            r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
            r#"<p:cSld><p:spTree>"#,
            r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
            r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
            r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
            "{title}{table}",
            r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
        ),
        title = title_shape_xml(title),
        table = table_frame_xml(headers, rows, 3),
    )
}
