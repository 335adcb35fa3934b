//! Streaming XLSX parser: workbook structure, shared strings, cell formats

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufReader;
use zip::ZipArchive;

use super::{Cell, CellValue, Sheet, Workbook};
use crate::style::{CellStyle, normalize_hex_color};

/// Parse a cell reference like "A1" into (row, col) as 0-based indices
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col = 0u32;
    let mut row_str = String::new();

    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        } else if ch.is_ascii_digit() {
            row_str.push(ch);
        }
    }

    if row_str.is_empty() {
        return None;
    }
    let row = row_str.parse::<u32>().ok()?;

    Some((row.saturating_sub(1), col.saturating_sub(1)))
}

/// Parse a range like "A1:B2" into (start_row, start_col, end_row, end_col)
pub fn parse_cell_range(range: &str) -> Option<(u32, u32, u32, u32)> {
    let (start, end) = range.split_once(':')?;
    let (start_row, start_col) = parse_cell_ref(start)?;
    let (end_row, end_col) = parse_cell_ref(end)?;
    Some((start_row, start_col, end_row, end_col))
}

fn read_text_node<R: std::io::BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(e.unescape()?.as_ref()),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

/// Reader over an open XLSX archive
pub struct XlsxReader<'a, R: std::io::Read + std::io::Seek> {
    archive: &'a mut ZipArchive<R>,
    shared_strings: Vec<String>,
    styles: Vec<CellStyle>,
}

impl<'a, R: std::io::Read + std::io::Seek> XlsxReader<'a, R> {
    pub fn new(archive: &'a mut ZipArchive<R>) -> Result<Self> {
        let shared_strings = extract_shared_strings(archive).unwrap_or_default();
        let styles = parse_style_table(archive).unwrap_or_default();
        Ok(Self {
            archive,
            shared_strings,
            styles,
        })
    }

    /// Read every worksheet and hand back the assembled workbook
    pub fn into_workbook(mut self) -> Result<Workbook> {
        let sheets = self.read_sheets()?;
        Ok(Workbook {
            sheets,
            styles: self.styles,
        })
    }

    fn read_sheets(&mut self) -> Result<Vec<Sheet>> {
        let entries = self.sheet_entries()?;
        let rels = self.workbook_rels()?;

        let mut sheets = Vec::new();
        for entry in entries {
            let Some(target) = rels.get(&entry.rid) else {
                continue;
            };
            let path = if target.starts_with("worksheets/") {
                format!("xl/{}", target)
            } else {
                target.trim_start_matches('/').to_string()
            };

            let mut sheet = Sheet::new(entry.name.clone());
            sheet.visible = entry.visible;

            let (cells, merged_cells, dim_range) = self
                .parse_sheet_xml(&path)
                .with_context(|| format!("Failed to parse sheet '{}'", entry.name))?;
            sheet.cells = cells;
            sheet.merged_cells = merged_cells;
            sheet.used_range = dim_range;

            sheets.push(sheet);
        }
        Ok(sheets)
    }

    /// Sheet names, relationship ids, and visibility from xl/workbook.xml
    fn sheet_entries(&mut self) -> Result<Vec<SheetEntry>> {
        let workbook_xml = self
            .archive
            .by_name("xl/workbook.xml")
            .context("Failed to find xl/workbook.xml")?;
        let mut reader = Reader::from_reader(BufReader::new(workbook_xml));
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => {
                    if e.name().as_ref() == b"sheet" {
                        let mut name = String::new();
                        let mut rid = String::new();
                        let mut state = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"name" => name = attr.unescape_value()?.to_string(),
                                b"r:id" => rid = attr.unescape_value()?.to_string(),
                                b"state" => state = attr.unescape_value()?.to_string(),
                                _ => {}
                            }
                        }
                        if !name.is_empty() && !rid.is_empty() {
                            entries.push(SheetEntry {
                                name,
                                rid,
                                visible: state != "hidden" && state != "veryHidden",
                            });
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(entries)
    }

    /// Relationship id -> target map from xl/_rels/workbook.xml.rels
    fn workbook_rels(&mut self) -> Result<HashMap<String, String>> {
        let rels_xml = self
            .archive
            .by_name("xl/_rels/workbook.xml.rels")
            .context("Failed to find xl/_rels/workbook.xml.rels")?;
        let mut reader = Reader::from_reader(BufReader::new(rels_xml));
        reader.config_mut().trim_text(true);

        let mut rels = HashMap::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                    let mut id = String::new();
                    let mut target = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => id = attr.unescape_value()?.to_string(),
                            b"Target" => target = attr.unescape_value()?.to_string(),
                            _ => {}
                        }
                    }
                    if !id.is_empty() {
                        rels.insert(id, target);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(rels)
    }

    fn parse_sheet_xml(
        &mut self,
        path: &str,
    ) -> Result<(
        HashMap<(u32, u32), Cell>,
        Vec<(u32, u32, u32, u32)>,
        Option<(u32, u32)>,
    )> {
        let mut cells = HashMap::new();
        let mut merged_cells = Vec::new();
        let mut dim_range = None;

        let sheet_xml = self.archive.by_name(path)?;
        let mut reader = Reader::from_reader(BufReader::new(sheet_xml));
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut current_row = 0u32;
        let mut current_col = 0u32;

        loop {
            let event = reader.read_event_into(&mut buf)?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                    b"dimension" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"ref" {
                                let ref_str = attr.unescape_value()?;
                                if let Some((_, _, end_row, end_col)) = parse_cell_range(&ref_str) {
                                    dim_range = Some((end_row + 1, end_col + 1));
                                } else if let Some((end_row, end_col)) = parse_cell_ref(&ref_str) {
                                    dim_range = Some((end_row + 1, end_col + 1));
                                }
                            }
                        }
                    }
                    b"row" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"r" {
                                current_row =
                                    attr.unescape_value()?.parse::<u32>()?.saturating_sub(1);
                            }
                        }
                        current_col = 0;
                    }
                    b"c" => {
                        let mut r_attr = String::new();
                        let mut s_attr = None;
                        let mut t_attr = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => r_attr = attr.unescape_value()?.to_string(),
                                b"s" => s_attr = attr.unescape_value()?.parse::<usize>().ok(),
                                b"t" => t_attr = attr.unescape_value()?.to_string(),
                                _ => {}
                            }
                        }

                        let (row, col) = if !r_attr.is_empty() {
                            let (r, c) =
                                parse_cell_ref(&r_attr).unwrap_or((current_row, current_col));
                            current_col = c + 1;
                            (r, c)
                        } else {
                            let c = current_col;
                            current_col += 1;
                            (current_row, c)
                        };

                        let value = if matches!(event, Event::Start(_)) {
                            let is_text_fmt = s_attr
                                .and_then(|idx| self.styles.get(idx))
                                .and_then(|st| st.number_format.as_deref())
                                == Some("@");
                            parse_cell_contents(
                                &mut reader,
                                &t_attr,
                                &self.shared_strings,
                                is_text_fmt,
                            )?
                        } else {
                            CellValue::Empty
                        };

                        cells.insert(
                            (row, col),
                            Cell {
                                row,
                                col,
                                value,
                                style_idx: s_attr,
                            },
                        );
                    }
                    b"mergeCell" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"ref" {
                                let ref_str = attr.unescape_value()?;
                                if let Some(range) = parse_cell_range(&ref_str) {
                                    merged_cells.push(range);
                                }
                            }
                        }
                    }
                    _ => {}
                },
                Event::End(e) => {
                    if e.name().as_ref() == b"worksheet" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok((cells, merged_cells, dim_range))
    }
}

/// Read the body of one `<c>` element up to its end tag
fn parse_cell_contents<B: std::io::BufRead>(
    reader: &mut Reader<B>,
    t_attr: &str,
    shared_strings: &[String],
    is_text_fmt: bool,
) -> Result<CellValue> {
    let mut value = CellValue::Empty;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"v" => {
                    let v_text = if matches!(event, Event::Start(_)) {
                        read_text_node(reader)?
                    } else {
                        String::new()
                    };
                    value = match t_attr {
                        "s" => {
                            let idx = v_text.parse::<usize>().unwrap_or(0);
                            CellValue::Text(shared_strings.get(idx).cloned().unwrap_or_default())
                        }
                        "b" => CellValue::Boolean(v_text == "1"),
                        // Cached errors are carried as their display text;
                        // downstream treats them like any other string.
                        "e" | "str" => CellValue::Text(v_text),
                        _ => {
                            if is_text_fmt {
                                CellValue::Text(v_text)
                            } else if let Ok(n) = v_text.parse::<f64>() {
                                CellValue::Number(n)
                            } else {
                                CellValue::Text(v_text)
                            }
                        }
                    };
                }
                b"is" => {
                    if matches!(event, Event::Start(_)) {
                        let mut is_text = String::new();
                        let mut is_buf = Vec::new();
                        loop {
                            match reader.read_event_into(&mut is_buf)? {
                                Event::Start(ref ee) if ee.name().as_ref() == b"t" => {
                                    is_text.push_str(&read_text_node(reader)?);
                                }
                                Event::End(ref ee) if ee.name().as_ref() == b"is" => break,
                                Event::Eof => break,
                                _ => {}
                            }
                            is_buf.clear();
                        }
                        value = CellValue::Text(is_text);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(value)
}

struct SheetEntry {
    name: String,
    rid: String,
    visible: bool,
}

pub fn extract_shared_strings(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let ss_xml = match archive.by_name("xl/sharedStrings.xml") {
        Ok(file) => file,
        Err(_) => return Ok(strings),
    };

    let mut reader = Reader::from_reader(BufReader::new(ss_xml));
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current_string = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"t" => {
                current_string.push_str(&read_text_node(&mut reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"si" => {
                strings.push(current_string.clone());
                current_string.clear();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Built-in number formats that matter for date detection and text cells
fn builtin_num_fmts() -> HashMap<u32, String> {
    let table: &[(u32, &str)] = &[
        (0, "General"),
        (1, "0"),
        (2, "0.00"),
        (3, "#,##0"),
        (4, "#,##0.00"),
        (9, "0%"),
        (10, "0.00%"),
        (11, "0.00E+00"),
        (14, "mm-dd-yy"),
        (15, "d-mmm-yy"),
        (16, "d-mmm"),
        (17, "mmm-yy"),
        (18, "h:mm AM/PM"),
        (19, "h:mm:ss AM/PM"),
        (20, "h:mm"),
        (21, "h:mm:ss"),
        (22, "m/d/yy h:mm"),
        (45, "mm:ss"),
        (46, "[h]:mm:ss"),
        (47, "mmss.0"),
        (49, "@"),
    ];
    table
        .iter()
        .map(|&(id, code)| (id, code.to_string()))
        .collect()
}

#[derive(Debug, Clone, Default)]
struct FontDef {
    bold: Option<bool>,
    italic: Option<bool>,
    underline: Option<bool>,
    color: Option<String>,
}

/// Parse xl/styles.xml into one [`CellStyle`] per `cellXfs` entry.
///
/// Fonts, fills and custom number formats are collected first; each `xf`
/// then resolves its ids against those tables. Theme and indexed colors
/// are not resolvable from styles.xml alone and come back as `None`.
pub fn parse_style_table(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<Vec<CellStyle>> {
    let styles_xml = match archive.by_name("xl/styles.xml") {
        Ok(file) => file,
        Err(_) => return Ok(Vec::new()),
    };

    let mut reader = Reader::from_reader(BufReader::new(styles_xml));
    reader.config_mut().trim_text(true);

    let mut num_fmts = builtin_num_fmts();
    let mut fonts: Vec<FontDef> = Vec::new();
    let mut fills: Vec<Option<String>> = Vec::new();
    let mut xfs: Vec<CellStyle> = Vec::new();

    let mut in_fonts = false;
    let mut in_fills = false;
    let mut in_cell_xfs = false;
    let mut current_font: Option<FontDef> = None;
    let mut current_fill_color: Option<String> = None;
    let mut current_fill_pattern = String::new();
    let mut in_fill_element = false;

    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"fonts" => in_fonts = true,
                    b"fills" => in_fills = true,
                    b"cellXfs" => in_cell_xfs = true,
                    b"font" if in_fonts => {
                        current_font = Some(FontDef::default());
                        if is_empty {
                            fonts.push(current_font.take().unwrap_or_default());
                        }
                    }
                    b"b" if in_fonts => {
                        if let Some(font) = current_font.as_mut() {
                            font.bold = Some(flag_value(e)?);
                        }
                    }
                    b"i" if in_fonts => {
                        if let Some(font) = current_font.as_mut() {
                            font.italic = Some(flag_value(e)?);
                        }
                    }
                    b"u" if in_fonts => {
                        if let Some(font) = current_font.as_mut() {
                            let mut val = String::new();
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"val" {
                                    val = attr.unescape_value()?.to_string();
                                }
                            }
                            font.underline = Some(val != "none");
                        }
                    }
                    b"color" if in_fonts && current_font.is_some() => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"rgb"
                                && let Some(font) = current_font.as_mut()
                            {
                                font.color = normalize_hex_color(&attr.unescape_value()?);
                            }
                        }
                    }
                    b"fill" if in_fills => {
                        in_fill_element = true;
                        current_fill_color = None;
                        current_fill_pattern.clear();
                        if is_empty {
                            fills.push(None);
                            in_fill_element = false;
                        }
                    }
                    b"patternFill" if in_fill_element => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"patternType" {
                                current_fill_pattern = attr.unescape_value()?.to_string();
                            }
                        }
                    }
                    b"fgColor" if in_fill_element => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"rgb" {
                                current_fill_color =
                                    normalize_hex_color(&attr.unescape_value()?);
                            }
                        }
                    }
                    b"numFmt" => {
                        let mut id = 0u32;
                        let mut code = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"numFmtId" => {
                                    id = attr.unescape_value()?.parse::<u32>().unwrap_or(0);
                                }
                                b"formatCode" => {
                                    code =
                                        attr.unescape_value().unwrap_or_default().replace('\\', "");
                                }
                                _ => {}
                            }
                        }
                        if !code.is_empty() {
                            num_fmts.insert(id, code);
                        }
                    }
                    b"xf" if in_cell_xfs => {
                        let mut num_fmt_id = 0u32;
                        let mut font_id = 0usize;
                        let mut fill_id = 0usize;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"numFmtId" => {
                                    num_fmt_id =
                                        attr.unescape_value()?.parse::<u32>().unwrap_or(0);
                                }
                                b"fontId" => {
                                    font_id = attr.unescape_value()?.parse::<usize>().unwrap_or(0);
                                }
                                b"fillId" => {
                                    fill_id = attr.unescape_value()?.parse::<usize>().unwrap_or(0);
                                }
                                _ => {}
                            }
                        }
                        let font = fonts.get(font_id).cloned().unwrap_or_default();
                        let style = CellStyle {
                            bold: font.bold,
                            italic: font.italic,
                            underline: font.underline,
                            font_color: font.color,
                            fill_color: fills.get(fill_id).cloned().flatten(),
                            number_format: num_fmts.get(&num_fmt_id).cloned(),
                            align_h: None,
                            align_v: None,
                        };
                        xfs.push(style);
                    }
                    b"alignment" if in_cell_xfs => {
                        if let Some(style) = xfs.last_mut() {
                            for attr in e.attributes().flatten() {
                                match attr.key.as_ref() {
                                    b"horizontal" => {
                                        style.align_h =
                                            attr.unescape_value()?.parse().ok();
                                    }
                                    b"vertical" => {
                                        style.align_v =
                                            attr.unescape_value()?.parse().ok();
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"fonts" => in_fonts = false,
                b"fills" => in_fills = false,
                b"cellXfs" => in_cell_xfs = false,
                b"font" if in_fonts => {
                    fonts.push(current_font.take().unwrap_or_default());
                }
                b"fill" if in_fills => {
                    let color = if current_fill_pattern == "none" {
                        None
                    } else {
                        current_fill_color.take()
                    };
                    fills.push(color);
                    in_fill_element = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xfs)
}

/// Boolean toggle element: `<b/>` means on, `<b val="0"/>` means off
fn flag_value(e: &quick_xml::events::BytesStart<'_>) -> Result<bool> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"val" {
            let val = attr.unescape_value()?;
            return Ok(val != "0" && val != "false");
        }
    }
    Ok(true)
}
