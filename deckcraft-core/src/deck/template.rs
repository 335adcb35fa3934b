//! Template deck loading and first-slide text patching

use anyhow::{Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Font forced onto patched title/date runs
const FORCED_FONT: &str = "Arial";

/// An opened template presentation: every package part in archive order,
/// plus the parsed slide ordering from presentation.xml.
#[derive(Debug)]
pub struct TemplateDeck {
    parts: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
    /// (slide id, relationship id) pairs in presentation order
    pub slide_order: Vec<(u32, String)>,
    /// Relationship id -> target, from ppt/_rels/presentation.xml.rels
    pub rels: HashMap<String, String>,
}

impl TemplateDeck {
    /// Load a template from its byte stream
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).context("Failed to open template archive")?;

        let mut parts = Vec::with_capacity(archive.len());
        let mut index = HashMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            index.insert(name.clone(), parts.len());
            parts.push((name, data));
        }

        let presentation = index
            .get("ppt/presentation.xml")
            .map(|&i| parts[i].1.clone())
            .context("Template has no ppt/presentation.xml")?;
        let slide_order = parse_slide_order(&presentation)?;

        let rels = match index.get("ppt/_rels/presentation.xml.rels") {
            Some(&i) => parse_relationships(&parts[i].1)?,
            None => HashMap::new(),
        };

        Ok(Self {
            parts,
            index,
            slide_order,
            rels,
        })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.index.get(name).map(|&i| self.parts[i].1.as_slice())
    }

    /// Replace an existing part or append a new one
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.index.get(name) {
            Some(&i) => self.parts[i].1 = data,
            None => {
                self.index.insert(name.to_string(), self.parts.len());
                self.parts.push((name.to_string(), data));
            }
        }
    }

    /// Package path of the presentation's first slide
    pub fn first_slide_part(&self) -> Option<String> {
        let (_, rid) = self.slide_order.first()?;
        let target = self.rels.get(rid)?;
        Some(resolve_ppt_target(target))
    }

    pub fn slide_count(&self) -> usize {
        self.slide_order.len()
    }

    /// Highest N across existing ppt/slides/slideN.xml parts
    pub fn max_slide_number(&self) -> u32 {
        self.parts
            .iter()
            .filter_map(|(name, _)| part_number(name, "ppt/slides/slide"))
            .max()
            .unwrap_or(0)
    }

    /// Highest numeric suffix across rIdN relationship ids
    pub fn max_rel_number(&self) -> u32 {
        self.rels
            .keys()
            .filter_map(|rid| rid.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
    }

    /// Highest slide id in the sldIdLst (PowerPoint starts these at 256)
    pub fn max_slide_id(&self) -> u32 {
        self.slide_order
            .iter()
            .map(|&(id, _)| id)
            .max()
            .unwrap_or(255)
    }

    /// Layout for generated slides: the template's second layout by
    /// position, or the first when there is only one. Returned relative to
    /// the slides directory.
    pub fn new_slide_layout_target(&self) -> Option<String> {
        let mut numbers: Vec<u32> = self
            .parts
            .iter()
            .filter_map(|(name, _)| part_number(name, "ppt/slideLayouts/slideLayout"))
            .collect();
        numbers.sort_unstable();
        let chosen = *numbers.get(1).or_else(|| numbers.first())?;
        Some(format!("../slideLayouts/slideLayout{}.xml", chosen))
    }

    /// Assemble the final package; parts keep archive order, appended parts
    /// land at the end.
    pub fn save(&self) -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            std::io::Write::write_all(&mut writer, data)?;
        }
        Ok(writer.finish()?.into_inner())
    }
}

/// "slides/slide1.xml" and "/ppt/slides/slide1.xml" both resolve to the
/// package path "ppt/slides/slide1.xml"
fn resolve_ppt_target(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else {
        format!("ppt/{}", target)
    }
}

fn part_number(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.strip_suffix(".xml")?.parse().ok()
}

/// Ordered (id, rId) pairs from the presentation's sldIdLst
fn parse_slide_order(xml: &[u8]) -> Result<Vec<(u32, String)>> {
    let text = std::str::from_utf8(xml).context("presentation.xml is not UTF-8")?;
    let mut reader = Reader::from_str(text);
    let mut order = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                let mut id = 0u32;
                let mut rid = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"id" => id = attr.unescape_value()?.parse().unwrap_or(0),
                        b"r:id" => rid = attr.unescape_value()?.to_string(),
                        _ => {}
                    }
                }
                if !rid.is_empty() {
                    order.push((id, rid));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(order)
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let text = std::str::from_utf8(xml).context("relationships part is not UTF-8")?;
    let mut reader = Reader::from_str(text);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
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
    }
    Ok(rels)
}

/// Replace the first paragraph of the named placeholder shape with `text`,
/// carrying the original run's formatting forward. `None` when the slide
/// has no shape with that name.
pub fn patch_title(slide_xml: &str, shape_name: &str, text: &str) -> Result<Option<String>> {
    match find_title_paragraph(slide_xml, shape_name)? {
        Some(idx) => rewrite_paragraph(slide_xml, idx, text).map(Some),
        None => Ok(None),
    }
}

/// Replace the first paragraph containing `Date:` anywhere on the slide.
/// `None` when no paragraph carries the marker.
pub fn patch_date(slide_xml: &str, text: &str) -> Result<Option<String>> {
    match find_date_paragraph(slide_xml)? {
        Some(idx) => rewrite_paragraph(slide_xml, idx, text).map(Some),
        None => Ok(None),
    }
}

/// Ordinal (counting every `a:p` start) of the first paragraph inside the
/// shape whose cNvPr name matches
fn find_title_paragraph(xml: &str, shape_name: &str) -> Result<Option<usize>> {
    let mut reader = Reader::from_str(xml);
    let mut para_idx = 0usize;
    let mut sp_depth = 0usize;
    let mut in_target_sp = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"sp" if matches!(event, Event::Start(_)) => sp_depth += 1,
                    b"cNvPr" if sp_depth > 0 && !in_target_sp => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"name"
                                && attr.unescape_value()? == shape_name
                            {
                                in_target_sp = true;
                            }
                        }
                    }
                    b"p" => {
                        if in_target_sp {
                            return Ok(Some(para_idx));
                        }
                        para_idx += 1;
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"sp" {
                    sp_depth = sp_depth.saturating_sub(1);
                    if sp_depth == 0 {
                        in_target_sp = false;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(None)
}

/// Ordinal of the first paragraph whose accumulated text contains "Date:"
fn find_date_paragraph(xml: &str) -> Result<Option<usize>> {
    let mut reader = Reader::from_str(xml);
    let mut para_idx = 0usize;
    let mut current: Option<(usize, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"p" => {
                current = Some((para_idx, String::new()));
                para_idx += 1;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"p" => {
                para_idx += 1;
            }
            Event::Text(t) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"p" => {
                if let Some((idx, text)) = current.take()
                    && text.contains("Date:")
                {
                    return Ok(Some(idx));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(None)
}

/// Formatting captured from the original first run of a patched paragraph
#[derive(Default)]
struct CapturedRunProps {
    attrs: Vec<(String, String)>,
    fill_events: Vec<Event<'static>>,
}

/// Rewrite paragraph number `target` (counting every `a:p` start) so it
/// holds a single run with `new_text`. The first original run's properties
/// (size, italic, underline, color fill) are copied onto the new run, bold
/// and the font family are forced; any further runs in the paragraph are
/// dropped.
fn rewrite_paragraph(xml: &str, target: usize, new_text: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut para_idx = 0usize;
    let mut in_target = false;
    let mut run_written = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) if e.local_name().as_ref() == b"p" => {
                if para_idx == target {
                    in_target = true;
                    run_written = false;
                }
                para_idx += 1;
                writer.write_event(event.clone())?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"p" => {
                para_idx += 1;
                writer.write_event(event.clone())?;
            }
            Event::Start(ref e) if in_target && !run_written && e.local_name().as_ref() == b"r" => {
                let props = capture_run_props(&mut reader)?;
                write_patched_run(&mut writer, &props, new_text)?;
                run_written = true;
            }
            Event::End(ref e) if in_target && e.local_name().as_ref() == b"p" => {
                if !run_written {
                    write_patched_run(&mut writer, &CapturedRunProps::default(), new_text)?;
                }
                in_target = false;
                writer.write_event(event.clone())?;
            }
            Event::Eof => break,
            other => {
                // After the replacement run, remaining content of the
                // target paragraph is dropped.
                if !(in_target && run_written) {
                    writer.write_event(other)?;
                }
            }
        }
    }

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).context("patched slide is not UTF-8")
}

/// Consume one `a:r` subtree (the Start event has already been read),
/// capturing its rPr attributes and any solidFill child.
fn capture_run_props<'a>(reader: &mut Reader<&'a [u8]>) -> Result<CapturedRunProps> {
    let mut props = CapturedRunProps::default();
    let mut depth = 1usize;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) => {
                depth += 1;
                if e.local_name().as_ref() == b"rPr" {
                    props.attrs = run_prop_attrs(e)?;
                    capture_fill(reader, &mut props)?;
                    depth -= 1;
                }
            }
            Event::Empty(ref e) => {
                if e.local_name().as_ref() == b"rPr" {
                    props.attrs = run_prop_attrs(e)?;
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(props)
}

fn run_prop_attrs(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        // Bold is forced on the replacement run
        if key == "b" {
            continue;
        }
        attrs.push((key, attr.unescape_value()?.into_owned()));
    }
    Ok(attrs)
}

/// Consume the remainder of an `a:rPr` subtree, keeping the solidFill
/// branch (the run's color) and discarding the rest.
fn capture_fill(reader: &mut Reader<&[u8]>, props: &mut CapturedRunProps) -> Result<()> {
    let mut depth = 1usize;
    let mut fill_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) => {
                depth += 1;
                if fill_depth > 0 {
                    fill_depth += 1;
                    props.fill_events.push(event.clone().into_owned());
                } else if e.local_name().as_ref() == b"solidFill" {
                    fill_depth = 1;
                    props.fill_events.push(event.clone().into_owned());
                }
            }
            Event::Empty(_) => {
                if fill_depth > 0 {
                    props.fill_events.push(event.clone().into_owned());
                }
            }
            Event::End(_) => {
                if fill_depth > 0 {
                    props.fill_events.push(event.clone().into_owned());
                    fill_depth -= 1;
                }
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn write_patched_run<W: std::io::Write>(
    writer: &mut Writer<W>,
    props: &CapturedRunProps,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("a:r")))?;

    let mut rpr = BytesStart::new("a:rPr");
    if props.attrs.is_empty() {
        rpr.push_attribute(("lang", "en-US"));
    }
    for (key, value) in &props.attrs {
        rpr.push_attribute((key.as_str(), value.as_str()));
    }
    rpr.push_attribute(("b", "1"));
    writer.write_event(Event::Start(rpr))?;

    for event in &props.fill_events {
        writer.write_event(event.clone())?;
    }

    let mut latin = BytesStart::new("a:latin");
    latin.push_attribute(("typeface", FORCED_FONT));
    writer.write_event(Event::Empty(latin))?;
    writer.write_event(Event::End(BytesEnd::new("a:rPr")))?;

    writer.write_event(Event::Start(BytesStart::new("a:t")))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("a:t")))?;
    writer.write_event(Event::End(BytesEnd::new("a:r")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = concat!(
        r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
        r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
        r#"<p:cSld><p:spTree>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
        r#"<p:txBody><a:bodyPr/>"#,
        r#"<a:p><a:r><a:rPr lang="en-US" sz="3200" i="1">"#,
        r#"<a:solidFill><a:srgbClr val="112233"/></a:solidFill>"#,
        r#"<a:latin typeface="Georgia"/></a:rPr>"#,
        r#"<a:t>Placeholder title</a:t></a:r>"#,
        r#"<a:r><a:rPr lang="en-US"/><a:t> extra</a:t></a:r></a:p>"#,
        r#"</p:txBody></p:sp>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="TextBox 2"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
        r#"<p:txBody><a:bodyPr/>"#,
        r#"<a:p><a:r><a:rPr lang="en-US" sz="1400"/><a:t>Date: tbd</a:t></a:r></a:p>"#,
        r#"</p:txBody></p:sp>"#,
        r#"</p:spTree></p:cSld></p:sld>"#
    );

    #[test]
    fn test_patch_title_replaces_text_and_preserves_size() {
        let patched = patch_title(SLIDE, "Title 1", "Project Phoenix")
            .unwrap()
            .expect("title shape exists");

        assert!(patched.contains("Project Phoenix"));
        assert!(!patched.contains("Placeholder title"));
        // Original size and italic survive, bold and Arial are forced
        assert!(patched.contains(r#"sz="3200""#));
        assert!(patched.contains(r#"i="1""#));
        assert!(patched.contains(r#"b="1""#));
        assert!(patched.contains(r#"typeface="Arial""#));
        assert!(!patched.contains("Georgia"));
        // The run color came along
        assert!(patched.contains("112233"));
        // The second run of the paragraph was dropped
        assert!(!patched.contains(" extra"));
        // The date paragraph is untouched
        assert!(patched.contains("Date: tbd"));
    }

    #[test]
    fn test_patch_title_missing_shape_is_noop() {
        assert!(patch_title(SLIDE, "Banner 7", "x").unwrap().is_none());
    }

    #[test]
    fn test_patch_date_targets_date_paragraph() {
        let patched = patch_date(SLIDE, "Date:  19 September 2025")
            .unwrap()
            .expect("date paragraph exists");

        assert!(patched.contains("Date:  19 September 2025"));
        assert!(!patched.contains("Date: tbd"));
        // The title paragraph is untouched
        assert!(patched.contains("Placeholder title"));
        // The date run kept its size
        assert!(patched.contains(r#"sz="1400""#));
    }

    #[test]
    fn test_patch_date_missing_marker_is_noop() {
        let no_date = SLIDE.replace("Date: tbd", "status");
        assert!(patch_date(&no_date, "Date:  x").unwrap().is_none());
    }
}
