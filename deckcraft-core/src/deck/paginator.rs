//! Slide pagination against a template deck

use anyhow::{Context, Result};
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use super::dates::{long_date, next_reporting_date};
use super::table;
use super::template::{self, TemplateDeck};
use crate::config::PipelineConfig;
use crate::record::{RowRecord, SheetOutcome};

/// Generated slides are spliced in after this many leading template slides
pub const SLIDE_INSERT_OFFSET: usize = 2;

const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const LAYOUT_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";

struct NewSlide {
    part_name: String,
    rels_name: String,
    xml: String,
    slide_id: u32,
    rid: String,
}

/// Paginate extracted sheets into the template and return the final deck
/// bytes. Template boilerplate before the insertion offset and after the
/// generated block keeps its position; generated slides are contiguous in
/// sheet-then-chunk order.
pub fn paginate(
    template_bytes: &[u8],
    sheets: &[SheetOutcome],
    config: &PipelineConfig,
    project_title: Option<&str>,
    today: NaiveDate,
) -> Result<Vec<u8>> {
    let mut deck = TemplateDeck::load(template_bytes)?;

    patch_first_slide(&mut deck, config, project_title, today)?;

    let new_slides = build_slides(&deck, sheets, config);
    if !new_slides.is_empty() {
        splice_into_package(&mut deck, &new_slides)?;
    }

    deck.save()
}

/// Title (when given) and reference date on the template's first slide.
/// Both patches are no-ops when their anchor is missing from the slide.
fn patch_first_slide(
    deck: &mut TemplateDeck,
    config: &PipelineConfig,
    project_title: Option<&str>,
    today: NaiveDate,
) -> Result<()> {
    let Some(part_name) = deck.first_slide_part() else {
        return Ok(());
    };
    let Some(bytes) = deck.part(&part_name) else {
        return Ok(());
    };

    let mut xml = String::from_utf8(bytes.to_vec())
        .with_context(|| format!("{part_name} is not UTF-8"))?;

    if let Some(title) = project_title
        && let Some(updated) = template::patch_title(&xml, &config.title_shape, title)?
    {
        xml = updated;
    }

    let date_line = format!("Date:  {}", long_date(next_reporting_date(today)));
    if let Some(updated) = template::patch_date(&xml, &date_line)? {
        xml = updated;
    }

    deck.set_part(&part_name, xml.into_bytes());
    Ok(())
}

/// One slide per chunk of rows, per included sheet, in iteration order
fn build_slides(deck: &TemplateDeck, sheets: &[SheetOutcome], config: &PipelineConfig) -> Vec<NewSlide> {
    let chunk_size = config.rows_per_slide.max(1);

    let mut slides = Vec::new();
    let mut slide_num = deck.max_slide_number();
    let mut slide_id = deck.max_slide_id().max(255);
    let mut rel_num = deck.max_rel_number();

    for outcome in sheets {
        let Some(sheet) = outcome.as_included() else {
            continue;
        };
        if sheet.rows.is_empty() || sheet.headers.is_empty() {
            continue;
        }

        for (ordinal, chunk) in sheet.rows.chunks(chunk_size).enumerate() {
            slide_num += 1;
            slide_id += 1;
            rel_num += 1;

            let title = if ordinal == 0 {
                sheet.name.clone()
            } else {
                format!("{} (Contd..)", sheet.name)
            };
            let rows: Vec<&RowRecord> = chunk.iter().collect();

            slides.push(NewSlide {
                part_name: format!("ppt/slides/slide{slide_num}.xml"),
                rels_name: format!("ppt/slides/_rels/slide{slide_num}.xml.rels"),
                xml: table::slide_xml(&title, &sheet.headers, &rows),
                slide_id,
                rid: format!("rId{rel_num}"),
            });
        }
    }
    slides
}

/// Wire the generated slides into the package: parts, content types,
/// presentation relationships, and the spliced sldIdLst.
fn splice_into_package(deck: &mut TemplateDeck, new_slides: &[NewSlide]) -> Result<()> {
    let layout_target = deck.new_slide_layout_target();

    for slide in new_slides {
        deck.set_part(&slide.part_name, slide.xml.clone().into_bytes());
        deck.set_part(
            &slide.rels_name,
            slide_rels_xml(layout_target.as_deref()).into_bytes(),
        );
    }

    let content_types = deck
        .part("[Content_Types].xml")
        .context("Template has no [Content_Types].xml")?;
    let updated = add_content_type_overrides(
        std::str::from_utf8(content_types)?,
        new_slides,
    )?;
    deck.set_part("[Content_Types].xml", updated.into_bytes());

    let rels = deck
        .part("ppt/_rels/presentation.xml.rels")
        .context("Template has no presentation relationships")?;
    let updated = add_slide_relationships(std::str::from_utf8(rels)?, new_slides)?;
    deck.set_part("ppt/_rels/presentation.xml.rels", updated.into_bytes());

    let presentation = deck
        .part("ppt/presentation.xml")
        .context("Template has no ppt/presentation.xml")?;
    let cursor = SLIDE_INSERT_OFFSET.min(deck.slide_count());
    let updated = splice_slide_ids(std::str::from_utf8(presentation)?, new_slides, cursor)?;
    deck.set_part("ppt/presentation.xml", updated.into_bytes());

    Ok(())
}

fn slide_rels_xml(layout_target: Option<&str>) -> String {
    let layout_rel = match layout_target {
        Some(target) => format!(
            r#"<Relationship Id="rId1" Type="{LAYOUT_REL_TYPE}" Target="{target}"/>"#
        ),
        None => String::new(),
    };
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#
        ),
        layout_rel
    )
}

/// Add an Override entry per generated slide before the closing Types tag
fn add_content_type_overrides(xml: &str, new_slides: &[NewSlide]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        let event = reader.read_event()?;
        match event {
            Event::End(ref e) if e.local_name().as_ref() == b"Types" => {
                for slide in new_slides {
                    let mut over = BytesStart::new("Override");
                    over.push_attribute(("PartName", format!("/{}", slide.part_name).as_str()));
                    over.push_attribute(("ContentType", SLIDE_CONTENT_TYPE));
                    writer.write_event(Event::Empty(over))?;
                }
                writer.write_event(event.clone())?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Add a slide relationship per generated slide
fn add_slide_relationships(xml: &str, new_slides: &[NewSlide]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        let event = reader.read_event()?;
        match event {
            Event::End(ref e) if e.local_name().as_ref() == b"Relationships" => {
                for slide in new_slides {
                    let target = slide
                        .part_name
                        .strip_prefix("ppt/")
                        .unwrap_or(&slide.part_name);
                    let mut rel = BytesStart::new("Relationship");
                    rel.push_attribute(("Id", slide.rid.as_str()));
                    rel.push_attribute(("Type", SLIDE_REL_TYPE));
                    rel.push_attribute(("Target", target));
                    writer.write_event(Event::Empty(rel))?;
                }
                writer.write_event(event.clone())?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Splice the new slide ids into sldIdLst at `cursor`, leaving every
/// pre-existing entry in place around them.
fn splice_slide_ids(xml: &str, new_slides: &[NewSlide], cursor: usize) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut seen = 0usize;
    let mut inserted = false;

    let write_new = |writer: &mut Writer<Cursor<Vec<u8>>>| -> Result<()> {
        for slide in new_slides {
            let mut sld = BytesStart::new("p:sldId");
            sld.push_attribute(("id", slide.slide_id.to_string().as_str()));
            sld.push_attribute(("r:id", slide.rid.as_str()));
            writer.write_event(Event::Empty(sld))?;
        }
        Ok(())
    };

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"sldId" =>
            {
                if seen == cursor && !inserted {
                    write_new(&mut writer)?;
                    inserted = true;
                }
                seen += 1;
                writer.write_event(event.clone())?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sldIdLst" => {
                if !inserted {
                    write_new(&mut writer)?;
                    inserted = true;
                }
                writer.write_event(event.clone())?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}
