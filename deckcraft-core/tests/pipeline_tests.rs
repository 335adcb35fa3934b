use chrono::NaiveDate;
use deckcraft_core::{DeckBuilder, PipelineConfig, PipelineError, Scalar, SheetOutcome, SkipReason};
use std::io::{Cursor, Read, Write};
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

// Helper to create a minimal valid XLSX archive in memory
fn build_xlsx(
    sheets: &[(&str, bool, &str)],
    shared_strings: Option<&str>,
    styles: Option<&str>,
) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
</Types>"#,
        )
        .unwrap();

        zip.start_file("xl/workbook.xml", options).unwrap();
        let mut workbook_xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>"#,
        );
        for (i, (name, hidden, _)) in sheets.iter().enumerate() {
            let state = if *hidden { r#" state="hidden""# } else { "" };
            workbook_xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
                name,
                i + 1,
                state,
                i + 1
            ));
        }
        workbook_xml.push_str("</sheets></workbook>");
        zip.write_all(workbook_xml.as_bytes()).unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        let mut rels_xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, _) in sheets.iter().enumerate() {
            rels_xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }
        rels_xml.push_str("</Relationships>");
        zip.write_all(rels_xml.as_bytes()).unwrap();

        if let Some(ss) = shared_strings {
            zip.start_file("xl/sharedStrings.xml", options).unwrap();
            zip.write_all(ss.as_bytes()).unwrap();
        }
        if let Some(st) = styles {
            zip.start_file("xl/styles.xml", options).unwrap();
            zip.write_all(st.as_bytes()).unwrap();
        }

        for (i, (_, _, sheet_xml)) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(sheet_xml.as_bytes()).unwrap();
        }

        zip.finish().unwrap();
    }
    buf
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="m/d/yyyy"/></numFmts>
<fonts count="2">
<font><sz val="11"/><name val="Calibri"/></font>
<font><b/><color rgb="FFFF0000"/><sz val="11"/><name val="Calibri"/></font>
</fonts>
<fills count="3">
<fill><patternFill patternType="none"/></fill>
<fill><patternFill patternType="gray125"/></fill>
<fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/></patternFill></fill>
</fills>
<borders count="1"><border/></borders>
<cellXfs count="3">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
<xf numFmtId="0" fontId="1" fillId="2" borderId="0"/>
<xf numFmtId="164" fontId="0" fillId="0" borderId="0"/>
</cellXfs>
</styleSheet>"#;

fn inline(cell: &str, text: &str) -> String {
    format!(r#"<c r="{cell}" t="inlineStr"><is><t>{text}</t></is></c>"#)
}

/// Walkthrough workbook: one visible sheet "Deps", a blank first column,
/// headers on row 1, seven data rows.
fn deps_workbook() -> Vec<u8> {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<dimension ref="A1:D8"/>
<sheetData>"#,
    );
    sheet.push_str(&format!(
        "<row r=\"1\">{}{}{}</row>",
        inline("B1", "Name"),
        inline("C1", "Owner"),
        inline("D1", "Comments"),
    ));
    // Row 2 uses a shared string and a styled owner cell
    sheet.push_str(&format!(
        r#"<row r="2"><c r="B2" t="s"><v>0</v></c><c r="C2" s="1" t="inlineStr"><is><t>infra</t></is></c>{}</row>"#,
        inline("D2", "z 01/04&#10;a 01/05&#10;b 03/05&#10;c 02/05"),
    ));
    for row in 3..=8 {
        sheet.push_str(&format!(
            "<row r=\"{row}\">{}{}{}</row>",
            inline(&format!("B{row}"), &format!("svc-{row}")),
            inline(&format!("C{row}"), "core"),
            inline(&format!("D{row}"), "no update"),
        ));
    }
    sheet.push_str("</sheetData></worksheet>");

    let shared = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1"><si><t>api</t></si></sst>"#;

    build_xlsx(&[("Deps", false, &sheet)], Some(shared), Some(STYLES_XML))
}

/// Workbook exercising merges, date cells, and a hidden sheet
fn tracker_workbook() -> Vec<u8> {
    let mut tracker = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<dimension ref="A1:C3"/>
<sheetData>"#,
    );
    tracker.push_str(&format!(
        "<row r=\"1\">{}{}{}</row>",
        inline("A1", "Item"),
        inline("B1", "Due"),
        inline("C1", "State"),
    ));
    tracker.push_str(&format!(
        r#"<row r="2">{}<c r="B2" s="2"><v>45139</v></c>{}</row>"#,
        inline("A2", "alpha"),
        inline("C2", "open"),
    ));
    tracker.push_str(&format!("<row r=\"3\">{}</row>", inline("C3", "closed")));
    tracker.push_str(
        r#"</sheetData><mergeCells count="1"><mergeCell ref="A2:A3"/></mergeCells></worksheet>"#,
    );

    let hidden = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Check</t></is></c><c r="B1" t="inlineStr"><is><t>Result</t></is></c></row></sheetData></worksheet>"#;

    build_xlsx(
        &[("Tracker", false, &tracker), ("QA Review", true, hidden)],
        None,
        Some(STYLES_XML),
    )
}

fn template_slide1() -> &'static str {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
        r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
        r#"<p:cSld><p:spTree>"#,
        r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/>"#,
        r#"<p:txBody><a:bodyPr/><a:lstStyle/>"#,
        r#"<a:p><a:r><a:rPr lang="en-US" sz="4000"><a:solidFill><a:srgbClr val="1F4E79"/></a:solidFill><a:latin typeface="Georgia"/></a:rPr>"#,
        r#"<a:t>Status Report</a:t></a:r></a:p></p:txBody></p:sp>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="TextBox 2"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/>"#,
        r#"<p:txBody><a:bodyPr/><a:lstStyle/>"#,
        r#"<a:p><a:r><a:rPr lang="en-US" sz="1400"/><a:t>Date: </a:t></a:r></a:p></p:txBody></p:sp>"#,
        r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn plain_slide(text: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
            r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
            r#"<p:cSld><p:spTree>"#,
            r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Body 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/>"#,
            r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
            r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
        ),
        text
    )
}

/// A three-slide template: patched title slide, agenda, closing slide
fn build_template(slide_count: usize) -> Vec<u8> {
    assert!((1..=3).contains(&slide_count));
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        zip.start_file("[Content_Types].xml", options).unwrap();
        let mut types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
        );
        for i in 1..=slide_count {
            types.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            ));
        }
        types.push_str("</Types>");
        zip.write_all(types.as_bytes()).unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#,
        )
        .unwrap();

        zip.start_file("ppt/presentation.xml", options).unwrap();
        let mut pres = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
<p:sldIdLst>"#,
        );
        for i in 1..=slide_count {
            pres.push_str(&format!(
                r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                255 + i,
                i + 1
            ));
        }
        pres.push_str(
            r#"</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#,
        );
        zip.write_all(pres.as_bytes()).unwrap();

        zip.start_file("ppt/_rels/presentation.xml.rels", options)
            .unwrap();
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
        );
        for i in 1..=slide_count {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                i + 1,
                i
            ));
        }
        rels.push_str("</Relationships>");
        zip.write_all(rels.as_bytes()).unwrap();

        let bodies = [
            template_slide1().to_string(),
            plain_slide("Agenda"),
            plain_slide("Thank you"),
        ];
        for i in 1..=slide_count {
            zip.start_file(format!("ppt/slides/slide{i}.xml"), options)
                .unwrap();
            zip.write_all(bodies[i - 1].as_bytes()).unwrap();
        }

        for i in 1..=2 {
            zip.start_file(format!("ppt/slideLayouts/slideLayout{i}.xml"), options)
                .unwrap();
            zip.write_all(
                br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree/></p:cSld></p:sldLayout>"#,
            )
            .unwrap();
        }

        zip.finish().unwrap();
    }
    buf
}

fn read_part(deck: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(deck.to_vec())).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn slide_id_rids(deck: &[u8]) -> Vec<String> {
    let pres = read_part(deck, "ppt/presentation.xml");
    let start = pres.find("<p:sldIdLst>").unwrap();
    let end = pres.find("</p:sldIdLst>").unwrap();
    let list = &pres[start..end];
    list.match_indices("r:id=\"")
        .map(|(i, _)| {
            let rest = &list[i + 6..];
            rest[..rest.find('"').unwrap()].to_string()
        })
        .collect()
}

#[test]
fn test_end_to_end_deps_scenario() {
    let workbook = deps_workbook();
    let template = build_template(3);

    let builder = DeckBuilder::with_config(PipelineConfig {
        rows_per_slide: 5,
        ..Default::default()
    });
    // 2025-09-09 is a Tuesday; the reporting date must be Friday the 12th
    let today = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
    let deck = builder
        .generate_on(&workbook, &template, Some("Project X"), today)
        .unwrap();

    // 7 rows at 5 per slide -> two generated slides, numbered after the
    // template's three
    let slide4 = read_part(&deck, "ppt/slides/slide4.xml");
    let slide5 = read_part(&deck, "ppt/slides/slide5.xml");

    assert!(slide4.contains("<a:t>Deps</a:t>"));
    assert!(slide5.contains("<a:t>Deps (Contd..)</a:t>"));

    // Header + 5 data rows, then header + 2 data rows
    assert_eq!(slide4.matches("<a:tr ").count(), 6);
    assert_eq!(slide5.matches("<a:tr ").count(), 3);

    // The blank first column was dropped: three columns survive
    assert_eq!(slide4.matches("<a:gridCol").count(), 3);
    assert!(slide4.contains("<a:t>Name</a:t>"));

    // Shared-string cell made it through
    assert!(slide4.contains("<a:t>api</a:t>"));

    // Styled cell renders its font color and fill
    assert!(slide4.contains("FF0000"));
    assert!(slide4.contains("FFFF00"));

    // Condensed comments: 01/04 is the oldest of four dates and drops out
    assert!(!slide4.contains("z 01/04"));
    assert!(slide4.contains("b 03/05"));
    assert!(slide4.contains("a 01/05"));

    // First slide got the title and the computed date, with Arial forced
    let slide1 = read_part(&deck, "ppt/slides/slide1.xml");
    assert!(slide1.contains("Project X"));
    assert!(!slide1.contains("Status Report"));
    assert!(slide1.contains("Date:  12 September 2025"));
    assert!(slide1.contains(r#"typeface="Arial""#));
    // The original title color survives on the patched run
    assert!(slide1.contains("1F4E79"));
}

#[test]
fn test_slide_ordering_invariant() {
    let workbook = deps_workbook();
    let template = build_template(3);

    let builder = DeckBuilder::with_config(PipelineConfig {
        rows_per_slide: 5,
        ..Default::default()
    });
    let today = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
    let deck = builder
        .generate_on(&workbook, &template, None, today)
        .unwrap();

    // Leading template slides stay first, generated slides are contiguous
    // at index 2, the closing template slide moves behind them
    let rids = slide_id_rids(&deck);
    assert_eq!(rids, vec!["rId2", "rId3", "rId5", "rId6", "rId4"]);
}

#[test]
fn test_pagination_conservation() {
    let workbook = deps_workbook();
    let template = build_template(3);

    for page_size in [1usize, 3, 5, 7, 10] {
        let builder = DeckBuilder::with_config(PipelineConfig {
            rows_per_slide: page_size,
            ..Default::default()
        });
        let today = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
        let deck = builder
            .generate_on(&workbook, &template, None, today)
            .unwrap();

        let expected_slides = 7usize.div_ceil(page_size);
        assert_eq!(
            slide_id_rids(&deck).len(),
            3 + expected_slides,
            "page size {page_size}"
        );

        // Summing data rows across generated slides gives back all 7
        let mut total_rows = 0usize;
        for i in 0..expected_slides {
            let slide = read_part(&deck, &format!("ppt/slides/slide{}.xml", 4 + i));
            total_rows += slide.matches("<a:tr ").count() - 1;
        }
        assert_eq!(total_rows, 7, "page size {page_size}");
    }
}

#[test]
fn test_extraction_merges_dates_and_hidden_sheets() {
    let workbook = tracker_workbook();
    let builder = DeckBuilder::new();
    let outcomes = builder.extract(&workbook).unwrap();
    assert_eq!(outcomes.len(), 2);

    let tracker = outcomes[0].as_included().expect("Tracker is visible");
    assert_eq!(tracker.headers, vec!["Item", "Due", "State"]);
    assert_eq!(tracker.rows.len(), 2);

    // The merged Item cell covers both data rows after expansion
    for row in &tracker.rows {
        assert_eq!(
            row.get("Item").and_then(|c| c.value.as_text()),
            Some("alpha")
        );
    }

    // The date-formatted serial became a calendar date
    assert_eq!(
        tracker.rows[0].get("Due").map(|c| &c.value),
        Some(&Scalar::Date(NaiveDate::from_ymd_opt(2023, 8, 1).unwrap()))
    );

    assert!(matches!(
        outcomes[1],
        SheetOutcome::Skipped {
            reason: SkipReason::Hidden,
            ..
        }
    ));
}

#[test]
fn test_headerless_sheet_skips_without_failing_run() {
    let banner = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>nothing here</t></is></c></row></sheetData></worksheet>"#;
    let workbook = build_xlsx(&[("Notes", false, banner)], None, None);

    let outcomes = DeckBuilder::new().extract(&workbook).unwrap();
    assert!(matches!(
        outcomes[0],
        SheetOutcome::Skipped {
            reason: SkipReason::HeaderNotFound,
            ..
        }
    ));
}

#[test]
fn test_skipped_sheets_produce_no_slides() {
    let workbook = tracker_workbook();
    let template = build_template(3);
    let today = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
    let deck = DeckBuilder::new()
        .generate_on(&workbook, &template, None, today)
        .unwrap();

    // Tracker has 2 rows -> one generated slide; QA Review contributes none
    assert_eq!(slide_id_rids(&deck).len(), 4);
    let slide4 = read_part(&deck, "ppt/slides/slide4.xml");
    assert!(slide4.contains("<a:t>Tracker</a:t>"));
    assert!(!slide4.contains("QA Review"));
}

#[test]
fn test_short_template_clamps_insertion_offset() {
    let workbook = tracker_workbook();
    let template = build_template(1);
    let today = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
    let deck = DeckBuilder::new()
        .generate_on(&workbook, &template, None, today)
        .unwrap();

    let rids = slide_id_rids(&deck);
    assert_eq!(rids[0], "rId2");
    assert_eq!(rids.len(), 2);
}

#[test]
fn test_generated_slides_reference_second_layout() {
    let workbook = tracker_workbook();
    let template = build_template(3);
    let today = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
    let deck = DeckBuilder::new()
        .generate_on(&workbook, &template, None, today)
        .unwrap();

    let rels = read_part(&deck, "ppt/slides/_rels/slide4.xml.rels");
    assert!(rels.contains("../slideLayouts/slideLayout2.xml"));
}

#[test]
fn test_unreadable_inputs_are_fatal_and_typed() {
    let builder = DeckBuilder::new();

    let err = builder.extract(b"not a zip archive").unwrap_err();
    assert!(matches!(err, PipelineError::WorkbookUnreadable { .. }));

    let workbook = deps_workbook();
    let today = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
    let err = builder
        .generate_on(&workbook, b"garbage", None, today)
        .unwrap_err();
    assert!(matches!(err, PipelineError::TemplateUnreadable { .. }));
}

#[test]
fn test_row_records_serialize_for_diagnostics() {
    let workbook = deps_workbook();
    let outcomes = DeckBuilder::new().extract(&workbook).unwrap();
    let deps = outcomes[0].as_included().unwrap();

    let json = serde_json::to_value(&deps.rows).unwrap();
    assert_eq!(json[0]["Name"]["value"], "api");
    assert_eq!(json[0]["Owner"]["style"]["bold"], true);
    assert_eq!(json[0]["Owner"]["style"]["fill_color"], "FFFF00");
}
