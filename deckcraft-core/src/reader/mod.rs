//! Workbook reader built on a streaming XLSX parser

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use zip::ZipArchive;

pub mod workbook;
pub mod xlsx_parser;

use self::xlsx_parser::XlsxReader;
pub use workbook::{Cell, CellValue, Sheet, Workbook};

/// Read a workbook from an in-memory byte stream
pub fn read_workbook_bytes(data: &[u8]) -> Result<Workbook> {
    let mut archive =
        ZipArchive::new(Cursor::new(data)).context("Failed to open workbook archive")?;
    XlsxReader::new(&mut archive)?.into_workbook()
}

/// Read a workbook from a file path
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open file: {}", path_ref.display()))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).context("Failed to open workbook archive")?;
    XlsxReader::new(&mut archive)?.into_workbook()
}
