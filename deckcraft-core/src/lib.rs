//! deckcraft-core: workbook-to-deck conversion pipeline
//!
//! This library turns a styled spreadsheet workbook into a slide deck built
//! on a template presentation: per-sheet extraction into header-keyed row
//! records (value plus cell style), dated comment-log condensing, and
//! pagination of the rows into styled tables spliced in after the
//! template's leading boilerplate slides.

pub mod config;
pub mod deck;
pub mod error;
pub mod format;
pub mod reader;
pub mod record;
pub mod style;
pub mod transform;

use anyhow::Result as AnyResult;
use chrono::{Local, NaiveDate};

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use record::{CellRecord, RowRecord, Scalar, SheetOutcome, SheetResult, SkipReason};
pub use style::{CellStyle, HorizAlign, VertAlign};

/// Main pipeline interface
pub struct DeckBuilder {
    config: PipelineConfig,
}

impl DeckBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create a builder with custom configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract per-sheet row records from a workbook byte stream.
    ///
    /// Sheets that cannot contribute come back as tagged skips; only a
    /// stream that is no workbook at all is an error.
    pub fn extract(&self, workbook: &[u8]) -> Result<Vec<SheetOutcome>, PipelineError> {
        let parsed = reader::read_workbook_bytes(workbook)
            .map_err(|err| PipelineError::workbook(format!("{err:#}")))?;
        Ok(transform::extract_sheets(&parsed, &self.config))
    }

    /// Extract a workbook and paginate it into the template, returning the
    /// generated deck's bytes. The reference date on the first slide is
    /// computed from the local calendar.
    pub fn generate(
        &self,
        workbook: &[u8],
        template: &[u8],
        project_title: Option<&str>,
    ) -> Result<Vec<u8>, PipelineError> {
        self.generate_on(workbook, template, project_title, Local::now().date_naive())
    }

    /// Like [`DeckBuilder::generate`], with an explicit "today" so callers
    /// and tests control the computed reference date.
    pub fn generate_on(
        &self,
        workbook: &[u8],
        template: &[u8],
        project_title: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<u8>, PipelineError> {
        let sheets = self.extract(workbook)?;
        self.paginate(template, &sheets, project_title, today)
    }

    /// Paginate already-extracted sheets into the template
    pub fn paginate(
        &self,
        template: &[u8],
        sheets: &[SheetOutcome],
        project_title: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<u8>, PipelineError> {
        run_pagination(template, sheets, &self.config, project_title, today)
            .map_err(|err| PipelineError::template(format!("{err:#}")))
    }
}

impl Default for DeckBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn run_pagination(
    template: &[u8],
    sheets: &[SheetOutcome],
    config: &PipelineConfig,
    project_title: Option<&str>,
    today: NaiveDate,
) -> AnyResult<Vec<u8>> {
    deck::paginate(template, sheets, config, project_title, today)
}
