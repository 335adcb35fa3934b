//! Pipeline configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::transform::comments::DEFAULT_MAX_COMMENTS;

/// Options for one extract-and-paginate run.
///
/// Everything has a sensible default, so `PipelineConfig::default()` is a
/// complete configuration; a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Data rows rendered per generated slide
    #[serde(default = "default_rows_per_slide")]
    pub rows_per_slide: usize,
    /// Distinct comment dates kept by the comment condenser
    #[serde(default = "default_max_comments")]
    pub max_comments: usize,
    /// Column label whose text cells run through the condenser
    #[serde(default = "default_comments_label")]
    pub comments_label: String,
    /// Name of the first slide's title placeholder shape
    #[serde(default = "default_title_shape")]
    pub title_shape: String,
    /// Extract independent worksheets on a rayon pool
    #[serde(default)]
    pub parallel_sheets: bool,
}

fn default_rows_per_slide() -> usize {
    5
}

fn default_max_comments() -> usize {
    DEFAULT_MAX_COMMENTS
}

fn default_comments_label() -> String {
    "Comments".to_string()
}

fn default_title_shape() -> String {
    "Title 1".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rows_per_slide: default_rows_per_slide(),
            max_comments: default_max_comments(),
            comments_label: default_comments_label(),
            title_shape: default_title_shape(),
            parallel_sheets: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
