//! Cell style model and value-keyed interning

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Horizontal cell alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizAlign {
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

impl fmt::Display for HorizAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HorizAlign::Left => "left",
            HorizAlign::Center => "center",
            HorizAlign::Right => "right",
            HorizAlign::Fill => "fill",
            HorizAlign::Justify => "justify",
        })
    }
}

impl FromStr for HorizAlign {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "left" => HorizAlign::Left,
            "center" | "centerContinuous" => HorizAlign::Center,
            "right" => HorizAlign::Right,
            "fill" => HorizAlign::Fill,
            "justify" => HorizAlign::Justify,
            _ => return Err(()),
        })
    }
}

/// Vertical cell alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VertAlign {
    Top,
    Center,
    Bottom,
    Justify,
}

impl fmt::Display for VertAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VertAlign::Top => "top",
            VertAlign::Center => "center",
            VertAlign::Bottom => "bottom",
            VertAlign::Justify => "justify",
        })
    }
}

impl FromStr for VertAlign {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "top" => VertAlign::Top,
            "center" => VertAlign::Center,
            "bottom" => VertAlign::Bottom,
            "justify" => VertAlign::Justify,
            _ => return Err(()),
        })
    }
}

/// Canonical formatting attributes of one cell.
///
/// Two cells with identical attribute tuples share one instance through
/// [`StyleCache`]; equality and hashing are purely structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellStyle {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    /// Font color as uppercase RRGGBB hex, alpha already stripped
    pub font_color: Option<String>,
    /// Solid fill color as uppercase RRGGBB hex
    pub fill_color: Option<String>,
    pub number_format: Option<String>,
    pub align_h: Option<HorizAlign>,
    pub align_v: Option<VertAlign>,
}

impl CellStyle {
    /// True when no attribute is set at all
    pub fn is_plain(&self) -> bool {
        *self == CellStyle::default()
    }
}

/// Interning map for [`CellStyle`] values, scoped to one extraction run.
///
/// Keys are the style values themselves, so deduplication is by attribute
/// tuple rather than object identity.
#[derive(Debug, Default)]
pub struct StyleCache {
    entries: HashMap<CellStyle, Arc<CellStyle>>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared instance for `style`, creating it on first sight.
    pub fn intern(&mut self, style: CellStyle) -> Arc<CellStyle> {
        if let Some(existing) = self.entries.get(&style) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(style.clone());
        self.entries.insert(style, Arc::clone(&shared));
        shared
    }

    /// Number of distinct styles seen so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalize a spreadsheet color string to RRGGBB hex.
///
/// Accepts both 6-digit RGB and 8-digit ARGB (the alpha prefix is dropped).
/// Anything else, including theme-indexed colors, yields `None` so callers
/// fall back to their rendering default.
pub fn normalize_hex_color(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('#');
    let hex = match trimmed.len() {
        6 => trimmed,
        8 => &trimmed[2..],
        _ => return None,
    };
    if hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hex.to_ascii_uppercase())
    } else {
        None
    }
}
