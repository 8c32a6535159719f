//! Structured page list produced by the external page decoder.
//!
//! Field names mirror the decoder's JSON. Unknown fields are kept so an
//! exported document round-trips unchanged.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use texsync_support::{FontNumber, GlyphId, PageIndex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedDocument {
    #[serde(default)]
    pub fonts: Vec<FontDescriptor>,
    pub pages: Vec<Arc<PageSource>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontDescriptor {
    pub font_num: FontNumber,
    pub font_name: String,
    pub font_path: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSource {
    #[serde(default)]
    pub images: Vec<PageImage>,
    #[serde(default)]
    pub rules: Vec<PageRule>,
    #[serde(default)]
    pub page_fonts: Vec<PageFont>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageImage {
    pub file_name: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Filled rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRule {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFont {
    pub font_num: FontNumber,
    pub glyphs: Vec<PageFontGlyph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFontGlyph {
    pub glyph_index: GlyphId,
    pub glyph_sizes: Vec<GlyphSize>,
}

/// One rendered size of a glyph and every place it appears at that size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphSize {
    pub sz: f64,
    pub glyph_placements: Vec<GlyphPlacement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlyphPlacement {
    pub x: f64,
    pub y: f64,
}

impl DecodedDocument {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty JSON with four-space indentation, as written by the export
    /// command.
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: PageIndex) -> Option<&Arc<PageSource>> {
        self.pages.get(index.raw())
    }
}
