//! Messages exchanged with the rendering target.
//!
//! Outbound messages are `{"type": ..., "value": {...}}`; inbound ones are
//! tagged by `command`.

use crate::document::PageSource;
use crate::glyphs::PageGlyph;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use texsync_support::PageIndex;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    content = "value",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum OutboundMessage {
    InitCanvas {
        page_count: usize,
        margin_pixels: u32,
        page_width: u32,
        page_height: u32,
        page_gap: u32,
    },
    /// Glyph bitmaps cached by the target belong to another document.
    ResetGlyphBitmaps {},
    RenderPage {
        page_index: PageIndex,
        page_source: Arc<PageSource>,
        page_glyphs: Vec<PageGlyph>,
    },
    Scroll {
        v_pos: i64,
    },
}

impl OutboundMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(
    tag = "command",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum InboundMessage {
    PageRendered { page_index: PageIndex },
    WebviewScrolled { scroll_y: f64 },
}

impl InboundMessage {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
