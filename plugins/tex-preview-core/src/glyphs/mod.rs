//! Glyph outline to vector path cache.

mod font;
mod path_data;
mod ttf;

pub use font::{FontSet, GlyphBounds, GlyphFont, GlyphMetrics, OutlineSink};
pub use path_data::PathDataBuilder;
pub use ttf::TtfFont;

use crate::document::PageSource;
use crate::error::GlyphError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use texsync_support::{FontNumber, GlyphId};

const FALLBACK_UNITS_PER_EM: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    font: FontNumber,
    glyph: GlyphId,
    size_bits: u64,
}

impl GlyphKey {
    pub fn new(font: FontNumber, glyph: GlyphId, size: f64) -> Self {
        Self {
            font,
            glyph,
            size_bits: size.to_bits(),
        }
    }
}

/// Rendered outline of one glyph at one size. Immutable once cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphPath {
    pub font_num: FontNumber,
    pub glyph_index: GlyphId,
    pub size: f64,
    pub path: String,
    pub width: i64,
    pub height: i64,
}

/// One glyph stamped onto a page, in device pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGlyph {
    pub glyph_path: Arc<GlyphPath>,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Default)]
pub struct GlyphPathCache {
    entries: HashMap<GlyphKey, Arc<GlyphPath>>,
}

impl GlyphPathCache {
    pub fn get(&self, key: &GlyphKey) -> Option<&Arc<GlyphPath>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Placement offsets of a glyph at one size.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GlyphFrame {
    scale: f64,
    x_origin: f64,
    baseline: f64,
}

impl GlyphFrame {
    fn new(font: &dyn GlyphFont, metrics: &GlyphMetrics, size: f64) -> Self {
        let units_per_em = font
            .units_per_em()
            .map_or(FALLBACK_UNITS_PER_EM, f64::from);
        let scale = size / units_per_em;
        Self {
            scale,
            x_origin: (metrics.left_side_bearing * scale).floor(),
            baseline: (metrics.bounds.y_max * scale).ceil(),
        }
    }
}

fn build_path(
    font_num: FontNumber,
    glyph: GlyphId,
    size: f64,
    font: &dyn GlyphFont,
    metrics: &GlyphMetrics,
    frame: GlyphFrame,
) -> Result<Option<GlyphPath>, GlyphError> {
    let mut builder = PathDataBuilder::new(-frame.x_origin, frame.baseline, frame.scale);
    font.outline(glyph, &mut builder)?;
    let path = builder.finish();
    if path.is_empty() {
        return Ok(None);
    }
    let bounds = metrics.bounds;
    let span = |min: f64, max: f64| ((max * frame.scale).ceil() - (min * frame.scale).floor()) as i64;
    Ok(Some(GlyphPath {
        font_num,
        glyph_index: glyph,
        size,
        path,
        width: span(bounds.x_min, bounds.x_max),
        height: span(bounds.y_min, bounds.y_max),
    }))
}

/// Resolve every glyph reference on `page` into placed vector paths.
///
/// Glyphs of fonts missing from `fonts`, and glyphs the font does not know,
/// are skipped. Outlines that serialise to nothing (spaces) are neither
/// cached nor placed. Cache misses are inserted into `cache`.
pub fn resolve(
    page: &PageSource,
    fonts: &FontSet,
    cache: &mut GlyphPathCache,
) -> Result<Vec<PageGlyph>, GlyphError> {
    let mut placed = Vec::new();
    for page_font in &page.page_fonts {
        let Some(font) = fonts.get(page_font.font_num) else {
            continue;
        };
        for glyph in &page_font.glyphs {
            let Some(metrics) = font.glyph_metrics(glyph.glyph_index) else {
                continue;
            };
            for size in &glyph.glyph_sizes {
                let frame = GlyphFrame::new(font, &metrics, size.sz);
                let key = GlyphKey::new(page_font.font_num, glyph.glyph_index, size.sz);
                let glyph_path = match cache.entries.get(&key) {
                    Some(hit) => Arc::clone(hit),
                    None => {
                        let Some(built) = build_path(
                            page_font.font_num,
                            glyph.glyph_index,
                            size.sz,
                            font,
                            &metrics,
                            frame,
                        )?
                        else {
                            continue;
                        };
                        let built = Arc::new(built);
                        cache.entries.insert(key, Arc::clone(&built));
                        built
                    }
                };
                placed.extend(size.glyph_placements.iter().map(|placement| PageGlyph {
                    glyph_path: Arc::clone(&glyph_path),
                    x: placement.x + frame.x_origin,
                    y: placement.y - frame.baseline,
                }));
            }
        }
    }
    Ok(placed)
}
