use crate::error::GlyphError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use texsync_support::{FontNumber, GlyphId};

/// Receives outline segments in font units, y axis pointing up.
pub trait OutlineSink {
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32);
    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32);
    fn close(&mut self);
}

/// Glyph bounding box in font units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphBounds {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    pub left_side_bearing: f64,
    pub bounds: GlyphBounds,
}

/// A loaded font as seen by the glyph path cache.
pub trait GlyphFont: Send + Sync + fmt::Debug {
    /// Design units per em; `None` when the font does not declare one.
    fn units_per_em(&self) -> Option<u16>;

    /// `None` when the font has no such glyph.
    fn glyph_metrics(&self, glyph: GlyphId) -> Option<GlyphMetrics>;

    /// Stream the glyph's outline into `sink`. Glyphs without an outline emit
    /// nothing.
    fn outline(&self, glyph: GlyphId, sink: &mut dyn OutlineSink) -> Result<(), GlyphError>;
}

/// Fonts of one document, keyed by the decoder's font number.
#[derive(Debug, Clone, Default)]
pub struct FontSet {
    fonts: HashMap<FontNumber, Arc<dyn GlyphFont>>,
}

impl FontSet {
    pub fn insert(&mut self, font_num: FontNumber, font: Arc<dyn GlyphFont>) {
        self.fonts.insert(font_num, font);
    }

    pub fn get(&self, font_num: FontNumber) -> Option<&dyn GlyphFont> {
        self.fonts.get(&font_num).map(AsRef::as_ref)
    }

    pub fn contains(&self, font_num: FontNumber) -> bool {
        self.fonts.contains_key(&font_num)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
