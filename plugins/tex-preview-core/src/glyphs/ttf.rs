use super::font::{GlyphBounds, GlyphFont, GlyphMetrics, OutlineSink};
use crate::error::{FontLoadError, GlyphError};
use std::path::Path;
use texsync_support::{FontNumber, GlyphId};

/// TrueType/OpenType font backed by `ttf-parser`.
///
/// Only the raw bytes are kept; the face is re-parsed per query, which is
/// cheap because parsing is lazy.
#[derive(Debug, Clone)]
pub struct TtfFont {
    font_num: FontNumber,
    data: Vec<u8>,
    units_per_em: u16,
}

struct SinkAdapter<'a> {
    sink: &'a mut dyn OutlineSink,
}

impl ttf_parser::OutlineBuilder for SinkAdapter<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.sink.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.sink.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.sink.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.sink.curve_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.sink.close();
    }
}

impl TtfFont {
    pub fn load(font_num: FontNumber, path: &Path) -> Result<Self, FontLoadError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(font_num, data)
    }

    pub fn from_bytes(font_num: FontNumber, data: Vec<u8>) -> Result<Self, FontLoadError> {
        let units_per_em = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| FontLoadError::Parse {
                reason: err.to_string(),
            })?
            .units_per_em();
        Ok(Self {
            font_num,
            data,
            units_per_em,
        })
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, 0).ok()
    }
}

fn ttf_glyph_id(glyph: GlyphId) -> Option<ttf_parser::GlyphId> {
    u16::try_from(glyph.raw()).ok().map(ttf_parser::GlyphId)
}

impl GlyphFont for TtfFont {
    fn units_per_em(&self) -> Option<u16> {
        (self.units_per_em > 0).then_some(self.units_per_em)
    }

    fn glyph_metrics(&self, glyph: GlyphId) -> Option<GlyphMetrics> {
        let face = self.face()?;
        let id = ttf_glyph_id(glyph)?;
        if id.0 >= face.number_of_glyphs() {
            return None;
        }
        let bounds = face
            .glyph_bounding_box(id)
            .map(|rect| GlyphBounds {
                x_min: f64::from(rect.x_min),
                y_min: f64::from(rect.y_min),
                x_max: f64::from(rect.x_max),
                y_max: f64::from(rect.y_max),
            })
            .unwrap_or_default();
        Some(GlyphMetrics {
            left_side_bearing: face.glyph_hor_side_bearing(id).map_or(0.0, f64::from),
            bounds,
        })
    }

    fn outline(&self, glyph: GlyphId, sink: &mut dyn OutlineSink) -> Result<(), GlyphError> {
        let outline_error = || GlyphError::Outline {
            font: self.font_num,
            glyph,
        };
        let face = self.face().ok_or_else(outline_error)?;
        let id = ttf_glyph_id(glyph).ok_or_else(outline_error)?;
        // `None` means the glyph has no contours, e.g. a space.
        let _ = face.outline_glyph(id, &mut SinkAdapter { sink });
        Ok(())
    }
}
