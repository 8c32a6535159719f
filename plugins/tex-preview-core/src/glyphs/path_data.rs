use super::font::OutlineSink;
use std::fmt::Write as _;

/// Serialises an outline into SVG path data in device pixels.
///
/// Points are scaled by `scale` and flipped onto a y-down canvas whose
/// baseline sits at `origin_y`. Numbers print with at most two decimals;
/// whole numbers print bare.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDataBuilder {
    origin_x: f64,
    origin_y: f64,
    scale: f64,
    data: String,
}

impl PathDataBuilder {
    pub const fn new(origin_x: f64, origin_y: f64, scale: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            scale,
            data: String::new(),
        }
    }

    pub fn finish(self) -> String {
        self.data
    }

    fn command(&mut self, op: char, points: &[(f32, f32)]) {
        self.data.push(op);
        let mut first = true;
        for &(x, y) in points {
            let x = self.origin_x + f64::from(x) * self.scale;
            let y = self.origin_y - f64::from(y) * self.scale;
            for value in [x, y] {
                push_number(&mut self.data, value, first);
                first = false;
            }
        }
    }
}

/// Negative numbers carry their own separator.
fn push_number(out: &mut String, value: f64, first: bool) {
    if value >= 0.0 && !first {
        out.push(' ');
    }
    let rounded = value.round();
    if rounded == value {
        let _ = write!(out, "{}", rounded as i64);
    } else {
        let _ = write!(out, "{value:.2}");
    }
}

impl OutlineSink for PathDataBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.command('M', &[(x, y)]);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.command('L', &[(x, y)]);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.command('Q', &[(x1, y1), (x, y)]);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.command('C', &[(x1, y1), (x2, y2), (x, y)]);
    }

    fn close(&mut self) {
        self.data.push('Z');
    }
}
