use crate::error::ConfigError;
use crate::logging::LogLevel;
use serde::Deserialize;
use std::fmt;

const MM_TO_INCH: f64 = 0.039_370_079;
const MIN_MAGNIFICATION: i64 = 10;

/// Paper size of the rendered pages. Unknown names fall back to A4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "String")]
pub enum PageSize {
    A3,
    #[default]
    A4,
    A5,
    UsLetter,
    UsLegal,
}

impl PageSize {
    pub fn from_name(name: &str) -> Self {
        match name {
            "A3" => Self::A3,
            "A5" => Self::A5,
            "US Letter" => Self::UsLetter,
            "US Legal" => Self::UsLegal,
            _ => Self::A4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::UsLetter => "US Letter",
            Self::UsLegal => "US Legal",
        }
    }

    /// (width, height) in millimetres.
    pub const fn dimensions_mm(self) -> (u32, u32) {
        match self {
            Self::A3 => (297, 420),
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::UsLetter => (216, 279),
            Self::UsLegal => (216, 356),
        }
    }
}

impl From<String> for PageSize {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub dpi: u32,
    pub magnification: u32,
    pub page_size: PageSize,
    pub page_buffer_size: usize,
    pub page_gap: u32,
    pub sync_interval_ms: u64,
    pub debug_mode: bool,
    pub log_level: LogLevel,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            dpi: 96,
            magnification: 100,
            page_size: PageSize::A4,
            page_buffer_size: 2,
            page_gap: 0,
            sync_interval_ms: 50,
            debug_mode: false,
            log_level: LogLevel::Info,
        }
    }
}

impl PreviewConfig {
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.dpi == 0 {
            return Err(ConfigError::ZeroDpi);
        }
        if self.magnification == 0 {
            return Err(ConfigError::ZeroMagnification);
        }
        if self.page_buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }

    /// Step the magnification by `delta` percent, never below 10%.
    pub fn adjust_magnification(&mut self, delta: i32) {
        let next = (i64::from(self.magnification) + i64::from(delta)).max(MIN_MAGNIFICATION);
        self.magnification = u32::try_from(next).unwrap_or(u32::MAX);
    }

    pub fn layout(&self) -> PageLayout {
        let scale = f64::from(self.dpi) * (f64::from(self.magnification) / 100.0);
        let (width_mm, height_mm) = self.page_size.dimensions_mm();
        let to_pixels = |mm: u32| (f64::from(mm) * MM_TO_INCH * scale).floor() as u32;
        PageLayout {
            margin_pixels: scale.floor() as u32,
            page_width: to_pixels(width_mm),
            page_height: to_pixels(height_mm),
            page_gap: self.page_gap,
        }
    }
}

/// Pixel geometry of the continuous page strip shown by the rendering target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub margin_pixels: u32,
    pub page_width: u32,
    pub page_height: u32,
    pub page_gap: u32,
}

impl PageLayout {
    /// Vertical distance between the tops of two consecutive pages.
    pub fn stride(&self) -> i64 {
        (i64::from(self.page_height) + i64::from(self.page_gap)).max(1)
    }

    pub fn page_top(&self, page_index: i64) -> i64 {
        page_index.saturating_mul(self.stride())
    }

    /// Zero-based page index containing the absolute vertical position `y`.
    pub fn page_at(&self, y: i64) -> i64 {
        y.div_euclid(self.stride())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn default_layout_is_a4_at_96_dpi() {
        let layout = PreviewConfig::default().layout();
        assert_eq!(
            layout,
            PageLayout {
                margin_pixels: 96,
                page_width: 793,
                page_height: 1122,
                page_gap: 0,
            }
        );
        assert_eq!(layout.stride(), 1122);
    }

    #[rstest]
    #[case("A3", PageSize::A3)]
    #[case("US Letter", PageSize::UsLetter)]
    #[case("US Legal", PageSize::UsLegal)]
    #[case("B5", PageSize::A4)]
    fn page_size_names(#[case] name: &str, #[case] expected: PageSize) {
        assert_eq!(PageSize::from_name(name), expected);
    }

    #[test]
    fn layout_scales_with_magnification_and_gap() {
        let config = PreviewConfig {
            magnification: 200,
            page_gap: 10,
            ..PreviewConfig::default()
        };
        let layout = config.layout();
        assert_eq!(layout.margin_pixels, 192);
        assert_eq!(layout.page_height, 2245);
        assert_eq!(layout.stride(), 2255);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1121, 0)]
    #[case(1122, 1)]
    #[case(-1, -1)]
    fn page_at_uses_floor_division(#[case] y: i64, #[case] expected: i64) {
        assert_eq!(PreviewConfig::default().layout().page_at(y), expected);
    }

    #[rstest]
    #[case(100, 10, 110)]
    #[case(100, -10, 90)]
    #[case(15, -10, 10)]
    #[case(10, -10, 10)]
    fn adjust_magnification_has_a_floor(
        #[case] start: u32,
        #[case] delta: i32,
        #[case] expected: u32,
    ) {
        let mut config = PreviewConfig {
            magnification: start,
            ..PreviewConfig::default()
        };
        config.adjust_magnification(delta);
        assert_eq!(config.magnification, expected);
    }

    #[test]
    fn validate_rejects_zero_values() {
        let zero_dpi = PreviewConfig {
            dpi: 0,
            ..PreviewConfig::default()
        };
        let zero_buffer = PreviewConfig {
            page_buffer_size: 0,
            ..PreviewConfig::default()
        };
        assert_eq!(zero_dpi.validate(), Err(ConfigError::ZeroDpi));
        assert_eq!(zero_buffer.validate(), Err(ConfigError::ZeroBufferSize));
        assert_eq!(PreviewConfig::default().validate(), Ok(()));
    }

    #[test]
    fn config_deserializes_with_defaults() -> Result<(), &'static str> {
        let config: PreviewConfig =
            serde_json::from_str(r#"{"page_size": "US Letter", "debug_mode": true}"#)
                .map_err(|_| "config should decode")?;
        assert_eq!(config.page_size, PageSize::UsLetter);
        assert!(config.debug_mode);
        assert_eq!(config.dpi, 96);
        Ok(())
    }
}
