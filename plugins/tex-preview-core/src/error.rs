use texsync_support::{FontNumber, GlyphId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncIndexError {
    #[error("cannot scale trace units at {dpi} dpi and {magnification}% magnification")]
    InvalidScale { dpi: u32, magnification: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlyphError {
    #[error("outline extraction failed for glyph {glyph} of font {font}")]
    Outline { font: FontNumber, glyph: GlyphId },
}

#[derive(Debug, Error)]
pub enum FontLoadError {
    #[error("font read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("font parse failed: {reason}")]
    Parse { reason: String },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid page list: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("dpi must be positive")]
    ZeroDpi,
    #[error("magnification must be positive")]
    ZeroMagnification,
    #[error("page buffer size must be positive")]
    ZeroBufferSize,
}

/// Whole-pipeline failure: the generation attempt is abandoned.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("toolchain failed:\n{output}")]
    Toolchain { output: String },
}
