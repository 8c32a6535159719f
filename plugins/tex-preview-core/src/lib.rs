//! Synchronisation and incremental-rendering engine for the typeset preview.
//!
//! Everything here is pure: IO, timers and the rendering target live in the
//! editor binding, which feeds events into [`session::PreviewSession`] and
//! executes the effects it returns.

pub mod config;
pub mod document;
pub mod error;
pub mod glyphs;
pub mod logging;
pub mod mapper;
pub mod protocol;
pub mod scheduler;
pub mod session;
pub mod synctex;
pub mod throttle;

pub use config::{PageLayout, PageSize, PreviewConfig};
pub use document::DecodedDocument;
pub use error::{
    ConfigError, DocumentError, FontLoadError, GenerationError, GlyphError, SyncIndexError,
};
pub use logging::{LogLevel, LogRecord};
pub use session::{
    Generation, PreviewSession, PreviewStatus, SessionCommand, SessionEffect, SessionEvent,
    SessionTransition,
};

/// Round half-up, matching the rounding the trace toolchain's consumers use.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
