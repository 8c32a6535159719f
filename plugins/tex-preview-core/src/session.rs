//! One preview session: the document, its sync index and render state.
//!
//! The session is a reducer. Callers feed it [`SessionEvent`]s and execute
//! the [`SessionEffect`]s it returns; a [`SessionCommand`] asks the caller
//! to arm a timer and send [`SessionEvent::ForwardSyncDue`] back.

use crate::config::{PageLayout, PageSize, PreviewConfig};
use crate::document::DecodedDocument;
use crate::error::{ConfigError, GenerationError};
use crate::glyphs::{self, FontSet, GlyphPathCache};
use crate::logging::LogRecord;
use crate::mapper::{ForwardOutcome, PositionMapper, ReverseOutcome};
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::round_half_up;
use crate::scheduler::{RenderScheduler, ScrollDirection};
use crate::synctex::SyncIndex;
use crate::throttle::{ForwardSyncThrottle, ThrottleDecision};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use texsync_support::state_machine::{Machine, Transition};
use texsync_support::{PageIndex, PageNumber, SourceLine};

/// Output of one successful compile and decode.
#[derive(Debug, Clone)]
pub struct Generation {
    pub source: PathBuf,
    pub document: DecodedDocument,
    pub fonts: FontSet,
    /// Trace text; `None` when the toolchain wrote no trace file.
    pub trace: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    CursorMoved { line: u32, now_ms: u64 },
    ForwardSyncDue { now_ms: u64 },
    Inbound(InboundMessage),
    /// The rendering target could not take a dispatched page.
    RenderRejected { page: PageIndex },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    Post(OutboundMessage),
    RevealLine(SourceLine),
    Status(PreviewStatus),
    Log(LogRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    ScheduleForwardSync { delay_ms: u64 },
}

pub type SessionTransition = Transition<SessionEffect, SessionCommand>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewStatus {
    pub current_page: PageNumber,
    pub page_count: usize,
    pub page_size: PageSize,
    pub magnification: u32,
    pub dpi: u32,
}

impl fmt::Display for PreviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page {}/{} Size: {} Mag: {}% DPI: {}",
            self.current_page, self.page_count, self.page_size, self.magnification, self.dpi
        )
    }
}

#[derive(Debug)]
struct LoadedDocument {
    document: DecodedDocument,
    fonts: FontSet,
    trace: Option<String>,
    index: Option<SyncIndex>,
}

#[derive(Debug)]
pub struct PreviewSession {
    config: PreviewConfig,
    layout: PageLayout,
    loaded: Option<LoadedDocument>,
    source: Option<PathBuf>,
    cache: GlyphPathCache,
    scheduler: RenderScheduler,
    mapper: PositionMapper,
    throttle: ForwardSyncThrottle,
    current_page: PageIndex,
    generation: u64,
}

impl PreviewSession {
    pub fn new(config: PreviewConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            layout: config.layout(),
            loaded: None,
            source: None,
            cache: GlyphPathCache::default(),
            scheduler: RenderScheduler::new(0, config.page_buffer_size),
            mapper: PositionMapper::default(),
            throttle: ForwardSyncThrottle::new(config.sync_interval_ms),
            current_page: PageIndex::new(0),
            generation: 0,
            config,
        })
    }

    pub const fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub const fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Number of generations loaded so far, failed ones excluded.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn document(&self) -> Option<&DecodedDocument> {
        self.loaded.as_ref().map(|loaded| &loaded.document)
    }

    pub fn sync_index(&self) -> Option<&SyncIndex> {
        self.loaded.as_ref().and_then(|loaded| loaded.index.as_ref())
    }

    pub const fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub const fn glyph_cache(&self) -> &GlyphPathCache {
        &self.cache
    }

    /// `<stem>.json` next to the source, with the document to write there.
    pub fn export_target(&self) -> Option<(PathBuf, &DecodedDocument)> {
        let source = self.source.as_ref()?;
        let document = self.document()?;
        Some((source.with_extension("json"), document))
    }

    pub fn status(&self) -> Option<PreviewStatus> {
        let loaded = self.loaded.as_ref()?;
        Some(PreviewStatus {
            current_page: self.current_page.number(),
            page_count: loaded.document.page_count(),
            page_size: self.config.page_size,
            magnification: self.config.magnification,
            dpi: self.config.dpi,
        })
    }

    fn debug(&self, transition: &mut SessionTransition, message: impl FnOnce() -> String) {
        if self.config.debug_mode {
            transition.push_effect(SessionEffect::Log(LogRecord::debug(message())));
        }
    }

    /// Replace the document. Render and sync state of the previous
    /// generation is discarded; the glyph cache survives unless the source
    /// file changed.
    pub fn load_generation(&mut self, generation: Generation) -> SessionTransition {
        let mut transition = SessionTransition::default();
        let Generation {
            source,
            document,
            fonts,
            trace,
        } = generation;

        if self
            .source
            .as_ref()
            .is_some_and(|previous| *previous != source)
        {
            self.cache.clear();
            transition.push_effect(SessionEffect::Post(OutboundMessage::ResetGlyphBitmaps {}));
        }
        self.generation = self.generation.wrapping_add(1);
        let generation_number = self.generation;
        self.debug(&mut transition, || {
            format!(
                "Generation {generation_number}: {} pages, {} of {} fonts loaded",
                document.page_count(),
                fonts.len(),
                document.fonts.len()
            )
        });
        if self.config.debug_mode {
            for font in &document.fonts {
                let state = if fonts.contains(font.font_num) {
                    "loaded"
                } else {
                    "missing"
                };
                transition.push_effect(SessionEffect::Log(LogRecord::debug(format!(
                    "Font {}: {} ({}) {state}",
                    font.font_num, font.font_name, font.font_path
                ))));
            }
        }

        self.source = Some(source);
        self.loaded = Some(LoadedDocument {
            document,
            fonts,
            trace,
            index: None,
        });
        transition.merge(self.present());
        transition
    }

    /// Abandon the current generation after a compile or decode failure.
    pub fn fail_generation(&mut self, error: &GenerationError) -> SessionTransition {
        self.loaded = None;
        self.scheduler.reset(0);
        self.mapper.reset();
        self.throttle.reset();
        self.current_page = PageIndex::new(0);
        Transition::with_effect(SessionEffect::Log(LogRecord::error(format!(
            "Document generation failed: {error}"
        ))))
    }

    /// Apply new settings. A layout change re-presents the loaded document.
    pub fn configure(&mut self, config: PreviewConfig) -> Result<SessionTransition, ConfigError> {
        config.validate()?;
        let relayout = config.dpi != self.config.dpi
            || config.magnification != self.config.magnification
            || config.layout() != self.layout;
        self.scheduler.set_buffer_size(config.page_buffer_size);
        self.throttle.set_interval(config.sync_interval_ms);
        self.layout = config.layout();
        self.config = config;
        if relayout {
            return Ok(self.present());
        }
        Ok(self
            .status()
            .map(|status| Transition::with_effect(SessionEffect::Status(status)))
            .unwrap_or_default())
    }

    pub fn adjust_magnification(&mut self, delta: i32) -> SessionTransition {
        let mut config = self.config.clone();
        config.adjust_magnification(delta);
        self.configure(config).unwrap_or_default()
    }

    /// Index the trace, lay out the canvas and start rendering from the top.
    fn present(&mut self) -> SessionTransition {
        let mut transition = SessionTransition::default();
        let Some(loaded) = self.loaded.as_mut() else {
            return transition;
        };
        self.scheduler.reset(loaded.document.page_count());
        self.mapper.reset();
        self.throttle.reset();
        self.current_page = PageIndex::new(0);

        let source = self.source.as_deref().unwrap_or_else(|| Path::new(""));
        let (index, record) = build_index(loaded.trace.as_deref(), source, &self.config, &self.layout);
        if let Some(record) = record {
            transition.push_effect(SessionEffect::Log(record));
        }
        let page_count = loaded.document.page_count();
        let block_count = index.as_ref().map_or(0, SyncIndex::len);
        loaded.index = index;

        self.debug(&mut transition, || format!("Indexed {block_count} sync blocks"));
        transition.push_effect(SessionEffect::Post(OutboundMessage::InitCanvas {
            page_count,
            margin_pixels: self.layout.margin_pixels,
            page_width: self.layout.page_width,
            page_height: self.layout.page_height,
            page_gap: self.layout.page_gap,
        }));
        let first = self.scheduler.render_from(0, ScrollDirection::Forward);
        self.dispatch(first, &mut transition);
        if let Some(status) = self.status() {
            transition.push_effect(SessionEffect::Status(status));
        }
        transition
    }

    /// Resolve glyphs and post `page`, chaining through the queue past pages
    /// that fail to resolve.
    fn dispatch(&mut self, first: Option<PageIndex>, transition: &mut SessionTransition) {
        let mut next = first;
        while let Some(page) = next {
            next = None;
            let Some(loaded) = self.loaded.as_ref() else {
                return;
            };
            let Some(page_source) = loaded.document.page(page) else {
                self.scheduler.fail(page);
                next = self.scheduler.pop_next();
                continue;
            };
            match glyphs::resolve(page_source, &loaded.fonts, &mut self.cache) {
                Ok(page_glyphs) => {
                    let glyph_count = page_glyphs.len();
                    transition.push_effect(SessionEffect::Post(OutboundMessage::RenderPage {
                        page_index: page,
                        page_source: Arc::clone(page_source),
                        page_glyphs,
                    }));
                    self.debug(transition, || {
                        format!("Dispatched page {} with {glyph_count} glyphs", page.number())
                    });
                }
                Err(err) => {
                    self.scheduler.fail(page);
                    transition.push_effect(SessionEffect::Log(LogRecord::warn(format!(
                        "Page {} failed to render: {err}",
                        page.number()
                    ))));
                    next = self.scheduler.pop_next();
                }
            }
        }
    }

    fn forward_sync(&mut self, line: u32) -> SessionTransition {
        let mut transition = SessionTransition::default();
        let Some(loaded) = self.loaded.as_ref() else {
            return transition;
        };
        let outcome = self
            .mapper
            .forward(loaded.index.as_ref(), line, &self.layout, self.config.dpi);
        match outcome {
            ForwardOutcome::Scroll(target) => {
                let first = self.scheduler.render_from(target.page, target.direction);
                self.dispatch(first, &mut transition);
                transition.push_effect(SessionEffect::Post(OutboundMessage::Scroll {
                    v_pos: target.v_pos,
                }));
            }
            ForwardOutcome::Suppressed => {}
            ForwardOutcome::NoMatch => {
                self.debug(&mut transition, || format!("No rendered position for line {line}"));
            }
        }
        transition
    }

    fn reverse_sync(&mut self, scroll_y: f64) -> SessionTransition {
        let mut transition = SessionTransition::default();
        let Some(loaded) = self.loaded.as_ref() else {
            return transition;
        };
        let scroll_y = round_half_up(scroll_y) as i64;
        let outcome = self
            .mapper
            .reverse(loaded.index.as_ref(), scroll_y, &self.layout, self.config.dpi);
        let ReverseOutcome::Moved {
            page,
            direction,
            line,
            ..
        } = outcome
        else {
            return transition;
        };
        let last_page = loaded.document.page_count().saturating_sub(1);
        let clamped = usize::try_from(page).unwrap_or(0).min(last_page);
        self.current_page = PageIndex::new(clamped);
        if let Some(status) = self.status() {
            transition.push_effect(SessionEffect::Status(status));
        }
        let first = self.scheduler.render_from(page, direction);
        self.dispatch(first, &mut transition);
        if let Some(line) = line {
            transition.push_effect(SessionEffect::RevealLine(line));
        }
        transition
    }

    fn acknowledge(&mut self, page: PageIndex) -> SessionTransition {
        let mut transition = SessionTransition::default();
        let next = self.scheduler.acknowledge(page);
        self.dispatch(next, &mut transition);
        transition
    }

    fn reject(&mut self, page: PageIndex) -> SessionTransition {
        let mut transition = SessionTransition::default();
        if !self.scheduler.fail(page) {
            return transition;
        }
        transition.push_effect(SessionEffect::Log(LogRecord::warn(format!(
            "Rendering target rejected page {}",
            page.number()
        ))));
        let next = self.scheduler.pop_next();
        self.dispatch(next, &mut transition);
        transition
    }
}

fn build_index(
    trace: Option<&str>,
    source: &Path,
    config: &PreviewConfig,
    layout: &PageLayout,
) -> (Option<SyncIndex>, Option<LogRecord>) {
    let Some(trace) = trace else {
        return (
            None,
            Some(LogRecord::warn(
                "No synctex file found. Scroll synchronization will be unavailable.",
            )),
        );
    };
    match SyncIndex::build(trace, source, config.dpi, config.magnification, layout.stride()) {
        Ok(index) => (Some(index), None),
        Err(err) => (
            None,
            Some(LogRecord::error(format!(
                "Synctex parsing failed, scroll synchronization is unavailable: {err}"
            ))),
        ),
    }
}

impl Machine for PreviewSession {
    type Event = SessionEvent;
    type Effect = SessionEffect;
    type Command = SessionCommand;

    fn reduce(&mut self, event: SessionEvent) -> SessionTransition {
        match event {
            SessionEvent::CursorMoved { line, now_ms } => {
                match self.throttle.on_line(line, now_ms) {
                    ThrottleDecision::Fire(line) => self.forward_sync(line),
                    ThrottleDecision::Schedule { delay_ms } => {
                        Transition::with_command(SessionCommand::ScheduleForwardSync { delay_ms })
                    }
                    ThrottleDecision::Coalesced => SessionTransition::default(),
                }
            }
            SessionEvent::ForwardSyncDue { now_ms } => self
                .throttle
                .on_timer(now_ms)
                .map(|line| self.forward_sync(line))
                .unwrap_or_default(),
            SessionEvent::Inbound(InboundMessage::PageRendered { page_index }) => {
                self.acknowledge(page_index)
            }
            SessionEvent::Inbound(InboundMessage::WebviewScrolled { scroll_y }) => {
                self.reverse_sync(scroll_y)
            }
            SessionEvent::RenderRejected { page } => self.reject(page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{GlyphPlacement, GlyphSize, PageFont, PageFontGlyph, PageSource};
    use crate::glyphs::test_fonts::SquareFont;
    use crate::logging::LogLevel;
    use crate::scheduler::PageRenderState;
    use pretty_assertions::assert_eq;
    use serde_json::Map;
    use texsync_support::state_machine::apply_event;
    use texsync_support::{FontNumber, GlyphId};

    fn glyph_page(glyph: u32) -> Arc<PageSource> {
        Arc::new(PageSource {
            page_fonts: vec![PageFont {
                font_num: FontNumber::from(1),
                glyphs: vec![PageFontGlyph {
                    glyph_index: GlyphId::from(glyph),
                    glyph_sizes: vec![GlyphSize {
                        sz: 20.0,
                        glyph_placements: vec![GlyphPlacement { x: 10.0, y: 20.0 }],
                    }],
                }],
            }],
            ..PageSource::default()
        })
    }

    fn generation(source: &str, pages: Vec<Arc<PageSource>>) -> Generation {
        let mut fonts = FontSet::default();
        fonts.insert(FontNumber::from(1), Arc::new(SquareFont::default()));
        Generation {
            source: PathBuf::from(source),
            document: DecodedDocument {
                fonts: Vec::new(),
                pages,
                extra: Map::new(),
            },
            fonts,
            trace: Some("SyncTeX Version:1\n".to_string()),
        }
    }

    fn session() -> Result<PreviewSession, ConfigError> {
        PreviewSession::new(PreviewConfig::default())
    }

    fn posts(transition: &SessionTransition) -> Vec<&OutboundMessage> {
        transition
            .effects
            .iter()
            .filter_map(|effect| match effect {
                SessionEffect::Post(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn rendered_pages(transition: &SessionTransition) -> Vec<usize> {
        posts(transition)
            .into_iter()
            .filter_map(|message| match message {
                OutboundMessage::RenderPage { page_index, .. } => Some(page_index.raw()),
                _ => None,
            })
            .collect()
    }

    fn logs(transition: &SessionTransition, level: LogLevel) -> Vec<&str> {
        transition
            .effects
            .iter()
            .filter_map(|effect| match effect {
                SessionEffect::Log(record) if record.level == level => {
                    Some(record.message.as_str())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn loading_initialises_the_canvas_and_renders_the_first_page() -> Result<(), ConfigError> {
        let mut session = session()?;
        let transition = session.load_generation(generation("/work/doc.tex", vec![glyph_page(36)]));

        let messages = posts(&transition);
        assert!(matches!(
            messages.first(),
            Some(OutboundMessage::InitCanvas { page_count: 1, page_height: 1122, .. })
        ));
        assert_eq!(rendered_pages(&transition), vec![0]);
        assert_eq!(session.glyph_cache().len(), 1);
        assert!(matches!(transition.effects.last(), Some(SessionEffect::Status(_))));
        Ok(())
    }

    #[test]
    fn regenerating_the_same_source_keeps_the_glyph_cache() -> Result<(), ConfigError> {
        let mut session = session()?;
        session.load_generation(generation("/work/doc.tex", vec![glyph_page(36)]));
        let transition = session.load_generation(generation("/work/doc.tex", vec![glyph_page(36)]));

        assert!(!posts(&transition).contains(&&OutboundMessage::ResetGlyphBitmaps {}));
        assert_eq!(session.glyph_cache().len(), 1);
        assert_eq!(session.generation(), 2);
        Ok(())
    }

    #[test]
    fn switching_source_resets_glyph_bitmaps() -> Result<(), ConfigError> {
        let mut session = session()?;
        session.load_generation(generation("/work/doc.tex", vec![glyph_page(36)]));
        let transition =
            session.load_generation(generation("/work/other.tex", vec![glyph_page(37)]));

        assert_eq!(
            posts(&transition).first(),
            Some(&&OutboundMessage::ResetGlyphBitmaps {})
        );
        assert_eq!(session.glyph_cache().len(), 1);
        Ok(())
    }

    #[test]
    fn missing_trace_degrades_to_a_warning() -> Result<(), ConfigError> {
        let mut session = session()?;
        let mut input = generation("/work/doc.tex", vec![glyph_page(36)]);
        input.trace = None;
        let transition = session.load_generation(input);

        assert_eq!(
            logs(&transition, LogLevel::Warn),
            vec!["No synctex file found. Scroll synchronization will be unavailable."]
        );
        assert_eq!(rendered_pages(&transition), vec![0]);
        assert!(session.sync_index().is_none());
        Ok(())
    }

    #[test]
    fn glyph_failure_retries_lazily_and_dispatches_the_next_page() -> Result<(), ConfigError> {
        let mut session = session()?;
        let transition = session.load_generation(generation(
            "/work/doc.tex",
            vec![glyph_page(99), glyph_page(36), glyph_page(36)],
        ));

        assert_eq!(rendered_pages(&transition), vec![1]);
        assert_eq!(logs(&transition, LogLevel::Warn).len(), 1);
        assert_eq!(
            session.scheduler().state(PageIndex::new(0)),
            Some(PageRenderState::Unrendered)
        );
        Ok(())
    }

    #[test]
    fn rejected_pages_fall_back_to_unrendered() -> Result<(), ConfigError> {
        let mut session = session()?;
        session.load_generation(generation("/work/doc.tex", vec![glyph_page(36); 3]));

        let transition = apply_event(
            &mut session,
            SessionEvent::RenderRejected {
                page: PageIndex::new(0),
            },
        );
        assert_eq!(rendered_pages(&transition), vec![1]);
        assert_eq!(
            session.scheduler().state(PageIndex::new(0)),
            Some(PageRenderState::Unrendered)
        );

        let ignored = apply_event(
            &mut session,
            SessionEvent::RenderRejected {
                page: PageIndex::new(0),
            },
        );
        assert!(ignored.is_empty());
        Ok(())
    }

    #[test]
    fn failed_generation_drops_the_document() -> Result<(), ConfigError> {
        let mut session = session()?;
        session.load_generation(generation("/work/doc.tex", vec![glyph_page(36)]));
        let transition = session.fail_generation(&GenerationError::Toolchain {
            output: "! Undefined control sequence.".to_string(),
        });

        assert_eq!(
            logs(&transition, LogLevel::Error),
            vec!["Document generation failed: toolchain failed:\n! Undefined control sequence."]
        );
        assert!(session.document().is_none());
        assert!(session.status().is_none());
        let ack = apply_event(
            &mut session,
            SessionEvent::Inbound(InboundMessage::PageRendered {
                page_index: PageIndex::new(0),
            }),
        );
        assert!(ack.is_empty());
        Ok(())
    }

    #[test]
    fn status_line_text() -> Result<(), ConfigError> {
        let mut session = session()?;
        assert!(session.status().is_none());
        session.load_generation(generation("/work/doc.tex", vec![glyph_page(36); 12]));
        let status = session.status().map(|status| status.to_string());
        assert_eq!(status.as_deref(), Some("Page 1/12 Size: A4 Mag: 100% DPI: 96"));
        Ok(())
    }

    #[test]
    fn invalid_configuration_is_rejected() -> Result<(), ConfigError> {
        let zero_dpi = PreviewConfig {
            dpi: 0,
            ..PreviewConfig::default()
        };
        assert_eq!(PreviewSession::new(zero_dpi.clone()).err(), Some(ConfigError::ZeroDpi));
        let mut session = session()?;
        assert_eq!(session.configure(zero_dpi).err(), Some(ConfigError::ZeroDpi));
        assert_eq!(session.config().dpi, 96);
        Ok(())
    }

    #[test]
    fn magnification_change_re_presents_the_document() -> Result<(), ConfigError> {
        let mut session = session()?;
        session.load_generation(generation("/work/doc.tex", vec![glyph_page(36); 2]));
        let transition = session.adjust_magnification(10);

        assert_eq!(session.config().magnification, 110);
        assert!(matches!(
            posts(&transition).first(),
            Some(OutboundMessage::InitCanvas { margin_pixels: 105, .. })
        ));
        assert_eq!(rendered_pages(&transition), vec![0]);
        Ok(())
    }

    #[test]
    fn debug_mode_reports_the_font_inventory() -> Result<(), ConfigError> {
        let mut session = PreviewSession::new(PreviewConfig {
            debug_mode: true,
            ..PreviewConfig::default()
        })?;
        let mut input = generation("/work/doc.tex", vec![glyph_page(36)]);
        input.document.fonts = vec![
            crate::document::FontDescriptor {
                font_num: FontNumber::from(1),
                font_name: "cmr10.otf".to_string(),
                font_path: "/fonts".to_string(),
            },
            crate::document::FontDescriptor {
                font_num: FontNumber::from(2),
                font_name: "cmmi10.otf".to_string(),
                font_path: "/fonts".to_string(),
            },
        ];
        let transition = session.load_generation(input);
        let debug = logs(&transition, LogLevel::Debug);

        assert!(debug.contains(&"Font 1: cmr10.otf (/fonts) loaded"));
        assert!(debug.contains(&"Font 2: cmmi10.otf (/fonts) missing"));
        Ok(())
    }

    #[test]
    fn export_target_sits_next_to_the_source() -> Result<(), ConfigError> {
        let mut session = session()?;
        assert!(session.export_target().is_none());
        session.load_generation(generation("/work/doc.tex", vec![glyph_page(36)]));
        let target = session.export_target().map(|(path, _)| path);
        assert_eq!(target, Some(PathBuf::from("/work/doc.json")));
        Ok(())
    }
}
