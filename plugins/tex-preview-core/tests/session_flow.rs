use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Map;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use texsync_core::document::{GlyphPlacement, GlyphSize, PageFont, PageFontGlyph, PageSource};
use texsync_core::error::GlyphError;
use texsync_core::glyphs::{FontSet, GlyphBounds, GlyphFont, GlyphMetrics, OutlineSink};
use texsync_core::protocol::{InboundMessage, OutboundMessage};
use texsync_core::{
    ConfigError, DecodedDocument, Generation, PreviewConfig, PreviewSession, SessionCommand,
    SessionEffect, SessionEvent, SessionTransition,
};
use texsync_support::state_machine::apply_event;
use texsync_support::{FontNumber, GlyphId, PageIndex};

// Offsets of 100 px; boxes 300x25 px. One device pixel is 49336.32 units.
const TRACE: &str = "SyncTeX Version:1\n\
    Input:1:/work/doc.tex\n\
    Input:2:/usr/share/texmf/article.cls\n\
    X Offset:4933632\n\
    Y Offset:4933632\n\
    {1\n\
    (1,5:2466816,9867264:14800896,1233408,0\n\
    (1,5:1233408,19734528:14800896,1233408,0\n\
    (2,5:1233408,24668160:14800896,1233408,0\n\
    g1,7:1233408,4933632\n\
    g1,7:1233408,9867264\n\
    }1\n\
    {2\n\
    (1,9:2466816,4933632:14800896,1233408,0\n\
    }2\n";

/// Triangle outlines at 1000 units per em.
#[derive(Debug, Default)]
struct TriangleFont {
    outlines: AtomicUsize,
}

impl GlyphFont for TriangleFont {
    fn units_per_em(&self) -> Option<u16> {
        Some(1000)
    }

    fn glyph_metrics(&self, _glyph: GlyphId) -> Option<GlyphMetrics> {
        Some(GlyphMetrics {
            left_side_bearing: 0.0,
            bounds: GlyphBounds {
                x_min: 0.0,
                y_min: 0.0,
                x_max: 500.0,
                y_max: 500.0,
            },
        })
    }

    fn outline(&self, _glyph: GlyphId, sink: &mut dyn OutlineSink) -> Result<(), GlyphError> {
        self.outlines.fetch_add(1, Ordering::SeqCst);
        sink.move_to(0.0, 0.0);
        sink.line_to(500.0, 0.0);
        sink.line_to(250.0, 500.0);
        sink.close();
        Ok(())
    }
}

fn page() -> Arc<PageSource> {
    Arc::new(PageSource {
        page_fonts: vec![PageFont {
            font_num: FontNumber::from(1),
            glyphs: vec![PageFontGlyph {
                glyph_index: GlyphId::from(65),
                glyph_sizes: vec![GlyphSize {
                    sz: 10.0,
                    glyph_placements: vec![GlyphPlacement { x: 96.0, y: 120.0 }],
                }],
            }],
        }],
        ..PageSource::default()
    })
}

fn generation(font: Arc<TriangleFont>) -> Generation {
    let mut fonts = FontSet::default();
    fonts.insert(FontNumber::from(1), font);
    Generation {
        source: PathBuf::from("/work/doc.tex"),
        document: DecodedDocument {
            fonts: Vec::new(),
            pages: vec![page(); 4],
            extra: Map::new(),
        },
        fonts,
        trace: Some(TRACE.to_string()),
    }
}

fn loaded_session() -> Result<(PreviewSession, SessionTransition), ConfigError> {
    let mut session = PreviewSession::new(PreviewConfig::default())?;
    let transition = session.load_generation(generation(Arc::default()));
    Ok((session, transition))
}

fn rendered_pages(transition: &SessionTransition) -> Vec<usize> {
    transition
        .effects
        .iter()
        .filter_map(|effect| match effect {
            SessionEffect::Post(OutboundMessage::RenderPage { page_index, .. }) => {
                Some(page_index.raw())
            }
            _ => None,
        })
        .collect()
}

fn scroll_targets(transition: &SessionTransition) -> Vec<i64> {
    transition
        .effects
        .iter()
        .filter_map(|effect| match effect {
            SessionEffect::Post(OutboundMessage::Scroll { v_pos }) => Some(*v_pos),
            _ => None,
        })
        .collect()
}

fn revealed_lines(transition: &SessionTransition) -> Vec<u32> {
    transition
        .effects
        .iter()
        .filter_map(|effect| match effect {
            SessionEffect::RevealLine(line) => Some(line.raw()),
            _ => None,
        })
        .collect()
}

fn cursor(session: &mut PreviewSession, line: u32, now_ms: u64) -> SessionTransition {
    apply_event(session, SessionEvent::CursorMoved { line, now_ms })
}

fn scrolled(session: &mut PreviewSession, scroll_y: f64) -> SessionTransition {
    apply_event(
        session,
        SessionEvent::Inbound(InboundMessage::WebviewScrolled { scroll_y }),
    )
}

fn rendered(session: &mut PreviewSession, page: usize) -> SessionTransition {
    apply_event(
        session,
        SessionEvent::Inbound(InboundMessage::PageRendered {
            page_index: PageIndex::new(page),
        }),
    )
}

#[test]
fn acknowledgements_chain_through_the_prefetch_window() -> Result<(), ConfigError> {
    let (mut session, transition) = loaded_session()?;
    assert_eq!(rendered_pages(&transition), vec![0]);
    assert_eq!(
        session.scheduler().queued(),
        &[PageIndex::new(2), PageIndex::new(1)]
    );

    assert_eq!(rendered_pages(&rendered(&mut session, 0)), vec![1]);
    assert_eq!(rendered_pages(&rendered(&mut session, 1)), vec![2]);
    assert!(rendered(&mut session, 2).is_empty());
    // Duplicate acknowledgement.
    assert!(rendered(&mut session, 2).is_empty());
    Ok(())
}

#[test]
fn glyph_paths_are_shared_across_pages() -> Result<(), ConfigError> {
    let font = Arc::new(TriangleFont::default());
    let mut session = PreviewSession::new(PreviewConfig::default())?;
    let transition = session.load_generation(generation(Arc::clone(&font)));
    rendered(&mut session, 0);
    rendered(&mut session, 1);

    assert_eq!(font.outlines.load(Ordering::SeqCst), 1);
    let first_glyph = transition.effects.iter().find_map(|effect| match effect {
        SessionEffect::Post(OutboundMessage::RenderPage { page_glyphs, .. }) => {
            page_glyphs.first().map(|glyph| glyph.glyph_path.path.clone())
        }
        _ => None,
    });
    // scale 0.01, baseline ceil(5) = 5
    assert_eq!(first_glyph.as_deref(), Some("M0 5L5 5L2.50 0Z"));
    Ok(())
}

#[rstest]
#[case(5, 475)]
#[case(7, 285)]
#[case(9, 1297)]
#[case(1, 0)]
fn cursor_lines_scroll_to_their_rendered_position(
    #[case] line: u32,
    #[case] expected: i64,
) -> Result<(), ConfigError> {
    let (mut session, _) = loaded_session()?;
    assert_eq!(scroll_targets(&cursor(&mut session, line, 1_000)), vec![expected]);
    Ok(())
}

#[test]
fn lines_of_other_inputs_do_not_sync() -> Result<(), ConfigError> {
    let (mut session, _) = loaded_session()?;
    // The class file's box on line 5 is not indexed.
    assert_eq!(session.sync_index().map(texsync_core::synctex::SyncIndex::len), Some(5));
    assert!(scroll_targets(&cursor(&mut session, 6, 1_000)).is_empty());
    Ok(())
}

#[rstest]
#[case(1322.0, Some(9))]
#[case(1329.6, Some(9))]
#[case(300.0, Some(5))]
#[case(50.0, None)]
fn scroll_positions_reveal_their_source_line(
    #[case] scroll_y: f64,
    #[case] expected: Option<u32>,
) -> Result<(), ConfigError> {
    let (mut session, _) = loaded_session()?;
    let transition = scrolled(&mut session, scroll_y);
    assert_eq!(revealed_lines(&transition), expected.into_iter().collect::<Vec<_>>());
    Ok(())
}

#[test]
fn reverse_sync_updates_the_status_page() -> Result<(), ConfigError> {
    let (mut session, _) = loaded_session()?;
    let transition = scrolled(&mut session, 1322.0);
    let status = transition.effects.iter().find_map(|effect| match effect {
        SessionEffect::Status(status) => Some(status.to_string()),
        _ => None,
    });
    assert_eq!(status.as_deref(), Some("Page 2/4 Size: A4 Mag: 100% DPI: 96"));
    // Same position again is ignored.
    assert!(scrolled(&mut session, 1322.0).is_empty());
    Ok(())
}

#[test]
fn forward_scroll_does_not_move_the_cursor_back() -> Result<(), ConfigError> {
    let (mut session, _) = loaded_session()?;
    let forward = cursor(&mut session, 9, 1_000);
    assert_eq!(rendered_pages(&forward), vec![1]);
    assert_eq!(scroll_targets(&forward), vec![1297]);

    // The target echoes the scroll it was told to perform.
    let echo = scrolled(&mut session, 1297.0);
    assert!(revealed_lines(&echo).is_empty());

    // A genuine scroll afterwards syncs again.
    assert_eq!(revealed_lines(&scrolled(&mut session, 1322.0)), vec![9]);
    Ok(())
}

#[test]
fn reveal_does_not_scroll_the_preview_back() -> Result<(), ConfigError> {
    let (mut session, _) = loaded_session()?;
    assert_eq!(revealed_lines(&scrolled(&mut session, 300.0)), vec![5]);
    // The editor reports the cursor landing on the revealed line.
    assert!(scroll_targets(&cursor(&mut session, 5, 1_000)).is_empty());
    assert_eq!(scroll_targets(&cursor(&mut session, 9, 2_000)), vec![1297]);
    Ok(())
}

#[test]
fn rapid_cursor_moves_coalesce_to_the_last_line() -> Result<(), ConfigError> {
    let (mut session, _) = loaded_session()?;
    assert_eq!(scroll_targets(&cursor(&mut session, 5, 1_000)), vec![475]);

    let deferred = cursor(&mut session, 7, 1_010);
    assert_eq!(
        deferred.command,
        Some(SessionCommand::ScheduleForwardSync { delay_ms: 40 })
    );
    assert!(cursor(&mut session, 9, 1_020).is_empty());

    let flushed = apply_event(&mut session, SessionEvent::ForwardSyncDue { now_ms: 1_050 });
    assert_eq!(scroll_targets(&flushed), vec![1297]);
    assert!(apply_event(&mut session, SessionEvent::ForwardSyncDue { now_ms: 1_060 }).is_empty());
    Ok(())
}

#[test]
fn regeneration_discards_stale_acknowledgements() -> Result<(), ConfigError> {
    let (mut session, _) = loaded_session()?;
    let mut shorter = generation(Arc::default());
    shorter.document.pages.truncate(1);
    let transition = session.load_generation(shorter);

    assert_eq!(rendered_pages(&transition), vec![0]);
    assert!(session.scheduler().queued().is_empty());
    assert!(rendered(&mut session, 2).is_empty());
    assert!(rendered(&mut session, 0).is_empty());
    Ok(())
}
