//! Source line <-> rendered scroll position mapping.

use crate::config::PageLayout;
use crate::scheduler::ScrollDirection;
use crate::synctex::{BlockKind, PositionBlock, SyncIndex};
use nonempty::NonEmpty;
use texsync_support::{PageNumber, SourceLine};

/// Glue elements sit on the baseline; lift the target so the line shows.
const GLUE_BASELINE_BIAS: i64 = 15;
/// Glue fallback anchors on this element of the line's glue list.
const GLUE_ANCHOR: usize = 1;

/// Single-shot guards that stop the two sync directions feeding each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncLock {
    /// Set by a forward scroll; swallows the echoing reverse reveal.
    pub suppress_reverse: bool,
    /// Set by a reverse reveal; swallows the echoing forward scroll.
    pub suppress_forward: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollTarget {
    pub v_pos: i64,
    /// Zero-based page containing `v_pos`; may fall outside the document.
    pub page: i64,
    pub direction: ScrollDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    Scroll(ScrollTarget),
    Suppressed,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverseOutcome {
    Unchanged,
    Moved {
        page: i64,
        direction: ScrollDirection,
        /// `None` when no block matches or the lock swallowed the reveal.
        line: Option<SourceLine>,
        suppressed: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PositionMapper {
    scroll_y: i64,
    lock: SyncLock,
}

impl PositionMapper {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub const fn lock(&self) -> SyncLock {
        self.lock
    }

    /// Map a cursor line to a scroll target and arm the reverse guard.
    pub fn forward(
        &mut self,
        index: Option<&SyncIndex>,
        line: u32,
        layout: &PageLayout,
        dpi: u32,
    ) -> ForwardOutcome {
        if self.lock.suppress_forward {
            self.lock.suppress_forward = false;
            return ForwardOutcome::Suppressed;
        }
        let v_pos = match SourceLine::try_new(line) {
            Some(line) if line.raw() > 1 => {
                let Some(index) = index else {
                    return ForwardOutcome::NoMatch;
                };
                let Some(v_pos) = forward_position(index, line, layout, dpi) else {
                    return ForwardOutcome::NoMatch;
                };
                v_pos
            }
            _ => 0,
        };
        self.lock.suppress_reverse = true;
        ForwardOutcome::Scroll(ScrollTarget {
            v_pos,
            page: layout.page_at(v_pos),
            direction: ScrollDirection::between(self.scroll_y, v_pos),
        })
    }

    /// Record a new scroll position and map it back to a source line.
    pub fn reverse(
        &mut self,
        index: Option<&SyncIndex>,
        scroll_y: i64,
        layout: &PageLayout,
        dpi: u32,
    ) -> ReverseOutcome {
        if scroll_y == self.scroll_y {
            return ReverseOutcome::Unchanged;
        }
        let direction = ScrollDirection::between(self.scroll_y, scroll_y);
        self.scroll_y = scroll_y;
        let page = layout.page_at(scroll_y);
        if self.lock.suppress_reverse {
            self.lock.suppress_reverse = false;
            return ReverseOutcome::Moved {
                page,
                direction,
                line: None,
                suppressed: true,
            };
        }
        let line = index.and_then(|index| line_at(index, scroll_y, layout, dpi));
        if line.is_some() {
            self.lock.suppress_forward = true;
        }
        ReverseOutcome::Moved {
            page,
            direction,
            line,
            suppressed: false,
        }
    }
}

fn page_top(block: &PositionBlock, layout: &PageLayout) -> i64 {
    let index = i64::try_from(block.page.index().raw()).unwrap_or(i64::MAX);
    layout.page_top(index)
}

/// Pick the scroll anchor among a line's boxes.
///
/// The leftmost box (first on ties) wins unless the bottommost box shares its
/// left edge, in which case the bottommost wins. A box only counts as
/// bottommost when its adjusted position is below the document top.
fn select_scroll_block<'a>(
    candidates: &NonEmpty<&'a PositionBlock>,
    vertical: impl Fn(&PositionBlock) -> i64,
) -> &'a PositionBlock {
    let leftmost = candidates
        .tail
        .iter()
        .copied()
        .fold(candidates.head, |best, block| {
            if block.left < best.left { block } else { best }
        });
    let bottommost = candidates
        .iter()
        .copied()
        .filter(|&block| vertical(block) > 0)
        .fold(None::<&PositionBlock>, |best, block| match best {
            Some(best) if vertical(block) <= vertical(best) => Some(best),
            _ => Some(block),
        });
    match bottommost {
        Some(bottom) if bottom.left == leftmost.left => bottom,
        _ => leftmost,
    }
}

/// Absolute vertical position for `line`, or `None` when the trace has no
/// usable anchor for it.
pub fn forward_position(
    index: &SyncIndex,
    line: SourceLine,
    layout: &PageLayout,
    dpi: u32,
) -> Option<i64> {
    let y_offset = index.offset().y_or_dpi(dpi);
    let boxes: Vec<&PositionBlock> = index
        .blocks_on_line(line)
        .filter(|block| block.kind == BlockKind::HorizontalBox)
        .collect();
    if !boxes.is_empty() {
        let usable = boxes
            .into_iter()
            .filter(|block| block.width > 0 && block.height > 0)
            .collect();
        let candidates = NonEmpty::from_vec(usable)?;
        let block = select_scroll_block(&candidates, |block| {
            y_offset
                .saturating_add(page_top(block, layout))
                .saturating_add(block.bottom)
        });
        return Some(
            y_offset
                .saturating_add(page_top(block, layout))
                .saturating_add(block.bottom.saturating_sub(block.height)),
        );
    }
    // Long lines broken into many fragments often carry no box of their own.
    let glue = index
        .blocks_on_line(line)
        .filter(|block| block.kind == BlockKind::Glue)
        .nth(GLUE_ANCHOR)?;
    Some(
        y_offset
            .saturating_add(page_top(glue, layout))
            .saturating_add(glue.bottom.saturating_sub(GLUE_BASELINE_BIAS)),
    )
}

/// Source line at an absolute scroll position.
///
/// Only exact `bottom` matches count; the search walks up the page one
/// pixel at a time and gives up at the page top.
pub fn line_at(
    index: &SyncIndex,
    scroll_y: i64,
    layout: &PageLayout,
    dpi: u32,
) -> Option<SourceLine> {
    let y_offset = index.offset().y_or_dpi(dpi);
    let page_index = layout.page_at(scroll_y);
    let page = usize::try_from(page_index.saturating_add(1))
        .ok()
        .and_then(PageNumber::try_new)?;
    let mut y = scroll_y.saturating_sub(layout.page_top(page_index).saturating_add(y_offset));
    loop {
        if let Some(block) = index.block_at(page, y) {
            return Some(block.source_line);
        }
        y -= 1;
        if y < 0 {
            return None;
        }
    }
}
