//! Bidirectional index between source lines and rendered page coordinates,
//! built from the typesetting toolchain's positional trace.

mod record;

use crate::error::SyncIndexError;
use crate::round_half_up;
use record::{Axis, TraceRecord, parse_record};
use std::path::Path;
use texsync_support::path::{normalize_against, normalize_path};
use texsync_support::{PageNumber, SourceLine};

/// Native trace units per device pixel at 72 dpi and 100% magnification.
const NATIVE_UNITS_PER_POINT: f64 = 65_781.76;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    HorizontalBox,
    Glue,
}

/// One retained trace record, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionBlock {
    pub kind: BlockKind,
    pub page: PageNumber,
    pub source_line: SourceLine,
    pub left: i64,
    pub bottom: i64,
    pub width: i64,
    pub height: i64,
    pub depth: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceOffset {
    pub x: i64,
    pub y: i64,
}

impl TraceOffset {
    /// Vertical origin used for mapping; an undeclared offset falls back to
    /// one inch.
    pub fn y_or_dpi(self, dpi: u32) -> i64 {
        if self.y == 0 { i64::from(dpi) } else { self.y }
    }
}

/// Native-to-device conversion for one dpi/magnification pair.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TraceScale {
    unit: f64,
}

impl TraceScale {
    fn new(dpi: u32, magnification: u32) -> Result<Self, SyncIndexError> {
        let unit = NATIVE_UNITS_PER_POINT
            * (72.0 / f64::from(dpi))
            * (100.0 / f64::from(magnification));
        if !unit.is_finite() || unit <= 0.0 {
            return Err(SyncIndexError::InvalidScale { dpi, magnification });
        }
        Ok(Self { unit })
    }

    fn to_device(self, native: i64) -> i64 {
        round_half_up(native as f64 / self.unit) as i64
    }
}

/// Parsed trace for one source file.
///
/// Blocks are stored once; `by_line` and `by_position` are index views over
/// the same set, so re-sorting never touches a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncIndex {
    offset: TraceOffset,
    page_stride: i64,
    blocks: Vec<PositionBlock>,
    by_line: Vec<usize>,
    by_position: Vec<usize>,
}

impl SyncIndex {
    /// Parse `trace` and keep only blocks attributed to `source`.
    ///
    /// Malformed lines are skipped. `page_stride` is the page height plus
    /// gap, used for the position ordering.
    pub fn build(
        trace: &str,
        source: &Path,
        dpi: u32,
        magnification: u32,
        page_stride: i64,
    ) -> Result<Self, SyncIndexError> {
        let scale = TraceScale::new(dpi, magnification)?;
        let source_name = source.to_string_lossy();
        let target = normalize_path(&source_name);
        let base_dir = source.parent().unwrap_or_else(|| Path::new(""));

        let mut offset = TraceOffset::default();
        let mut blocks = Vec::new();
        let mut current_page: Option<PageNumber> = None;
        let mut source_tag: Option<u32> = None;

        // The first line is the version banner.
        for line in trace.lines().skip(1) {
            let line = line.trim_end_matches('\r');
            let Some(record) = parse_record(line) else {
                continue;
            };
            match record {
                TraceRecord::Input { tag, path } => {
                    if target.is_some() && normalize_against(base_dir, path) == target {
                        source_tag = Some(tag);
                    }
                }
                TraceRecord::Offset { axis, value } => match axis {
                    Axis::X => offset.x = scale.to_device(value),
                    Axis::Y => offset.y = scale.to_device(value),
                },
                TraceRecord::PageOpen(page) => current_page = PageNumber::try_new(page),
                TraceRecord::PageClose => current_page = None,
                TraceRecord::HorizontalBox(fields) => {
                    let (Some(page), Some(source_line)) =
                        (current_page, SourceLine::try_new(fields.line))
                    else {
                        continue;
                    };
                    if source_tag != Some(fields.tag) {
                        continue;
                    }
                    let block = PositionBlock {
                        kind: BlockKind::HorizontalBox,
                        page,
                        source_line,
                        left: scale.to_device(fields.left),
                        bottom: scale.to_device(fields.bottom),
                        width: scale.to_device(fields.width),
                        height: scale.to_device(fields.height),
                        depth: scale.to_device(fields.depth),
                    };
                    if block.width != 0 && block.height != 0 {
                        blocks.push(block);
                    }
                }
                TraceRecord::VerticalBox(_) => {}
                TraceRecord::Element {
                    kind: 'g',
                    tag,
                    line,
                    left,
                    bottom,
                    extra,
                } => {
                    let (Some(page), Some(source_line)) = (current_page, SourceLine::try_new(line))
                    else {
                        continue;
                    };
                    if source_tag != Some(tag) {
                        continue;
                    }
                    blocks.push(PositionBlock {
                        kind: BlockKind::Glue,
                        page,
                        source_line,
                        left: scale.to_device(left),
                        bottom: scale.to_device(bottom),
                        width: extra.map_or(0, |width| scale.to_device(width)),
                        height: 0,
                        depth: 0,
                    });
                }
                TraceRecord::Element { .. } => {}
            }
        }

        Ok(Self::from_blocks(offset, blocks, page_stride))
    }

    fn from_blocks(offset: TraceOffset, blocks: Vec<PositionBlock>, page_stride: i64) -> Self {
        let mut by_line: Vec<usize> = (0..blocks.len()).collect();
        by_line.sort_by_key(|&idx| blocks[idx].source_line);
        // Stable over the line order, so equal positions resolve to the
        // lowest line first.
        let mut by_position = by_line.clone();
        by_position.sort_by_key(|&idx| position_key(&blocks[idx], page_stride));
        Self {
            offset,
            page_stride,
            blocks,
            by_line,
            by_position,
        }
    }

    pub const fn offset(&self) -> TraceOffset {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks_by_line(&self) -> impl Iterator<Item = &PositionBlock> {
        self.by_line.iter().map(|&idx| &self.blocks[idx])
    }

    pub fn blocks_by_position(&self) -> impl Iterator<Item = &PositionBlock> {
        self.by_position.iter().map(|&idx| &self.blocks[idx])
    }

    /// Blocks attributed to `line`, in trace emission order.
    pub fn blocks_on_line(&self, line: SourceLine) -> impl Iterator<Item = &PositionBlock> {
        let start = self
            .by_line
            .partition_point(|&idx| self.blocks[idx].source_line < line);
        self.by_line[start..]
            .iter()
            .map(|&idx| &self.blocks[idx])
            .take_while(move |block| block.source_line == line)
    }

    /// First block, in position order, sitting exactly at `bottom` on `page`.
    pub fn block_at(&self, page: PageNumber, bottom: i64) -> Option<&PositionBlock> {
        let key = composite_key(page, bottom, self.page_stride);
        let start = self
            .by_position
            .partition_point(|&idx| position_key(&self.blocks[idx], self.page_stride) < key);
        self.by_position[start..]
            .iter()
            .map(|&idx| &self.blocks[idx])
            .take_while(|block| position_key(block, self.page_stride) == key)
            .find(|block| block.page == page && block.bottom == bottom)
    }
}

fn composite_key(page: PageNumber, bottom: i64, page_stride: i64) -> i64 {
    i64::try_from(page.raw())
        .map_or(i64::MAX, |page| page.saturating_mul(page_stride))
        .saturating_add(bottom)
}

fn position_key(block: &PositionBlock, page_stride: i64) -> i64 {
    composite_key(block.page, block.bottom, page_stride)
}
