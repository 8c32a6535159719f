//! Windowed page render scheduling.
//!
//! Each page moves `Unrendered -> Queued -> Rendering -> Rendered`; a failed
//! render drops back to `Unrendered` and is retried the next time a prefetch
//! window covers it. The queue is a stack: the most recently enqueued page is
//! dispatched first.

use texsync_support::PageIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageRenderState {
    #[default]
    Unrendered,
    Queued,
    Rendering,
    Rendered,
}

impl PageRenderState {
    /// True when a page can still be requested.
    const fn is_pending(self) -> bool {
        matches!(self, Self::Unrendered | Self::Queued)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Backward,
    Still,
    Forward,
}

impl ScrollDirection {
    /// Direction of travel from `from` to `to`.
    pub fn between(from: i64, to: i64) -> Self {
        match from.cmp(&to) {
            std::cmp::Ordering::Less => Self::Forward,
            std::cmp::Ordering::Equal => Self::Still,
            std::cmp::Ordering::Greater => Self::Backward,
        }
    }

    pub const fn step(self) -> i64 {
        match self {
            Self::Backward => -1,
            Self::Still => 0,
            Self::Forward => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderScheduler {
    states: Vec<PageRenderState>,
    queue: Vec<PageIndex>,
    buffer_size: usize,
}

impl RenderScheduler {
    pub fn new(page_count: usize, buffer_size: usize) -> Self {
        Self {
            states: vec![PageRenderState::Unrendered; page_count],
            queue: Vec::new(),
            buffer_size,
        }
    }

    /// Forget every page and size the state table for a new document.
    pub fn reset(&mut self, page_count: usize) {
        self.states.clear();
        self.states.resize(page_count, PageRenderState::Unrendered);
        self.queue.clear();
    }

    pub const fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size;
    }

    pub fn page_count(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, page: PageIndex) -> Option<PageRenderState> {
        self.states.get(page.raw()).copied()
    }

    /// Pending pages, bottom of the stack first.
    pub fn queued(&self) -> &[PageIndex] {
        &self.queue
    }

    pub fn rendering(&self) -> impl Iterator<Item = PageIndex> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == PageRenderState::Rendering)
            .map(|(idx, _)| PageIndex::new(idx))
    }

    fn set_state(&mut self, page: PageIndex, state: PageRenderState) {
        if let Some(slot) = self.states.get_mut(page.raw()) {
            *slot = state;
        }
    }

    /// Move `page` to `Rendering` if it is in range and not already
    /// rendering or rendered.
    pub fn request(&mut self, page: PageIndex) -> bool {
        if !self.state(page).is_some_and(PageRenderState::is_pending) {
            return false;
        }
        self.queue.retain(|queued| *queued != page);
        self.set_state(page, PageRenderState::Rendering);
        true
    }

    /// Prefetch around `anchor` and pick the page to dispatch now.
    ///
    /// Neighbours in `direction` are enqueued from the far end of the window
    /// inwards, so the nearest one is popped first. The anchor itself
    /// bypasses the queue.
    pub fn render_from(&mut self, anchor: i64, direction: ScrollDirection) -> Option<PageIndex> {
        let page_count = self.page_count();
        for step in (1..=self.buffer_size).rev() {
            let offset = i64::try_from(step).unwrap_or(i64::MAX);
            let candidate = anchor.saturating_add(offset.saturating_mul(direction.step()));
            let Some(candidate) = PageIndex::checked(candidate, page_count) else {
                continue;
            };
            if self.state(candidate) == Some(PageRenderState::Unrendered) {
                self.queue.push(candidate);
                self.set_state(candidate, PageRenderState::Queued);
            }
        }
        if let Some(anchor) = PageIndex::checked(anchor, page_count)
            && self.request(anchor)
        {
            return Some(anchor);
        }
        self.pop_next()
    }

    /// Pop queued pages until one can be requested.
    pub fn pop_next(&mut self) -> Option<PageIndex> {
        while let Some(page) = self.queue.pop() {
            if self.request(page) {
                return Some(page);
            }
        }
        None
    }

    /// Mark a dispatched page rendered and chain the next queued page.
    ///
    /// Acknowledgements for pages that are not rendering (stale or
    /// duplicate) are ignored.
    pub fn acknowledge(&mut self, page: PageIndex) -> Option<PageIndex> {
        if self.state(page) != Some(PageRenderState::Rendering) {
            return None;
        }
        self.set_state(page, PageRenderState::Rendered);
        self.pop_next()
    }

    /// Failure edge: a rendering page becomes eligible again.
    pub fn fail(&mut self, page: PageIndex) -> bool {
        if self.state(page) != Some(PageRenderState::Rendering) {
            return false;
        }
        self.set_state(page, PageRenderState::Unrendered);
        true
    }
}
