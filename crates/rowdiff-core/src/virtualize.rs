//! Scroll-window math: which wrapped rows intersect the viewport

use serde::Serialize;
use std::ops::Range;

/// Half-open range of wrapped rows to materialize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Empty-height rows to render above the window
    pub fn leading_placeholders(&self) -> usize {
        self.start
    }

    /// Empty-height rows to render below the window
    pub fn trailing_placeholders(&self, total_rows: usize) -> usize {
        total_rows.saturating_sub(self.end)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.as_range().contains(&index)
    }
}

/// Rows intersecting `[scroll_top, scroll_top + viewport_height)`, clamped to `total_rows`
pub fn visible_range(scroll_top: usize, viewport_height: usize, total_rows: usize) -> VisibleRange {
    Virtualizer::default().visible_range(scroll_top, viewport_height, total_rows)
}

/// Largest useful scroll offset for a given content height
pub fn max_scroll(total_rows: usize, viewport_height: usize, allow_overscroll: bool) -> usize {
    if allow_overscroll {
        total_rows
            .saturating_sub(1)
            .saturating_sub(viewport_height / 2)
    } else {
        total_rows.saturating_sub(viewport_height)
    }
}

/// Visible-range computation with optional overscan rows above and below the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Virtualizer {
    pub overscan: usize,
}

impl Virtualizer {
    pub fn new(overscan: usize) -> Self {
        Self { overscan }
    }

    pub fn visible_range(
        &self,
        scroll_top: usize,
        viewport_height: usize,
        total_rows: usize,
    ) -> VisibleRange {
        let start = scroll_top.saturating_sub(self.overscan).min(total_rows);
        let end = scroll_top
            .saturating_add(viewport_height)
            .saturating_add(self.overscan)
            .min(total_rows)
            .max(start);
        VisibleRange { start, end }
    }
}
