//! Memoized pipeline plus id-keyed navigation for one model
//!
//! [`DiffView`] owns the derived stages of the pipeline (rows, wrapped rows) and rebuilds each
//! one only when its inputs change: rows on a model or layout change, wrapped rows on a row,
//! width or wrap change. Scrolling touches none of them. The current file and hunk are tracked
//! by id, so toggling layout or rewrapping never loses the reader's place.

use crate::flatten::{flatten, Layout, Row};
use crate::model::{DiffModel, FileId, HunkId, LineKind};
use crate::virtualize::{max_scroll, VisibleRange, Virtualizer};
use crate::word::{SegmentKind, WordDiffSegment};
use crate::wrap::{char_slice, row_starts, wrap, SideWindow, WrappedRow};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;

/// Gutter data for one visual line; continuation sub-rows leave everything empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RowPrefix {
    pub old_number: Option<usize>,
    pub new_number: Option<usize>,
    pub left_marker: Option<char>,
    pub right_marker: Option<char>,
}

/// A word-diff segment cut down to a wrap window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClippedSegment<'a> {
    pub text: &'a str,
    pub kind: SegmentKind,
}

/// One side of a visual line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideText<'a> {
    pub kind: LineKind,
    /// The whole line, which is what token lookups key on
    #[serde(skip)]
    pub content: &'a str,
    /// Char offset of `text` within `content`
    pub start: usize,
    pub text: &'a str,
    /// Empty when the line has no word diff
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<ClippedSegment<'a>>,
}

/// Everything a presentation layer needs to draw one wrapped row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewLine<'a> {
    /// Wrapped row index
    pub index: usize,
    pub file_id: FileId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunk_id: Option<HunkId>,
    pub sub_row: usize,
    /// The header row, for file and hunk headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<&'a Row>,
    pub prefix: RowPrefix,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<SideText<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<SideText<'a>>,
}

/// The materialized window plus placeholder counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleSlice<'a> {
    pub range: VisibleRange,
    pub leading: usize,
    pub trailing: usize,
    pub total: usize,
    pub lines: Vec<ViewLine<'a>>,
}

pub struct DiffView {
    model: Arc<DiffModel>,
    layout: Layout,
    column_width: usize,
    wrap_enabled: bool,
    virtualizer: Virtualizer,

    rows: Vec<Row>,
    rows_key: Option<Layout>,
    wrapped: Vec<WrappedRow>,
    row_starts: Vec<usize>,
    wrap_key: Option<(Layout, usize, bool)>,

    /// Flattened row index of each hunk header and file header
    hunk_rows: FxHashMap<HunkId, usize>,
    file_rows: FxHashMap<FileId, usize>,
    hunk_order: Vec<HunkId>,

    current_file: Option<FileId>,
    current_hunk: Option<HunkId>,

    row_builds: usize,
    wrap_builds: usize,
}

impl DiffView {
    pub fn new(
        model: Arc<DiffModel>,
        layout: Layout,
        column_width: usize,
        wrap_enabled: bool,
    ) -> Self {
        let hunk_order: Vec<HunkId> = model.hunk_ids().collect();
        let current_file = model.files().first().map(|f| f.id);
        let current_hunk = hunk_order.first().copied();
        let mut view = Self {
            hunk_order,
            current_file,
            current_hunk,
            model,
            layout,
            column_width,
            wrap_enabled,
            virtualizer: Virtualizer::default(),
            rows: Vec::new(),
            rows_key: None,
            wrapped: Vec::new(),
            row_starts: Vec::new(),
            wrap_key: None,
            hunk_rows: FxHashMap::default(),
            file_rows: FxHashMap::default(),
            row_builds: 0,
            wrap_builds: 0,
        };
        view.refresh();
        view
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.virtualizer = Virtualizer::new(overscan);
        self
    }

    fn refresh(&mut self) {
        if self.rows_key != Some(self.layout) {
            self.rows = flatten(self.model.files(), self.layout);
            self.hunk_rows.clear();
            self.file_rows.clear();
            for (idx, row) in self.rows.iter().enumerate() {
                match row {
                    Row::FileHeader(h) => {
                        self.file_rows.insert(h.file_id, idx);
                    }
                    Row::HunkHeader(h) => {
                        self.hunk_rows.insert(h.hunk_id, idx);
                    }
                    Row::Content(_) => {}
                }
            }
            self.rows_key = Some(self.layout);
            self.row_builds += 1;
        }

        let key = (self.layout, self.column_width, self.wrap_enabled);
        if self.wrap_key != Some(key) {
            self.wrapped = wrap(&self.rows, self.column_width, self.wrap_enabled);
            self.row_starts = row_starts(&self.wrapped, self.rows.len());
            self.wrap_key = Some(key);
            self.wrap_builds += 1;
            tracing::debug!(
                layout = ?self.layout,
                width = self.column_width,
                wrap = self.wrap_enabled,
                wrapped = self.wrapped.len(),
                "rewrapped rows"
            );
        }
    }

    // ==================== Inputs ====================

    /// Swap in a freshly fetched model, keeping the current file and hunk when they still exist
    ///
    /// The position is carried over by file name and the hunk's ordinal within that file.
    pub fn set_model(&mut self, model: Arc<DiffModel>) {
        let anchor = self.current_hunk.and_then(|id| {
            let file = self.model.file_of_hunk(id)?;
            Some((file.name.clone(), self.model.hunk_ordinal(id)?))
        });
        let file_name = self
            .current_file
            .and_then(|id| self.model.file(id))
            .map(|f| f.name.clone());

        self.model = model;
        self.hunk_order = self.model.hunk_ids().collect();
        self.rows_key = None;
        self.wrap_key = None;

        let remapped_file = file_name.and_then(|name| self.model.file_by_name(&name));
        self.current_file = remapped_file.map(|f| f.id);
        self.current_hunk = anchor.and_then(|(name, ordinal)| {
            let file = self.model.file_by_name(&name)?;
            let last = file.hunks.len().checked_sub(1)?;
            Some(file.hunks[ordinal.min(last)].id)
        });
        if self.current_file.is_none() {
            self.current_file = self.model.files().first().map(|f| f.id);
        }
        if self.current_hunk.is_none() {
            self.current_hunk = self
                .current_file
                .and_then(|id| self.model.file(id))
                .and_then(|f| f.hunks.first())
                .map(|h| h.id);
        }

        self.refresh();
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        self.refresh();
    }

    pub fn toggle_layout(&mut self) {
        self.set_layout(self.layout.toggle());
    }

    pub fn set_geometry(&mut self, column_width: usize, wrap_enabled: bool) {
        self.column_width = column_width;
        self.wrap_enabled = wrap_enabled;
        self.refresh();
    }

    // ==================== Derived state ====================

    pub fn model(&self) -> &Arc<DiffModel> {
        &self.model
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn column_width(&self) -> usize {
        self.column_width
    }

    pub fn wrap_enabled(&self) -> bool {
        self.wrap_enabled
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn wrapped(&self) -> &[WrappedRow] {
        &self.wrapped
    }

    /// Total number of visual lines
    pub fn total_rows(&self) -> usize {
        self.wrapped.len()
    }

    /// Clamp a scroll offset to the content
    pub fn clamp_scroll(&self, scroll_top: usize, viewport_height: usize) -> usize {
        scroll_top.min(max_scroll(self.total_rows(), viewport_height, false))
    }

    /// Wrapped index of a hunk's header
    pub fn hunk_start(&self, id: HunkId) -> Option<usize> {
        let row = *self.hunk_rows.get(&id)?;
        self.row_starts.get(row).copied()
    }

    /// Wrapped index of a file's header
    pub fn file_start(&self, id: FileId) -> Option<usize> {
        let row = *self.file_rows.get(&id)?;
        self.row_starts.get(row).copied()
    }

    // ==================== Navigation ====================

    pub fn current_file(&self) -> Option<FileId> {
        self.current_file
    }

    pub fn current_hunk(&self) -> Option<HunkId> {
        self.current_hunk
    }

    /// Move to the next hunk; returns the scroll target, or None at the last hunk
    pub fn next_hunk(&mut self) -> Option<usize> {
        let target = match self.current_hunk_position() {
            Some(pos) => *self.hunk_order.get(pos + 1)?,
            None => *self.hunk_order.first()?,
        };
        self.goto_hunk(target)
    }

    /// Move to the previous hunk; returns the scroll target, or None at the first hunk
    pub fn prev_hunk(&mut self) -> Option<usize> {
        let pos = self.current_hunk_position()?;
        let target = *self.hunk_order.get(pos.checked_sub(1)?)?;
        self.goto_hunk(target)
    }

    pub fn goto_hunk(&mut self, id: HunkId) -> Option<usize> {
        let start = self.hunk_start(id)?;
        self.current_hunk = Some(id);
        self.current_file = self.model.file_of_hunk(id).map(|f| f.id);
        Some(start)
    }

    pub fn next_file(&mut self) -> Option<usize> {
        let files = self.model.files();
        let next = match self.current_file_index() {
            Some(idx) => files.get(idx + 1)?,
            None => files.first()?,
        };
        self.goto_file(next.id)
    }

    pub fn prev_file(&mut self) -> Option<usize> {
        let idx = self.current_file_index()?;
        let prev = self.model.files().get(idx.checked_sub(1)?)?;
        self.goto_file(prev.id)
    }

    /// Jump to a file's header; its first hunk becomes current
    pub fn goto_file(&mut self, id: FileId) -> Option<usize> {
        let start = self.file_start(id)?;
        self.current_file = Some(id);
        self.current_hunk = self.model.file(id).and_then(|f| f.hunks.first()).map(|h| h.id);
        Some(start)
    }

    /// Update the current file and hunk from the line at the top of the viewport
    pub fn sync_from_scroll(&mut self, scroll_top: usize) {
        let Some(wrapped) = self.wrapped.get(scroll_top) else {
            return;
        };
        let Some(row) = self.rows.get(wrapped.row) else {
            return;
        };
        let file_id = row.file_id();
        self.current_file = Some(file_id);
        self.current_hunk = row.hunk_id().or_else(|| {
            self.model
                .file(file_id)
                .and_then(|f| f.hunks.first())
                .map(|h| h.id)
        });
    }

    fn current_hunk_position(&self) -> Option<usize> {
        let current = self.current_hunk?;
        self.hunk_order.iter().position(|id| *id == current)
    }

    fn current_file_index(&self) -> Option<usize> {
        let current = self.current_file?;
        self.model.files().iter().position(|f| f.id == current)
    }

    // ==================== Output ====================

    /// Materialize the lines intersecting the viewport (plus overscan)
    pub fn visible(&self, scroll_top: usize, viewport_height: usize) -> VisibleSlice<'_> {
        let total = self.total_rows();
        let range = self
            .virtualizer
            .visible_range(scroll_top, viewport_height, total);
        let lines = range.as_range().filter_map(|idx| self.line(idx)).collect();
        VisibleSlice {
            range,
            leading: range.leading_placeholders(),
            trailing: range.trailing_placeholders(total),
            total,
            lines,
        }
    }

    /// One visual line by wrapped index
    pub fn line(&self, index: usize) -> Option<ViewLine<'_>> {
        let wrapped = self.wrapped.get(index)?;
        let row = self.rows.get(wrapped.row)?;

        let Row::Content(content) = row else {
            return Some(ViewLine {
                index,
                file_id: row.file_id(),
                hunk_id: row.hunk_id(),
                sub_row: wrapped.sub_row,
                header: Some(row),
                prefix: RowPrefix::default(),
                left: None,
                right: None,
            });
        };

        let left = content.left.as_ref().and_then(|line| {
            side_text(
                line.kind,
                &line.content,
                wrapped.left,
                content.left_word_diff.as_deref(),
            )
        });
        let right = content.right.as_ref().and_then(|line| {
            side_text(
                line.kind,
                &line.content,
                wrapped.right,
                content.right_word_diff.as_deref(),
            )
        });

        Some(ViewLine {
            index,
            file_id: content.file_id,
            hunk_id: Some(content.hunk_id),
            sub_row: wrapped.sub_row,
            header: None,
            prefix: self.prefix(wrapped),
            left,
            right,
        })
    }

    /// Line numbers and markers for a wrapped row
    pub fn prefix(&self, wrapped: &WrappedRow) -> RowPrefix {
        if !wrapped.is_first() {
            return RowPrefix::default();
        }
        let Some(content) = self.rows.get(wrapped.row).and_then(Row::as_content) else {
            return RowPrefix::default();
        };
        RowPrefix {
            old_number: content.left.as_ref().and_then(|l| l.old_line),
            new_number: content.right.as_ref().and_then(|l| l.new_line),
            left_marker: content.left.as_ref().map(|l| l.kind.marker()),
            right_marker: content.right.as_ref().map(|l| l.kind.marker()),
        }
    }

    #[cfg(test)]
    fn builds(&self) -> (usize, usize) {
        (self.row_builds, self.wrap_builds)
    }
}

fn side_text<'a>(
    kind: LineKind,
    content: &'a str,
    window: SideWindow,
    segments: Option<&'a [WordDiffSegment]>,
) -> Option<SideText<'a>> {
    let start = window.start?;
    Some(SideText {
        kind,
        content,
        start,
        text: window.slice(content),
        segments: segments
            .map(|segments| clip_segments(segments, start, window.length))
            .unwrap_or_default(),
    })
}

/// Cut segments to the char window `[start, start + length)`
pub fn clip_segments(
    segments: &[WordDiffSegment],
    start: usize,
    length: usize,
) -> Vec<ClippedSegment<'_>> {
    let end = start.saturating_add(length);
    let mut offset = 0;
    let mut out = Vec::new();
    for segment in segments {
        let text = segment.text.as_str();
        let len = text.chars().count();
        let seg_start = offset;
        let seg_end = offset + len;
        offset = seg_end;

        let from = seg_start.max(start);
        let to = seg_end.min(end);
        if from >= to {
            continue;
        }
        out.push(ClippedSegment {
            text: char_slice(text, from - seg_start, to - from),
            kind: segment.kind,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_diff;

    const TWO_FILES: &str = "\
diff --git a/one.rs b/one.rs
--- a/one.rs
+++ b/one.rs
@@ -1,2 +1,2 @@
 keep
-let x = 1;
+let y = 1;
@@ -20 +20,2 @@
 tail
+added
diff --git a/two.rs b/two.rs
--- a/two.rs
+++ b/two.rs
@@ -5 +5 @@
-old
+new
";

    fn model(diff: &str) -> Arc<DiffModel> {
        Arc::new(DiffModel::new(parse_diff(diff).unwrap()))
    }

    fn view(layout: Layout) -> DiffView {
        DiffView::new(model(TWO_FILES), layout, 80, false)
    }

    #[test]
    fn test_new_starts_at_first_file_and_hunk() {
        let v = view(Layout::Unified);
        assert_eq!(v.current_file(), Some(v.model().files()[0].id));
        assert_eq!(v.current_hunk(), Some(HunkId(0)));

        let empty = DiffView::new(Arc::new(DiffModel::new(Vec::new())), Layout::Split, 80, false);
        assert_eq!(empty.current_file(), None);
        assert_eq!(empty.current_hunk(), None);
        assert_eq!(empty.total_rows(), 0);
    }

    #[test]
    fn test_scroll_does_not_rebuild() {
        let v = view(Layout::Split);
        assert_eq!(v.builds(), (1, 1));
        for top in 0..v.total_rows() {
            let _ = v.visible(top, 3);
        }
        assert_eq!(v.builds(), (1, 1));
    }

    #[test]
    fn test_geometry_change_rewraps_only() {
        let mut v = view(Layout::Split);
        v.set_geometry(80, false);
        assert_eq!(v.builds(), (1, 1));
        v.set_geometry(4, true);
        assert_eq!(v.builds(), (1, 2));
        v.toggle_layout();
        assert_eq!(v.builds(), (2, 3));
        assert_eq!(v.layout(), Layout::Unified);
    }

    #[test]
    fn test_hunk_navigation_by_id() {
        let mut v = view(Layout::Split);
        assert_eq!(v.current_hunk(), Some(HunkId(0)));

        let target = v.next_hunk().unwrap();
        assert_eq!(v.current_hunk(), Some(HunkId(1)));
        assert!(matches!(v.rows()[v.wrapped()[target].row], Row::HunkHeader(_)));

        v.next_hunk().unwrap();
        assert_eq!(v.current_hunk(), Some(HunkId(2)));
        assert_eq!(v.current_file(), Some(FileId(1)));
        assert!(v.next_hunk().is_none());

        v.prev_hunk().unwrap();
        v.prev_hunk().unwrap();
        assert_eq!(v.current_hunk(), Some(HunkId(0)));
        assert!(v.prev_hunk().is_none());
    }

    #[test]
    fn test_layout_toggle_keeps_position() {
        let mut v = view(Layout::Split);
        v.goto_hunk(HunkId(2)).unwrap();
        let split_start = v.hunk_start(HunkId(2)).unwrap();
        v.toggle_layout();
        assert_eq!(v.current_hunk(), Some(HunkId(2)));
        let unified_start = v.hunk_start(HunkId(2)).unwrap();
        // The first file's changed pair takes two rows in unified
        assert_eq!(unified_start, split_start + 1);
    }

    #[test]
    fn test_file_navigation() {
        let mut v = view(Layout::Unified);
        let start = v.next_file().unwrap();
        assert_eq!(v.current_file(), Some(FileId(1)));
        assert_eq!(v.current_hunk(), Some(HunkId(2)));
        assert!(matches!(v.rows()[v.wrapped()[start].row], Row::FileHeader(_)));
        assert!(v.next_file().is_none());
        assert_eq!(v.prev_file(), Some(0));
    }

    #[test]
    fn test_sync_from_scroll() {
        let mut v = view(Layout::Split);
        let start = v.file_start(FileId(1)).unwrap();
        v.sync_from_scroll(start);
        assert_eq!(v.current_file(), Some(FileId(1)));
        assert_eq!(v.current_hunk(), Some(HunkId(2)));
        v.sync_from_scroll(usize::MAX);
        assert_eq!(v.current_file(), Some(FileId(1)));
    }

    #[test]
    fn test_set_model_remaps_by_name_and_ordinal() {
        let mut v = view(Layout::Split);
        v.goto_hunk(HunkId(1)).unwrap();

        // New fetch: an extra file first, so every id shifts
        let refreshed = format!(
            "diff --git a/zero.rs b/zero.rs\n--- a/zero.rs\n+++ b/zero.rs\n@@ -1 +1 @@\n-a\n+b\n{TWO_FILES}"
        );
        v.set_model(model(&refreshed));
        assert_eq!(v.current_file(), Some(FileId(1)));
        assert_eq!(v.current_hunk(), Some(HunkId(2)));
        assert_eq!(v.model().file(FileId(1)).unwrap().name, "one.rs");
    }

    #[test]
    fn test_set_model_missing_file_falls_back() {
        let mut v = view(Layout::Split);
        v.goto_hunk(HunkId(2)).unwrap();
        v.set_model(model("--- a/other.rs\n+++ b/other.rs\n@@ -1 +1 @@\n-a\n+b\n"));
        assert_eq!(v.current_file(), Some(FileId(0)));
        assert_eq!(v.current_hunk(), Some(HunkId(0)));
    }

    #[test]
    fn test_visible_lines_and_prefix() {
        let v = DiffView::new(
            model("@@ -10,3 +10,4 @@\n a\n-b\n+b2\n+c\n"),
            Layout::Split,
            80,
            false,
        );
        let slice = v.visible(0, 100);
        assert_eq!(slice.total, 5);
        assert_eq!((slice.leading, slice.trailing), (0, 0));
        assert!(slice.lines[0].header.is_some());

        let pair = &slice.lines[3];
        assert_eq!(
            pair.prefix,
            RowPrefix {
                old_number: Some(11),
                new_number: Some(11),
                left_marker: Some('-'),
                right_marker: Some('+'),
            }
        );
        let left = pair.left.as_ref().unwrap();
        assert_eq!(left.text, "b");
        assert_eq!(left.segments[0].kind, SegmentKind::Removed);

        let last = &slice.lines[4];
        assert!(last.left.is_none());
        assert_eq!(last.prefix.new_number, Some(12));
    }

    #[test]
    fn test_visible_with_overscan_counts_placeholders() {
        let v = view(Layout::Unified).with_overscan(1);
        let total = v.total_rows();
        let slice = v.visible(3, 2);
        assert_eq!(slice.range, VisibleRange { start: 2, end: 6 });
        assert_eq!(slice.leading, 2);
        assert_eq!(slice.trailing, total - 6);
        assert_eq!(slice.lines.len(), 4);
        assert_eq!(slice.lines[0].index, 2);
    }

    #[test]
    fn test_continuation_rows_have_no_prefix() {
        let v = DiffView::new(
            model("@@ -1 +1 @@\n-abcdefgh\n+abcdefgh!\n"),
            Layout::Split,
            3,
            true,
        );
        let second = v.line(3).unwrap();
        assert_eq!(second.sub_row, 1);
        assert_eq!(second.prefix, RowPrefix::default());
        assert_eq!(second.left.as_ref().unwrap().text, "def");
        assert_eq!(second.right.as_ref().unwrap().text, "def");
    }

    #[test]
    fn test_clip_segments() {
        let diff = crate::word::diff_words("let x = 1;", "let y = 1;");
        let clipped = clip_segments(&diff.old, 3, 4);
        let text: Vec<&str> = clipped.iter().map(|s| s.text).collect();
        assert_eq!(text, vec![" ", "x", " ="]);
        assert_eq!(clipped[1].kind, SegmentKind::Removed);
        assert!(clip_segments(&diff.old, 50, 4).is_empty());
    }

    #[test]
    fn test_clamp_scroll() {
        let v = view(Layout::Split);
        let total = v.total_rows();
        assert_eq!(v.clamp_scroll(1000, 4), total - 4);
        assert_eq!(v.clamp_scroll(1, 4), 1);
    }
}
