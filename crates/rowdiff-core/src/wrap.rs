//! Split rows into visual sub-rows at a column budget

use crate::flatten::Row;
use crate::model::Line;
use serde::Serialize;

/// The window of one side's text shown by a sub-row, in chars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SideWindow {
    /// `None` when the side has no content at this sub-row
    pub start: Option<usize>,
    pub length: usize,
}

impl SideWindow {
    pub const EMPTY: SideWindow = SideWindow {
        start: None,
        length: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    /// Text of this window within a side's (unstripped) content
    pub fn slice<'a>(&self, content: &'a str) -> &'a str {
        let Some(start) = self.start else {
            return "";
        };
        char_slice(strip_line_ending(content), start, self.length)
    }
}

/// A sub-row of a flattened row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WrappedRow {
    /// Index into the flattened rows
    pub row: usize,
    /// Position within the row's sub-rows (0 = first)
    pub sub_row: usize,
    pub left: SideWindow,
    pub right: SideWindow,
}

impl WrappedRow {
    /// True for the first visual line of its row
    pub fn is_first(&self) -> bool {
        self.sub_row == 0
    }
}

/// Drop one trailing `\n` (and a preceding `\r`)
pub fn strip_line_ending(content: &str) -> &str {
    let content = content.strip_suffix('\n').unwrap_or(content);
    content.strip_suffix('\r').unwrap_or(content)
}

/// Length of a side's content in chars, after stripping the line ending
pub fn content_length(content: &str) -> usize {
    strip_line_ending(content).chars().count()
}

/// Substring by char offsets, clamped to the string
pub fn char_slice(s: &str, start: usize, length: usize) -> &str {
    let mut indices = s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len()));
    let Some(begin) = indices.nth(start) else {
        return "";
    };
    let end = if length == 0 {
        begin
    } else {
        indices.nth(length - 1).unwrap_or(s.len())
    };
    &s[begin..end]
}

/// Wrap rows to `column_width` chars
///
/// With wrapping disabled every row yields exactly one sub-row whose populated sides cover the
/// whole line. Header rows always yield one sub-row with both sides empty.
pub fn wrap(rows: &[Row], column_width: usize, wrap_enabled: bool) -> Vec<WrappedRow> {
    let width = column_width.max(1);
    let mut out = Vec::with_capacity(rows.len());

    for (row_idx, row) in rows.iter().enumerate() {
        let Row::Content(content) = row else {
            out.push(WrappedRow {
                row: row_idx,
                sub_row: 0,
                left: SideWindow::EMPTY,
                right: SideWindow::EMPTY,
            });
            continue;
        };

        let left_len = content.left.as_ref().map(line_length);
        let right_len = content.right.as_ref().map(line_length);

        if !wrap_enabled {
            out.push(WrappedRow {
                row: row_idx,
                sub_row: 0,
                left: full_window(left_len),
                right: full_window(right_len),
            });
            continue;
        }

        let count = sub_row_count(left_len, width).max(sub_row_count(right_len, width)).max(1);
        for sub_row in 0..count {
            out.push(WrappedRow {
                row: row_idx,
                sub_row,
                left: window_at(left_len, sub_row, width),
                right: window_at(right_len, sub_row, width),
            });
        }
    }

    out
}

fn line_length(line: &Line) -> usize {
    content_length(&line.content)
}

fn full_window(len: Option<usize>) -> SideWindow {
    match len {
        Some(length) => SideWindow {
            start: Some(0),
            length,
        },
        None => SideWindow::EMPTY,
    }
}

fn sub_row_count(len: Option<usize>, width: usize) -> usize {
    match len {
        Some(len) => len.div_ceil(width).max(1),
        None => 0,
    }
}

fn window_at(len: Option<usize>, sub_row: usize, width: usize) -> SideWindow {
    let Some(len) = len else {
        return SideWindow::EMPTY;
    };
    if sub_row >= sub_row_count(Some(len), width) {
        return SideWindow::EMPTY;
    }
    let start = sub_row * width;
    let end = len.min(start + width);
    SideWindow {
        start: Some(start),
        length: end - start,
    }
}

/// Index of the first sub-row of every flattened row
///
/// `starts[row]` is the wrapped index where `row` begins; one extra entry holds the total.
pub fn row_starts(wrapped: &[WrappedRow], row_count: usize) -> Vec<usize> {
    let mut starts = vec![wrapped.len(); row_count + 1];
    for (idx, w) in wrapped.iter().enumerate().rev() {
        if w.sub_row == 0 {
            if let Some(slot) = starts.get_mut(w.row) {
                *slot = idx;
            }
        }
    }
    starts
}
