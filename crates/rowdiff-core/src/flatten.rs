//! Flatten the file model into display rows (unified or split)

use crate::model::{ChangeKind, File, FileId, Hunk, HunkId, HunkRange, Line, LineKind};
use crate::word::{diff_words, WordDiffSegment};
use serde::{Deserialize, Serialize};

/// Row layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Single interleaved stream
    #[default]
    Unified,
    /// Old on the left, new on the right
    Split,
}

impl Layout {
    pub fn toggle(self) -> Self {
        match self {
            Layout::Unified => Layout::Split,
            Layout::Split => Layout::Unified,
        }
    }
}

/// Synthetic row introducing a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeaderRow {
    pub file_id: FileId,
    pub name: String,
    pub prev_name: Option<String>,
    pub change_kind: ChangeKind,
    pub insertions: usize,
    pub deletions: usize,
    pub binary: bool,
    pub hunk_count: usize,
}

/// Synthetic row introducing a hunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HunkHeaderRow {
    pub file_id: FileId,
    pub hunk_id: HunkId,
    /// Range text, e.g. `@@ -10,3 +10,4 @@ fn main()`
    pub header: String,
    pub range: HunkRange,
    pub section: String,
}

/// A line (or line pair) of diff content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRow {
    pub file_id: FileId,
    pub hunk_id: HunkId,
    pub left: Option<Line>,
    pub right: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_word_diff: Option<Vec<WordDiffSegment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_word_diff: Option<Vec<WordDiffSegment>>,
}

impl ContentRow {
    fn single(file_id: FileId, hunk_id: HunkId, line: &Line) -> Self {
        let (left, right) = match line.kind {
            LineKind::Context => (Some(line.clone()), Some(line.clone())),
            LineKind::Deletion => (Some(line.clone()), None),
            LineKind::Addition => (None, Some(line.clone())),
        };
        Self {
            file_id,
            hunk_id,
            left,
            right,
            left_word_diff: None,
            right_word_diff: None,
        }
    }

    /// The line to show in a single-column layout
    pub fn primary(&self) -> Option<&Line> {
        match (&self.left, &self.right) {
            (Some(left), _) if left.kind == LineKind::Deletion => Some(left),
            (_, Some(right)) => Some(right),
            (left, None) => left.as_ref(),
        }
    }

    /// Word-diff segments matching [`ContentRow::primary`]
    pub fn primary_word_diff(&self) -> Option<&[WordDiffSegment]> {
        match self.primary().map(|l| l.kind) {
            Some(LineKind::Deletion) => self.left_word_diff.as_deref(),
            Some(LineKind::Addition) => self.right_word_diff.as_deref(),
            _ => None,
        }
    }
}

/// A display row before wrapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Row {
    FileHeader(FileHeaderRow),
    HunkHeader(HunkHeaderRow),
    Content(ContentRow),
}

impl Row {
    pub fn file_id(&self) -> FileId {
        match self {
            Row::FileHeader(r) => r.file_id,
            Row::HunkHeader(r) => r.file_id,
            Row::Content(r) => r.file_id,
        }
    }

    pub fn hunk_id(&self) -> Option<HunkId> {
        match self {
            Row::FileHeader(_) => None,
            Row::HunkHeader(r) => Some(r.hunk_id),
            Row::Content(r) => Some(r.hunk_id),
        }
    }

    pub fn as_content(&self) -> Option<&ContentRow> {
        match self {
            Row::Content(r) => Some(r),
            _ => None,
        }
    }
}

/// Flatten files into rows, preserving file → hunk → line order
pub fn flatten(files: &[File], layout: Layout) -> Vec<Row> {
    let line_total: usize = files
        .iter()
        .flat_map(|f| f.hunks.iter())
        .map(|h| h.lines.len() + 1)
        .sum();
    let mut rows = Vec::with_capacity(line_total + files.len());

    for file in files {
        let stat = file.display_stat();
        rows.push(Row::FileHeader(FileHeaderRow {
            file_id: file.id,
            name: file.name.clone(),
            prev_name: file.prev_name.clone(),
            change_kind: file.change_kind,
            insertions: stat.insertions,
            deletions: stat.deletions,
            binary: file.binary,
            hunk_count: file.hunks.len(),
        }));

        for hunk in &file.hunks {
            rows.push(Row::HunkHeader(HunkHeaderRow {
                file_id: file.id,
                hunk_id: hunk.id,
                header: hunk.header.clone(),
                range: hunk.range,
                section: hunk.section.clone(),
            }));
            flatten_hunk(file.id, hunk, layout, &mut rows);
        }
    }

    tracing::debug!(?layout, rows = rows.len(), "flattened diff rows");
    rows
}

fn flatten_hunk(file_id: FileId, hunk: &Hunk, layout: Layout, rows: &mut Vec<Row>) {
    let lines = &hunk.lines;
    let mut i = 0;
    while i < lines.len() {
        if lines[i].kind == LineKind::Context {
            rows.push(Row::Content(ContentRow::single(file_id, hunk.id, &lines[i])));
            i += 1;
            continue;
        }

        // A deletion run, then the addition run immediately after it (either may be empty)
        let del_start = i;
        while i < lines.len() && lines[i].kind == LineKind::Deletion {
            i += 1;
        }
        let add_start = i;
        while i < lines.len() && lines[i].kind == LineKind::Addition {
            i += 1;
        }
        let deletions = &lines[del_start..add_start];
        let additions = &lines[add_start..i];

        match layout {
            Layout::Split => push_split_pairs(file_id, hunk.id, deletions, additions, rows),
            Layout::Unified => push_unified_runs(file_id, hunk.id, deletions, additions, rows),
        }
    }
}

/// Pair deletion `k` with addition `k`; the longer run's remainder pairs with a blank
fn push_split_pairs(
    file_id: FileId,
    hunk_id: HunkId,
    deletions: &[Line],
    additions: &[Line],
    rows: &mut Vec<Row>,
) {
    for k in 0..deletions.len().max(additions.len()) {
        let left = deletions.get(k);
        let right = additions.get(k);
        let (left_word_diff, right_word_diff) = match (left, right) {
            (Some(old), Some(new)) => {
                let diff = diff_words(&old.content, &new.content);
                (Some(diff.old), Some(diff.new))
            }
            _ => (None, None),
        };
        rows.push(Row::Content(ContentRow {
            file_id,
            hunk_id,
            left: left.cloned(),
            right: right.cloned(),
            left_word_diff,
            right_word_diff,
        }));
    }
}

/// Deletions then additions, one side per row, with the same positional word diff as split
fn push_unified_runs(
    file_id: FileId,
    hunk_id: HunkId,
    deletions: &[Line],
    additions: &[Line],
    rows: &mut Vec<Row>,
) {
    let paired = deletions.len().min(additions.len());
    let diffs: Vec<_> = deletions
        .iter()
        .zip(additions.iter())
        .map(|(old, new)| diff_words(&old.content, &new.content))
        .collect();

    for (k, line) in deletions.iter().enumerate() {
        let mut row = ContentRow::single(file_id, hunk_id, line);
        if k < paired {
            row.left_word_diff = Some(diffs[k].old.clone());
        }
        rows.push(Row::Content(row));
    }
    for (k, line) in additions.iter().enumerate() {
        let mut row = ContentRow::single(file_id, hunk_id, line);
        if k < paired {
            row.right_word_diff = Some(diffs[k].new.clone());
        }
        rows.push(Row::Content(row));
    }
}
