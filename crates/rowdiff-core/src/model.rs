//! Parsed diff model: files, hunks, and lines

use serde::Serialize;
use std::fmt;

/// Stable identifier of a file within one parsed model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub usize);

/// Stable identifier of a hunk within one parsed model (unique across files)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HunkId(pub usize);

/// The kind of a single diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Context,
    Addition,
    Deletion,
}

impl LineKind {
    /// Gutter marker used by unified diff text
    pub fn marker(self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Addition => '+',
            LineKind::Deletion => '-',
        }
    }
}

/// A single line of a hunk body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub kind: LineKind,
    /// Line text without the diff marker
    pub content: String,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
    /// Followed by `\ No newline at end of file`
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_newline_at_eof: bool,
}

impl Line {
    pub fn context(content: impl Into<String>, old_line: usize, new_line: usize) -> Self {
        Self {
            kind: LineKind::Context,
            content: content.into(),
            old_line: Some(old_line),
            new_line: Some(new_line),
            no_newline_at_eof: false,
        }
    }

    pub fn addition(content: impl Into<String>, new_line: usize) -> Self {
        Self {
            kind: LineKind::Addition,
            content: content.into(),
            old_line: None,
            new_line: Some(new_line),
            no_newline_at_eof: false,
        }
    }

    pub fn deletion(content: impl Into<String>, old_line: usize) -> Self {
        Self {
            kind: LineKind::Deletion,
            content: content.into(),
            old_line: Some(old_line),
            new_line: None,
            no_newline_at_eof: false,
        }
    }
}

/// The four-number range of a hunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HunkRange {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
}

impl fmt::Display for HunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{},{} +{},{}",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

/// A contiguous block of changed lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub id: HunkId,
    /// Full header line, e.g. `@@ -10,3 +10,4 @@ fn main()`
    pub header: String,
    pub range: HunkRange,
    /// Text after the closing `@@`, usually the enclosing function
    pub section: String,
    pub lines: Vec<Line>,
}

impl Hunk {
    /// Count of (old side, new side) lines actually present in the body
    pub fn counted_range(&self) -> (usize, usize) {
        let mut old = 0;
        let mut new = 0;
        for line in &self.lines {
            match line.kind {
                LineKind::Context => {
                    old += 1;
                    new += 1;
                }
                LineKind::Deletion => old += 1,
                LineKind::Addition => new += 1,
            }
        }
        (old, new)
    }
}

/// How a file changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    New,
    Deleted,
    RenamePure,
    RenameChanged,
    Change,
}

impl ChangeKind {
    /// Derive the change kind from path metadata and hunk presence
    pub fn derive(
        name: &str,
        prev_name: Option<&str>,
        is_new: bool,
        is_deleted: bool,
        has_hunks: bool,
    ) -> Self {
        if is_new {
            return ChangeKind::New;
        }
        if is_deleted {
            return ChangeKind::Deleted;
        }
        match prev_name {
            Some(prev) if prev != name => {
                if has_hunks {
                    ChangeKind::RenameChanged
                } else {
                    ChangeKind::RenamePure
                }
            }
            _ => ChangeKind::Change,
        }
    }

    pub fn is_rename(self) -> bool {
        matches!(self, ChangeKind::RenamePure | ChangeKind::RenameChanged)
    }
}

/// Insertion/deletion counts reported by the version-control tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiffStat {
    pub insertions: usize,
    pub deletions: usize,
}

/// A file in the diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub id: FileId,
    pub name: String,
    pub prev_name: Option<String>,
    pub change_kind: ChangeKind,
    pub additions: usize,
    pub deletions: usize,
    pub hunks: Vec<Hunk>,
    pub binary: bool,
    /// Externally reported stats, from numstat metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_stat: Option<DiffStat>,
}

impl File {
    /// Recount additions/deletions from the hunk bodies
    pub fn recount(&mut self) {
        let mut additions = 0;
        let mut deletions = 0;
        for line in self.hunks.iter().flat_map(|h| h.lines.iter()) {
            match line.kind {
                LineKind::Addition => additions += 1,
                LineKind::Deletion => deletions += 1,
                LineKind::Context => {}
            }
        }
        self.additions = additions;
        self.deletions = deletions;
    }

    /// Stats to display: counted lines, or the reported stat when there is no body
    pub fn display_stat(&self) -> DiffStat {
        match self.reported_stat {
            Some(stat) if self.hunks.is_empty() => stat,
            _ => DiffStat {
                insertions: self.additions,
                deletions: self.deletions,
            },
        }
    }

    /// Name shown in headers: `old → new` for renames
    pub fn display_name(&self) -> String {
        match (&self.prev_name, self.change_kind.is_rename()) {
            (Some(prev), true) => format!("{prev} → {}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// A complete parsed diff with id → index lookups
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffModel {
    files: Vec<File>,
    /// FileId.0 → file index
    #[serde(skip)]
    file_slots: Vec<Option<usize>>,
    /// HunkId.0 → (file index, hunk index)
    #[serde(skip)]
    hunk_slots: Vec<Option<(usize, usize)>>,
    #[serde(skip)]
    hunk_total: usize,
}

impl DiffModel {
    pub fn new(files: Vec<File>) -> Self {
        let mut model = Self {
            files,
            ..Self::default()
        };
        model.reindex();
        model
    }

    fn reindex(&mut self) {
        let file_len = self.files.iter().map(|f| f.id.0 + 1).max().unwrap_or(0);
        let hunk_len = self
            .files
            .iter()
            .flat_map(|f| f.hunks.iter())
            .map(|h| h.id.0 + 1)
            .max()
            .unwrap_or(0);

        let mut file_slots = vec![None; file_len];
        let mut hunk_slots = vec![None; hunk_len];
        let mut hunk_total = 0;
        for (file_idx, file) in self.files.iter().enumerate() {
            file_slots[file.id.0] = Some(file_idx);
            for (hunk_idx, hunk) in file.hunks.iter().enumerate() {
                hunk_slots[hunk.id.0] = Some((file_idx, hunk_idx));
                hunk_total += 1;
            }
        }
        self.file_slots = file_slots;
        self.hunk_slots = hunk_slots;
        self.hunk_total = hunk_total;
    }

    /// Keep only files whose name or previous name is in `paths`
    ///
    /// Surviving files and hunks keep their ids.
    pub fn retain_paths(&mut self, paths: &[String]) {
        self.files.retain(|f| {
            paths.contains(&f.name) || f.prev_name.as_ref().is_some_and(|p| paths.contains(p))
        });
        self.reindex();
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn hunk_count(&self) -> usize {
        self.hunk_total
    }

    pub fn file(&self, id: FileId) -> Option<&File> {
        let file_idx = (*self.file_slots.get(id.0)?)?;
        self.files.get(file_idx)
    }

    pub fn hunk(&self, id: HunkId) -> Option<&Hunk> {
        let (file_idx, hunk_idx) = (*self.hunk_slots.get(id.0)?)?;
        self.files.get(file_idx)?.hunks.get(hunk_idx)
    }

    /// File owning a hunk
    pub fn file_of_hunk(&self, id: HunkId) -> Option<&File> {
        let (file_idx, _) = (*self.hunk_slots.get(id.0)?)?;
        self.files.get(file_idx)
    }

    /// Position of a hunk within its file
    pub fn hunk_ordinal(&self, id: HunkId) -> Option<usize> {
        let (_, hunk_idx) = (*self.hunk_slots.get(id.0)?)?;
        Some(hunk_idx)
    }

    /// Find a file by its (new) name
    pub fn file_by_name(&self, name: &str) -> Option<&File> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Hunk ids in display order
    pub fn hunk_ids(&self) -> impl Iterator<Item = HunkId> + '_ {
        self.files
            .iter()
            .flat_map(|f| f.hunks.iter().map(|h| h.id))
    }

    pub fn total_stat(&self) -> DiffStat {
        self.files.iter().fold(DiffStat::default(), |acc, f| {
            let stat = f.display_stat();
            DiffStat {
                insertions: acc.insertions + stat.insertions,
                deletions: acc.deletions + stat.deletions,
            }
        })
    }

    pub(crate) fn files_mut(&mut self) -> &mut [File] {
        &mut self.files
    }
}
