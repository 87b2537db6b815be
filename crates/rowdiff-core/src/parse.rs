//! Unified diff text → file/hunk/line model

use crate::model::{ChangeKind, File, FileId, Hunk, HunkId, HunkRange, Line, LineKind};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$")
        .expect("hunk header pattern is valid")
});

const DEV_NULL: &str = "/dev/null";

/// A hunk header whose range could not be read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed hunk header at line {line}: {hunk_header}")]
pub struct ParseError {
    pub hunk_header: String,
    /// 1-based line number in the input
    pub line: usize,
}

/// Parse unified diff text into files
///
/// Empty input yields an empty list. The only failure is a malformed `@@` range header.
pub fn parse_diff(input: &str) -> Result<Vec<File>, ParseError> {
    let mut parser = Parser::default();
    for (idx, line) in input.lines().enumerate() {
        parser.feed(idx + 1, line)?;
    }

    parser.finish_file();
    tracing::debug!(
        files = parser.files.len(),
        hunks = parser.next_hunk_id,
        "parsed diff"
    );
    Ok(parser.files)
}

/// Parse a hunk header line into its range and trailing section text
pub fn parse_hunk_header(line: &str) -> Option<(HunkRange, String)> {
    let caps = HUNK_HEADER.captures(line)?;
    let num = |i: usize, default: usize| -> Option<usize> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };
    let range = HunkRange {
        old_start: num(1, 0)?,
        old_count: num(2, 1)?,
        new_start: num(3, 0)?,
        new_count: num(4, 1)?,
    };
    // Line numbers past the range must stay representable
    range.old_start.checked_add(range.old_count)?;
    range.new_start.checked_add(range.new_count)?;
    let section = caps
        .get(5)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    Some((range, section))
}

fn format_hunk_header(range: &HunkRange, section: &str) -> String {
    if section.is_empty() {
        format!("@@ {range} @@")
    } else {
        format!("@@ {range} @@ {section}")
    }
}

#[derive(Default)]
struct FileBuilder {
    git_old: Option<String>,
    git_new: Option<String>,
    old_path: Option<String>,
    new_path: Option<String>,
    rename_from: Option<String>,
    rename_to: Option<String>,
    is_copy: bool,
    saw_old_header: bool,
    is_new: bool,
    is_deleted: bool,
    binary: bool,
    hunks: Vec<Hunk>,
}

struct HunkBuilder {
    id: HunkId,
    header: String,
    range: HunkRange,
    section: String,
    lines: Vec<Line>,
    old_next: usize,
    new_next: usize,
    old_remaining: usize,
    new_remaining: usize,
}

impl HunkBuilder {
    fn exhausted(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }

    fn push(&mut self, kind: LineKind, content: &str) {
        let line = match kind {
            LineKind::Context => {
                let line = Line::context(content, self.old_next, self.new_next);
                self.old_next = self.old_next.saturating_add(1);
                self.new_next = self.new_next.saturating_add(1);
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
                line
            }
            LineKind::Deletion => {
                let line = Line::deletion(content, self.old_next);
                self.old_next = self.old_next.saturating_add(1);
                self.old_remaining = self.old_remaining.saturating_sub(1);
                line
            }
            LineKind::Addition => {
                let line = Line::addition(content, self.new_next);
                self.new_next = self.new_next.saturating_add(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
                line
            }
        };
        self.lines.push(line);
    }

    fn build(self) -> Hunk {
        let mut hunk = Hunk {
            id: self.id,
            header: self.header,
            range: self.range,
            section: self.section,
            lines: self.lines,
        };
        let (old_count, new_count) = hunk.counted_range();
        if old_count != hunk.range.old_count || new_count != hunk.range.new_count {
            tracing::warn!(
                header = %hunk.header,
                old_count,
                new_count,
                "hunk body disagrees with header counts, normalizing"
            );
            hunk.range.old_count = old_count;
            hunk.range.new_count = new_count;
            hunk.header = format_hunk_header(&hunk.range, &hunk.section);
        }
        hunk
    }
}

#[derive(Default)]
struct Parser {
    files: Vec<File>,
    current: Option<FileBuilder>,
    hunk: Option<HunkBuilder>,
    next_hunk_id: usize,
}

impl Parser {
    fn feed(&mut self, line_no: usize, line: &str) -> Result<(), ParseError> {
        if line.starts_with("diff ") {
            self.finish_file();
            let mut file = FileBuilder::default();
            if let Some(rest) = line.strip_prefix("diff --git ") {
                let (old, new) = split_git_header(rest);
                file.git_old = old;
                file.git_new = new;
            }
            self.current = Some(file);
            return Ok(());
        }

        if line.starts_with("@@") {
            self.finish_hunk();
            let (range, section) = parse_hunk_header(line).ok_or_else(|| ParseError {
                hunk_header: line.to_string(),
                line: line_no,
            })?;
            let id = HunkId(self.next_hunk_id);
            self.next_hunk_id += 1;
            self.current.get_or_insert_with(FileBuilder::default);
            self.hunk = Some(HunkBuilder {
                id,
                header: line.to_string(),
                range,
                section,
                lines: Vec::new(),
                old_next: range.old_start,
                new_next: range.new_start,
                old_remaining: range.old_count,
                new_remaining: range.new_count,
            });
            return Ok(());
        }

        if let Some(hunk) = self.hunk.as_mut() {
            // Once the header counts are used up only a no-newline marker still belongs to the
            // hunk; anything else (a next file header, a `-- ` mail signature) ends it
            let in_body = !hunk.exhausted() || line.starts_with('\\');
            if in_body {
                match line.as_bytes().first() {
                    Some(b' ') => {
                        hunk.push(LineKind::Context, &line[1..]);
                        return Ok(());
                    }
                    Some(b'+') => {
                        hunk.push(LineKind::Addition, &line[1..]);
                        return Ok(());
                    }
                    Some(b'-') => {
                        hunk.push(LineKind::Deletion, &line[1..]);
                        return Ok(());
                    }
                    Some(b'\\') => {
                        if let Some(last) = hunk.lines.last_mut() {
                            last.no_newline_at_eof = true;
                        }
                        return Ok(());
                    }
                    None if hunk.old_remaining > 0 && hunk.new_remaining > 0 => {
                        hunk.push(LineKind::Context, "");
                        return Ok(());
                    }
                    _ => {}
                }
            }
            self.finish_hunk();
        }

        self.feed_header(line);
        Ok(())
    }

    fn feed_header(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix("--- ") {
            let needs_new_file = self
                .current
                .as_ref()
                .map_or(true, |f| f.saw_old_header || !f.hunks.is_empty());
            if needs_new_file {
                self.finish_file();
                self.current = Some(FileBuilder::default());
            }
            if let Some(file) = self.current.as_mut() {
                file.saw_old_header = true;
                file.old_path = Some(clean_path(rest));
            }
            return;
        }

        let Some(file) = self.current.as_mut() else {
            return;
        };

        if let Some(rest) = line.strip_prefix("+++ ") {
            file.new_path = Some(clean_path(rest));
        } else if line.starts_with("new file mode") {
            file.is_new = true;
        } else if line.starts_with("deleted file mode") {
            file.is_deleted = true;
        } else if let Some(rest) = line.strip_prefix("rename from ") {
            file.rename_from = Some(unquote(rest));
        } else if let Some(rest) = line.strip_prefix("rename to ") {
            file.rename_to = Some(unquote(rest));
        } else if let Some(rest) = line.strip_prefix("copy from ") {
            file.is_copy = true;
            file.rename_from = Some(unquote(rest));
        } else if let Some(rest) = line.strip_prefix("copy to ") {
            file.is_copy = true;
            file.rename_to = Some(unquote(rest));
        } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
            file.binary = true;
        }
    }

    fn finish_hunk(&mut self) {
        if let Some(hunk) = self.hunk.take() {
            let hunk = hunk.build();
            match self.current.as_mut() {
                Some(file) => file.hunks.push(hunk),
                None => self.current = Some(FileBuilder {
                    hunks: vec![hunk],
                    ..FileBuilder::default()
                }),
            }
        }
    }

    fn finish_file(&mut self) {
        self.finish_hunk();
        let Some(builder) = self.current.take() else {
            return;
        };
        let id = FileId(self.files.len());
        self.files.push(builder.build(id));
    }
}

impl FileBuilder {
    fn build(self, id: FileId) -> File {
        let old_is_null = self.old_path.as_deref() == Some(DEV_NULL);
        let new_is_null = self.new_path.as_deref() == Some(DEV_NULL);
        let is_new = self.is_new || old_is_null;
        let is_deleted = self.is_deleted || new_is_null;

        let old_name = self
            .rename_from
            .clone()
            .or_else(|| self.old_path.clone().filter(|p| p != DEV_NULL))
            .or_else(|| self.git_old.clone());
        let new_name = self
            .rename_to
            .clone()
            .or_else(|| self.new_path.clone().filter(|p| p != DEV_NULL))
            .or_else(|| self.git_new.clone());

        let name = if is_deleted {
            old_name.clone().or(new_name.clone())
        } else {
            new_name.clone().or(old_name.clone())
        }
        .unwrap_or_default();

        let prev_name = match (&old_name, is_new || is_deleted) {
            (Some(old), false) if *old != name => Some(old.clone()),
            _ => None,
        };

        let change_kind = match ChangeKind::derive(
            &name,
            prev_name.as_deref(),
            is_new,
            is_deleted,
            !self.hunks.is_empty(),
        ) {
            // The copy source still exists; keep `prev_name` but report a plain change
            kind if self.is_copy && kind.is_rename() => ChangeKind::Change,
            kind => kind,
        };

        let mut file = File {
            id,
            name,
            prev_name,
            change_kind,
            additions: 0,
            deletions: 0,
            hunks: self.hunks,
            binary: self.binary,
            reported_stat: None,
        };
        file.recount();
        file
    }
}

/// Split `a/X b/Y` from a `diff --git` header into both paths
fn split_git_header(rest: &str) -> (Option<String>, Option<String>) {
    let rest = rest.trim_end();
    if rest.starts_with('"') {
        let mut parts = rest.splitn(2, "\" ");
        let old = parts.next().map(|p| clean_path(&format!("{p}\"")));
        let new = parts.next().map(clean_path);
        return (old, new);
    }
    if let Some(after_a) = rest.strip_prefix("a/") {
        // Same path on both sides: "X b/X", so X has length (len - 3) / 2
        let path_len = after_a.len().saturating_sub(3) / 2;
        if path_len > 0
            && after_a.len() == path_len * 2 + 3
            && after_a.get(..path_len) == after_a.get(path_len + 3..)
            && after_a.get(path_len..path_len + 3) == Some(" b/")
        {
            let path = after_a[..path_len].to_string();
            return (Some(path.clone()), Some(path));
        }
        if let Some((old, new)) = after_a.rsplit_once(" b/") {
            return (Some(old.to_string()), Some(new.to_string()));
        }
    }
    match rest.split_once(' ') {
        Some((old, new)) => (Some(clean_path(old)), Some(clean_path(new))),
        None => (Some(clean_path(rest)), None),
    }
}

/// Normalize a `---`/`+++` path: drop timestamps, quotes, and the `a/`/`b/` prefix
fn clean_path(raw: &str) -> String {
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    let path = unquote(raw);
    if path == DEV_NULL {
        return path;
    }
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .map(str::to_string)
        .unwrap_or(path)
}

fn unquote(raw: &str) -> String {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(|s| s.replace("\\\"", "\"").replace("\\\\", "\\"))
        .unwrap_or_else(|| raw.to_string())
}
